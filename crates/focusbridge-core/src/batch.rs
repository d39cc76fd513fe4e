//! Sequential batches of independent creations or removals.

use serde::{Deserialize, Serialize};

use crate::bridge::Bridge;
use crate::mutation::{
    AddProjectRequest, AddTagRequest, AddTaskRequest, MutationResult, RemoveItemRequest,
};
use crate::runner::ScriptRunner;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "itemType", rename_all = "lowercase")]
pub enum BatchAddItem {
    Task(AddTaskRequest),
    Project(AddProjectRequest),
    Tag(AddTagRequest),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemResult {
    pub index: usize,
    #[serde(flatten)]
    pub result: MutationResult,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub success: bool,
    pub success_count: usize,
    pub failure_count: usize,
    pub results: Vec<BatchItemResult>,
}

impl BatchOutcome {
    fn collect(results: Vec<MutationResult>) -> Self {
        let success_count = results.iter().filter(|result| result.success).count();
        let failure_count = results.len() - success_count;
        Self {
            success: failure_count == 0,
            success_count,
            failure_count,
            results: results
                .into_iter()
                .enumerate()
                .map(|(index, result)| BatchItemResult { index, result })
                .collect(),
        }
    }
}

impl<R: ScriptRunner> Bridge<R> {
    /// Each item is its own round trip; a failure does not stop the batch and
    /// nothing is rolled back.
    pub fn batch_add(&self, items: &[BatchAddItem]) -> BatchOutcome {
        let results = items
            .iter()
            .map(|item| match item {
                BatchAddItem::Task(request) => MutationResult::from(self.add_task(request)),
                BatchAddItem::Project(request) => MutationResult::from(self.add_project(request)),
                BatchAddItem::Tag(request) => MutationResult::from(self.add_tag(request)),
            })
            .collect();
        BatchOutcome::collect(results)
    }

    pub fn batch_remove(&self, items: &[RemoveItemRequest]) -> BatchOutcome {
        let results = items
            .iter()
            .map(|request| MutationResult::from(self.remove_item(request)))
            .collect();
        BatchOutcome::collect(results)
    }
}
