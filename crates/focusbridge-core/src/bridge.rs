use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::commands::{render_create, render_edit, render_remove};
use crate::config::{BridgeConfig, DEFAULT_APPLICATION};
use crate::decode::decode_envelope;
use crate::error::BridgeError;
use crate::mutation::{
    add_project_command, add_tag_command, add_task_command, edit_command, remove_command,
    AddProjectRequest, AddTagRequest, AddTaskRequest, CreateOutcome, EditItemRequest,
    EditOutcome, RemoveItemRequest, RemoveOutcome,
};
use crate::query::{finish_outcome, query_command, render_query, QueryOutcome, QuerySpec};
use crate::runner::{ProcessRunner, ScriptRunner};
use crate::script::{host_script, Program};

/// Entry point for every operation. Holds no state beyond how to reach the
/// application; each call is one script, one process, one envelope.
pub struct Bridge<R> {
    runner: R,
    application: String,
}

impl Bridge<ProcessRunner> {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(ProcessRunner::from_config(config)).with_application(config.application())
    }
}

impl<R: ScriptRunner> Bridge<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            application: DEFAULT_APPLICATION.to_string(),
        }
    }

    pub fn with_application(mut self, application: impl Into<String>) -> Self {
        self.application = application.into();
        self
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    pub fn host_script(&self, program: &Program) -> String {
        host_script(&self.application, program)
    }

    fn execute<T: DeserializeOwned>(&self, operation: &str, program: &Program) -> Result<T, BridgeError> {
        let script = self.host_script(program);
        debug!(operation, script_bytes = script.len(), "generated script");
        let output = self.runner.run(&script)?;
        decode_envelope(&output.stdout)
    }

    pub fn query(&self, spec: &QuerySpec) -> Result<QueryOutcome, BridgeError> {
        let command = query_command(spec)?;
        let outcome: QueryOutcome = self.execute("query", &render_query(&command))?;
        let outcome = finish_outcome(&command, outcome);
        debug!(entity = spec.entity.plural(), count = outcome.count, "query finished");
        Ok(outcome)
    }

    pub fn add_task(&self, request: &AddTaskRequest) -> Result<CreateOutcome, BridgeError> {
        let command = add_task_command(request)?;
        let outcome: CreateOutcome = self.execute("add_task", &render_create(&command))?;
        info!(id = %outcome.id, name = %outcome.name, "task created");
        Ok(outcome)
    }

    pub fn add_project(&self, request: &AddProjectRequest) -> Result<CreateOutcome, BridgeError> {
        let command = add_project_command(request)?;
        let outcome: CreateOutcome = self.execute("add_project", &render_create(&command))?;
        info!(id = %outcome.id, name = %outcome.name, "project created");
        Ok(outcome)
    }

    pub fn add_tag(&self, request: &AddTagRequest) -> Result<CreateOutcome, BridgeError> {
        let command = add_tag_command(request)?;
        let outcome: CreateOutcome = self.execute("add_tag", &render_create(&command))?;
        info!(id = %outcome.id, name = %outcome.name, "tag created");
        Ok(outcome)
    }

    pub fn edit_item(&self, request: &EditItemRequest) -> Result<EditOutcome, BridgeError> {
        let command = edit_command(request)?;
        let outcome: EditOutcome = self.execute("edit_item", &render_edit(&command))?;
        info!(
            kind = command.kind.as_str(),
            id = %outcome.id,
            changed = ?outcome.changed_properties,
            "item edited"
        );
        Ok(outcome)
    }

    pub fn remove_item(&self, request: &RemoveItemRequest) -> Result<RemoveOutcome, BridgeError> {
        let command = remove_command(request)?;
        let outcome: RemoveOutcome = self.execute("remove_item", &render_remove(&command))?;
        info!(kind = command.kind.as_str(), id = %outcome.id, "item removed");
        Ok(outcome)
    }
}
