//! Create, edit and remove requests, validated into commands.

use serde::{Deserialize, Serialize};

use crate::commands::{CreateCommand, EditCommand, PropertyUpdate, RemoveCommand};
use crate::error::BridgeError;
use crate::model::{
    clean_names, non_empty, DateInput, Destination, EntityKind, EntityRef, Lookup,
    ProjectDestination, ProjectStatus, RelocationFields, RelocationTarget, TagDestination,
    TagStatus, TaskDestination, TaskStatus,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTaskRequest {
    pub name: String,
    pub note: Option<String>,
    pub due_date: Option<String>,
    pub defer_date: Option<String>,
    pub planned_date: Option<String>,
    pub flagged: Option<bool>,
    pub estimated_minutes: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    pub parent_task_id: Option<String>,
    pub parent_task_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddProjectRequest {
    pub name: String,
    pub note: Option<String>,
    pub due_date: Option<String>,
    pub defer_date: Option<String>,
    pub flagged: Option<bool>,
    pub sequential: Option<bool>,
    pub status: Option<ProjectStatus>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub folder_id: Option<String>,
    pub folder_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTagRequest {
    pub name: String,
    pub status: Option<TagStatus>,
    pub allows_next_action: Option<bool>,
    pub parent_tag_id: Option<String>,
    pub parent_tag_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditItemRequest {
    pub id: Option<String>,
    pub name: Option<String>,
    pub item_type: EntityKind,
    pub new_name: Option<String>,
    pub new_note: Option<String>,
    pub new_due_date: Option<String>,
    pub new_defer_date: Option<String>,
    pub new_planned_date: Option<String>,
    pub new_flagged: Option<bool>,
    pub new_estimated_minutes: Option<u32>,
    pub new_status: Option<String>,
    #[serde(default)]
    pub add_tags: Vec<String>,
    #[serde(default)]
    pub remove_tags: Vec<String>,
    pub replace_tags: Option<Vec<String>>,
    pub new_sequential: Option<bool>,
    pub new_allows_next_action: Option<bool>,
    pub new_project_id: Option<String>,
    pub new_project_name: Option<String>,
    pub new_parent_task_id: Option<String>,
    pub new_parent_task_name: Option<String>,
    pub new_parent_tag_id: Option<String>,
    pub new_parent_tag_name: Option<String>,
    #[serde(default)]
    pub move_to_root: bool,
    pub new_folder_id: Option<String>,
    pub new_folder_name: Option<String>,
}

impl EditItemRequest {
    pub fn new(item_type: EntityKind, target: EntityRef) -> Self {
        Self {
            id: target.id,
            name: target.name,
            item_type,
            new_name: None,
            new_note: None,
            new_due_date: None,
            new_defer_date: None,
            new_planned_date: None,
            new_flagged: None,
            new_estimated_minutes: None,
            new_status: None,
            add_tags: Vec::new(),
            remove_tags: Vec::new(),
            replace_tags: None,
            new_sequential: None,
            new_allows_next_action: None,
            new_project_id: None,
            new_project_name: None,
            new_parent_task_id: None,
            new_parent_task_name: None,
            new_parent_tag_id: None,
            new_parent_tag_name: None,
            move_to_root: false,
            new_folder_id: None,
            new_folder_name: None,
        }
    }

    pub fn target(&self) -> EntityRef {
        EntityRef {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveItemRequest {
    pub id: Option<String>,
    pub name: Option<String>,
    pub item_type: EntityKind,
}

impl RemoveItemRequest {
    pub fn target(&self) -> EntityRef {
        EntityRef {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOutcome {
    #[serde(alias = "taskId", alias = "projectId", alias = "tagId")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditOutcome {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub changed_properties: Vec<String>,
}

impl EditOutcome {
    pub fn moved(&self) -> bool {
        self.changed_properties.iter().any(|property| property == "moved")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveOutcome {
    pub id: String,
    pub name: String,
}

/// Uniform result handed to callers, success or failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_properties: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl MutationResult {
    pub fn failure(err: &BridgeError) -> Self {
        Self {
            success: false,
            error: Some(err.to_string()),
            error_kind: Some(err.kind().to_string()),
            ..Self::default()
        }
    }
}

impl From<Result<CreateOutcome, BridgeError>> for MutationResult {
    fn from(result: Result<CreateOutcome, BridgeError>) -> Self {
        match result {
            Ok(outcome) => Self {
                success: true,
                id: Some(outcome.id),
                name: Some(outcome.name),
                parent_name: outcome.parent_name,
                ..Self::default()
            },
            Err(err) => Self::failure(&err),
        }
    }
}

impl From<Result<EditOutcome, BridgeError>> for MutationResult {
    fn from(result: Result<EditOutcome, BridgeError>) -> Self {
        match result {
            Ok(outcome) => Self {
                success: true,
                id: Some(outcome.id),
                name: Some(outcome.name),
                changed_properties: Some(outcome.changed_properties),
                ..Self::default()
            },
            Err(err) => Self::failure(&err),
        }
    }
}

impl From<Result<RemoveOutcome, BridgeError>> for MutationResult {
    fn from(result: Result<RemoveOutcome, BridgeError>) -> Self {
        match result {
            Ok(outcome) => Self {
                success: true,
                id: Some(outcome.id),
                name: Some(outcome.name),
                ..Self::default()
            },
            Err(err) => Self::failure(&err),
        }
    }
}

fn required_name(name: &str) -> Result<String, BridgeError> {
    non_empty(Some(name))
        .map(str::to_string)
        .ok_or_else(|| BridgeError::validation("name must not be empty"))
}

fn push_date(
    updates: &mut Vec<PropertyUpdate>,
    property: &'static str,
    value: Option<&str>,
) -> Result<(), BridgeError> {
    if let Some(value) = DateInput::parse_optional(property, value)? {
        updates.push(PropertyUpdate::Date { property, value });
    }
    Ok(())
}

fn resolve<T>(
    fields: RelocationFields<'_, T>,
    wrap: fn(T) -> RelocationTarget,
) -> Result<Option<Destination>, BridgeError> {
    Ok(fields.single()?.map(|target| wrap(target).destination()))
}

pub fn add_task_command(request: &AddTaskRequest) -> Result<CreateCommand, BridgeError> {
    let name = required_name(&request.name)?;
    let container = resolve(
        RelocationFields::new()
            .with("projectId", request.project_id.as_deref(), TaskDestination::ProjectId)
            .with("projectName", request.project_name.as_deref(), TaskDestination::ProjectName)
            .with("parentTaskId", request.parent_task_id.as_deref(), TaskDestination::ParentTaskId)
            .with(
                "parentTaskName",
                request.parent_task_name.as_deref(),
                TaskDestination::ParentTaskName,
            ),
        RelocationTarget::Task,
    )?;
    let mut properties = Vec::new();
    if let Some(note) = non_empty(request.note.as_deref()) {
        properties.push(PropertyUpdate::Text {
            property: "note",
            value: note.to_string(),
        });
    }
    push_date(&mut properties, "dueDate", request.due_date.as_deref())?;
    push_date(&mut properties, "deferDate", request.defer_date.as_deref())?;
    push_date(&mut properties, "plannedDate", request.planned_date.as_deref())?;
    if let Some(flagged) = request.flagged {
        properties.push(PropertyUpdate::Flag {
            property: "flagged",
            value: flagged,
        });
    }
    if let Some(minutes) = request.estimated_minutes {
        properties.push(PropertyUpdate::Minutes {
            property: "estimatedMinutes",
            value: Some(minutes),
        });
    }
    let tags = clean_names(&request.tags);
    if !tags.is_empty() {
        properties.push(PropertyUpdate::AddTags(tags));
    }
    Ok(CreateCommand {
        kind: EntityKind::Task,
        name,
        container,
        properties,
    })
}

pub fn add_project_command(request: &AddProjectRequest) -> Result<CreateCommand, BridgeError> {
    let name = required_name(&request.name)?;
    let container = resolve(
        RelocationFields::new()
            .with("folderId", request.folder_id.as_deref(), ProjectDestination::FolderId)
            .with("folderName", request.folder_name.as_deref(), ProjectDestination::FolderName),
        RelocationTarget::Project,
    )?;
    let mut properties = Vec::new();
    if let Some(note) = non_empty(request.note.as_deref()) {
        properties.push(PropertyUpdate::Text {
            property: "note",
            value: note.to_string(),
        });
    }
    push_date(&mut properties, "dueDate", request.due_date.as_deref())?;
    push_date(&mut properties, "deferDate", request.defer_date.as_deref())?;
    if let Some(flagged) = request.flagged {
        properties.push(PropertyUpdate::Flag {
            property: "flagged",
            value: flagged,
        });
    }
    if let Some(sequential) = request.sequential {
        properties.push(PropertyUpdate::Flag {
            property: "sequential",
            value: sequential,
        });
    }
    if let Some(status) = request.status {
        properties.push(PropertyUpdate::ProjectStatus(status));
    }
    let tags = clean_names(&request.tags);
    if !tags.is_empty() {
        properties.push(PropertyUpdate::AddTags(tags));
    }
    Ok(CreateCommand {
        kind: EntityKind::Project,
        name,
        container,
        properties,
    })
}

pub fn add_tag_command(request: &AddTagRequest) -> Result<CreateCommand, BridgeError> {
    let name = required_name(&request.name)?;
    let container = resolve(
        RelocationFields::new()
            .with("parentTagId", request.parent_tag_id.as_deref(), TagDestination::ParentTagId)
            .with("parentTagName", request.parent_tag_name.as_deref(), TagDestination::ParentTagName),
        RelocationTarget::Tag,
    )?;
    let mut properties = Vec::new();
    if let Some(status) = request.status {
        properties.push(PropertyUpdate::TagStatus(status));
    }
    if let Some(allows) = request.allows_next_action {
        properties.push(PropertyUpdate::Flag {
            property: "allowsNextAction",
            value: allows,
        });
    }
    Ok(CreateCommand {
        kind: EntityKind::Tag,
        name,
        container,
        properties,
    })
}

fn forbid(kind: EntityKind, fields: &[(&'static str, bool)]) -> Result<(), BridgeError> {
    let offending: Vec<&str> = fields
        .iter()
        .filter(|(_, present)| *present)
        .map(|(field, _)| *field)
        .collect();
    if offending.is_empty() {
        return Ok(());
    }
    Err(BridgeError::validation(format!(
        "{} does not apply to a {}",
        offending.join(", "),
        kind.as_str()
    )))
}

fn parse_status(kind: EntityKind, value: &str) -> Result<PropertyUpdate, BridgeError> {
    let normalized: String = value
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    let update = match (kind, normalized.as_str()) {
        (EntityKind::Task, "incomplete" | "active" | "available") => {
            Some(PropertyUpdate::TaskStatus(TaskStatus::Incomplete))
        }
        (EntityKind::Task, "completed" | "complete" | "done") => {
            Some(PropertyUpdate::TaskStatus(TaskStatus::Completed))
        }
        (EntityKind::Task, "dropped") => Some(PropertyUpdate::TaskStatus(TaskStatus::Dropped)),
        (EntityKind::Project, "active") => Some(PropertyUpdate::ProjectStatus(ProjectStatus::Active)),
        (EntityKind::Project, "onhold") => Some(PropertyUpdate::ProjectStatus(ProjectStatus::OnHold)),
        (EntityKind::Project, "done" | "completed") => {
            Some(PropertyUpdate::ProjectStatus(ProjectStatus::Done))
        }
        (EntityKind::Project, "dropped") => {
            Some(PropertyUpdate::ProjectStatus(ProjectStatus::Dropped))
        }
        (EntityKind::Tag, "active") => Some(PropertyUpdate::TagStatus(TagStatus::Active)),
        (EntityKind::Tag, "onhold") => Some(PropertyUpdate::TagStatus(TagStatus::OnHold)),
        (EntityKind::Tag, "dropped") => Some(PropertyUpdate::TagStatus(TagStatus::Dropped)),
        _ => None,
    };
    update.ok_or_else(|| {
        BridgeError::validation(format!("unknown {} status: {}", kind.as_str(), value))
    })
}

pub fn edit_command(request: &EditItemRequest) -> Result<EditCommand, BridgeError> {
    let kind = request.item_type;
    let key = request.target().key()?;
    let target = Lookup {
        class: kind.class(),
        key,
    };

    let has = |value: &Option<String>| non_empty(value.as_deref()).is_some();
    let has_tag_edits =
        !request.add_tags.is_empty() || !request.remove_tags.is_empty() || request.replace_tags.is_some();
    match kind {
        EntityKind::Task => forbid(
            kind,
            &[
                ("newSequential", request.new_sequential.is_some()),
                ("newAllowsNextAction", request.new_allows_next_action.is_some()),
                ("newParentTagId", has(&request.new_parent_tag_id)),
                ("newParentTagName", has(&request.new_parent_tag_name)),
                ("moveToRoot", request.move_to_root),
                ("newFolderId", has(&request.new_folder_id)),
                ("newFolderName", has(&request.new_folder_name)),
            ],
        )?,
        EntityKind::Project => forbid(
            kind,
            &[
                ("newPlannedDate", request.new_planned_date.is_some()),
                ("newAllowsNextAction", request.new_allows_next_action.is_some()),
                ("newProjectId", has(&request.new_project_id)),
                ("newProjectName", has(&request.new_project_name)),
                ("newParentTaskId", has(&request.new_parent_task_id)),
                ("newParentTaskName", has(&request.new_parent_task_name)),
                ("newParentTagId", has(&request.new_parent_tag_id)),
                ("newParentTagName", has(&request.new_parent_tag_name)),
                ("moveToRoot", request.move_to_root),
            ],
        )?,
        EntityKind::Tag => forbid(
            kind,
            &[
                ("newNote", request.new_note.is_some()),
                ("newDueDate", request.new_due_date.is_some()),
                ("newDeferDate", request.new_defer_date.is_some()),
                ("newPlannedDate", request.new_planned_date.is_some()),
                ("newFlagged", request.new_flagged.is_some()),
                ("newEstimatedMinutes", request.new_estimated_minutes.is_some()),
                ("tag edits", has_tag_edits),
                ("newSequential", request.new_sequential.is_some()),
                ("newProjectId", has(&request.new_project_id)),
                ("newProjectName", has(&request.new_project_name)),
                ("newParentTaskId", has(&request.new_parent_task_id)),
                ("newParentTaskName", has(&request.new_parent_task_name)),
                ("newFolderId", has(&request.new_folder_id)),
                ("newFolderName", has(&request.new_folder_name)),
            ],
        )?,
    }
    if request.replace_tags.is_some()
        && (!request.add_tags.is_empty() || !request.remove_tags.is_empty())
    {
        return Err(BridgeError::validation(
            "replaceTags cannot be combined with addTags or removeTags",
        ));
    }

    let mut updates = Vec::new();
    if let Some(name) = non_empty(request.new_name.as_deref()) {
        updates.push(PropertyUpdate::Text {
            property: "name",
            value: name.to_string(),
        });
    }
    if let Some(note) = &request.new_note {
        updates.push(PropertyUpdate::Text {
            property: "note",
            value: note.clone(),
        });
    }
    push_date(&mut updates, "dueDate", request.new_due_date.as_deref())?;
    push_date(&mut updates, "deferDate", request.new_defer_date.as_deref())?;
    push_date(&mut updates, "plannedDate", request.new_planned_date.as_deref())?;
    if let Some(flagged) = request.new_flagged {
        updates.push(PropertyUpdate::Flag {
            property: "flagged",
            value: flagged,
        });
    }
    if let Some(minutes) = request.new_estimated_minutes {
        updates.push(PropertyUpdate::Minutes {
            property: "estimatedMinutes",
            value: if minutes == 0 { None } else { Some(minutes) },
        });
    }
    if let Some(sequential) = request.new_sequential {
        updates.push(PropertyUpdate::Flag {
            property: "sequential",
            value: sequential,
        });
    }
    if let Some(allows) = request.new_allows_next_action {
        updates.push(PropertyUpdate::Flag {
            property: "allowsNextAction",
            value: allows,
        });
    }
    if let Some(status) = non_empty(request.new_status.as_deref()) {
        updates.push(parse_status(kind, status)?);
    }
    if let Some(replace) = &request.replace_tags {
        updates.push(PropertyUpdate::ReplaceTags(clean_names(replace)));
    }
    let add = clean_names(&request.add_tags);
    if !add.is_empty() {
        updates.push(PropertyUpdate::AddTags(add));
    }
    let remove = clean_names(&request.remove_tags);
    if !remove.is_empty() {
        updates.push(PropertyUpdate::RemoveTags(remove));
    }

    let relocation = match kind {
        EntityKind::Task => resolve(
            RelocationFields::new()
                .with("newProjectId", request.new_project_id.as_deref(), TaskDestination::ProjectId)
                .with(
                    "newProjectName",
                    request.new_project_name.as_deref(),
                    TaskDestination::ProjectName,
                )
                .with(
                    "newParentTaskId",
                    request.new_parent_task_id.as_deref(),
                    TaskDestination::ParentTaskId,
                )
                .with(
                    "newParentTaskName",
                    request.new_parent_task_name.as_deref(),
                    TaskDestination::ParentTaskName,
                ),
            RelocationTarget::Task,
        )?,
        EntityKind::Tag => resolve(
            RelocationFields::new()
                .with(
                    "newParentTagId",
                    request.new_parent_tag_id.as_deref(),
                    TagDestination::ParentTagId,
                )
                .with(
                    "newParentTagName",
                    request.new_parent_tag_name.as_deref(),
                    TagDestination::ParentTagName,
                )
                .with("moveToRoot", request.move_to_root.then_some("root"), |_| {
                    TagDestination::Root
                }),
            RelocationTarget::Tag,
        )?,
        EntityKind::Project => resolve(
            RelocationFields::new()
                .with("newFolderId", request.new_folder_id.as_deref(), ProjectDestination::FolderId)
                .with(
                    "newFolderName",
                    request.new_folder_name.as_deref(),
                    ProjectDestination::FolderName,
                ),
            RelocationTarget::Project,
        )?,
    };

    Ok(EditCommand {
        kind,
        target,
        updates,
        relocation,
    })
}

pub fn remove_command(request: &RemoveItemRequest) -> Result<RemoveCommand, BridgeError> {
    let key = request.target().key()?;
    Ok(RemoveCommand {
        kind: request.item_type,
        target: Lookup {
            class: request.item_type.class(),
            key,
        },
    })
}
