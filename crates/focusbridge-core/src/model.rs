use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    #[serde(alias = "tasks")]
    Task,
    #[serde(alias = "projects")]
    Project,
    #[serde(alias = "tags")]
    Tag,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Task => "task",
            EntityKind::Project => "project",
            EntityKind::Tag => "tag",
        }
    }

    pub fn plural(self) -> &'static str {
        match self {
            EntityKind::Task => "tasks",
            EntityKind::Project => "projects",
            EntityKind::Tag => "tags",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Task => "Task",
            EntityKind::Project => "Project",
            EntityKind::Tag => "Tag",
        }
    }

    pub fn class(self) -> ObjectClass {
        match self {
            EntityKind::Task => ObjectClass::Task,
            EntityKind::Project => ObjectClass::Project,
            EntityKind::Tag => ObjectClass::Tag,
        }
    }
}

/// Database object classes a script can look up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectClass {
    Task,
    Project,
    Tag,
    Folder,
}

impl ObjectClass {
    pub fn constructor(self) -> &'static str {
        match self {
            ObjectClass::Task => "Task",
            ObjectClass::Project => "Project",
            ObjectClass::Tag => "Tag",
            ObjectClass::Folder => "Folder",
        }
    }

    pub fn collection(self) -> &'static str {
        match self {
            ObjectClass::Task => "flattenedTasks",
            ObjectClass::Project => "flattenedProjects",
            ObjectClass::Tag => "flattenedTags",
            ObjectClass::Folder => "flattenedFolders",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ObjectClass::Task => "Task",
            ObjectClass::Project => "Project",
            ObjectClass::Tag => "Tag",
            ObjectClass::Folder => "Folder",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl EntityRef {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: None,
        }
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }

    /// Pick the lookup key: a non-empty id wins over a name. Names are kept
    /// verbatim since the script matches them exactly.
    pub fn key(&self) -> Result<LookupKey, BridgeError> {
        if let Some(id) = non_empty(self.id.as_deref()) {
            return Ok(LookupKey::Id(id.to_string()));
        }
        if let Some(name) = non_blank(self.name.as_deref()) {
            return Ok(LookupKey::Name(name.to_string()));
        }
        Err(BridgeError::validation("either id or name must be provided"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupKey {
    Id(String),
    Name(String),
}

/// One way of finding a single database object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub class: ObjectClass,
    pub key: LookupKey,
}

impl Lookup {
    pub fn id(class: ObjectClass, id: impl Into<String>) -> Self {
        Self {
            class,
            key: LookupKey::Id(id.into()),
        }
    }

    pub fn name(class: ObjectClass, name: impl Into<String>) -> Self {
        Self {
            class,
            key: LookupKey::Name(name.into()),
        }
    }

    pub fn describe(&self) -> String {
        match &self.key {
            LookupKey::Id(id) => format!("{} not found: {}", self.class.label(), id),
            LookupKey::Name(name) => format!("{} not found: {}", self.class.label(), name),
        }
    }
}

/// What a destination container is, as far as placement checks go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationRole {
    ProjectRoot,
    ParentTask,
    ParentTag,
    TagRoot,
    Folder,
}

impl DestinationRole {
    pub fn as_str(self) -> &'static str {
        match self {
            DestinationRole::ProjectRoot => "project",
            DestinationRole::ParentTask => "parentTask",
            DestinationRole::ParentTag => "parentTag",
            DestinationRole::TagRoot => "root",
            DestinationRole::Folder => "folder",
        }
    }
}

/// A resolver strategy for a destination container. `lookup` is `None` only
/// for the library-level tag root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub role: DestinationRole,
    pub lookup: Option<Lookup>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskDestination {
    ProjectId(String),
    ProjectName(String),
    ParentTaskId(String),
    ParentTaskName(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagDestination {
    ParentTagId(String),
    ParentTagName(String),
    Root,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectDestination {
    FolderId(String),
    FolderName(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelocationTarget {
    Task(TaskDestination),
    Tag(TagDestination),
    Project(ProjectDestination),
}

impl RelocationTarget {
    pub fn destination(&self) -> Destination {
        let (role, lookup) = match self {
            RelocationTarget::Task(TaskDestination::ProjectId(id)) => {
                (DestinationRole::ProjectRoot, Some(Lookup::id(ObjectClass::Project, id)))
            }
            RelocationTarget::Task(TaskDestination::ProjectName(name)) => {
                (DestinationRole::ProjectRoot, Some(Lookup::name(ObjectClass::Project, name)))
            }
            RelocationTarget::Task(TaskDestination::ParentTaskId(id)) => {
                (DestinationRole::ParentTask, Some(Lookup::id(ObjectClass::Task, id)))
            }
            RelocationTarget::Task(TaskDestination::ParentTaskName(name)) => {
                (DestinationRole::ParentTask, Some(Lookup::name(ObjectClass::Task, name)))
            }
            RelocationTarget::Tag(TagDestination::ParentTagId(id)) => {
                (DestinationRole::ParentTag, Some(Lookup::id(ObjectClass::Tag, id)))
            }
            RelocationTarget::Tag(TagDestination::ParentTagName(name)) => {
                (DestinationRole::ParentTag, Some(Lookup::name(ObjectClass::Tag, name)))
            }
            RelocationTarget::Tag(TagDestination::Root) => (DestinationRole::TagRoot, None),
            RelocationTarget::Project(ProjectDestination::FolderId(id)) => {
                (DestinationRole::Folder, Some(Lookup::id(ObjectClass::Folder, id)))
            }
            RelocationTarget::Project(ProjectDestination::FolderName(name)) => {
                (DestinationRole::Folder, Some(Lookup::name(ObjectClass::Folder, name)))
            }
        };
        Destination { role, lookup }
    }
}

/// Candidate discriminants in their declared priority order. Each candidate
/// names its input field and how to build the destination from its value.
pub struct RelocationFields<'a, T> {
    candidates: Vec<(&'static str, Option<&'a str>, fn(String) -> T)>,
}

impl<'a, T> RelocationFields<'a, T> {
    pub fn new() -> Self {
        Self {
            candidates: Vec::new(),
        }
    }

    pub fn with(mut self, field: &'static str, value: Option<&'a str>, build: fn(String) -> T) -> Self {
        self.candidates.push((field, value, build));
        self
    }

    /// Returns the single present discriminant, `None` when nothing is set,
    /// or a validation error when more than one is set.
    pub fn single(self) -> Result<Option<T>, BridgeError> {
        let mut present: Vec<(&'static str, &str, fn(String) -> T)> = self
            .candidates
            .into_iter()
            .filter_map(|(field, value, build)| non_blank(value).map(|value| (field, value, build)))
            .collect();
        match present.len() {
            0 => Ok(None),
            1 => {
                let (_, value, build) = present.remove(0);
                Ok(Some(build(value.to_string())))
            }
            _ => Err(BridgeError::validation(format!(
                "only one destination may be given, got: {}",
                present
                    .iter()
                    .map(|(field, _, _)| *field)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }
}

impl<T> Default for RelocationFields<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    Incomplete,
    Completed,
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProjectStatus {
    Active,
    OnHold,
    Done,
    Dropped,
}

impl ProjectStatus {
    pub fn script_value(self) -> &'static str {
        match self {
            ProjectStatus::Active => "Project.Status.Active",
            ProjectStatus::OnHold => "Project.Status.OnHold",
            ProjectStatus::Done => "Project.Status.Done",
            ProjectStatus::Dropped => "Project.Status.Dropped",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TagStatus {
    Active,
    OnHold,
    Dropped,
}

impl TagStatus {
    pub fn script_value(self) -> &'static str {
        match self {
            TagStatus::Active => "Tag.Status.Active",
            TagStatus::OnHold => "Tag.Status.OnHold",
            TagStatus::Dropped => "Tag.Status.Dropped",
        }
    }
}

/// A date property value. An empty input string clears the date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateInput {
    Clear,
    /// ISO text handed to `new Date(...)`. Date-only input becomes local midnight.
    At(String),
}

impl DateInput {
    pub fn parse(field: &str, value: &str) -> Result<Self, BridgeError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok(DateInput::Clear);
        }
        if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(DateInput::At(parsed.to_rfc3339()));
        }
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
            return Ok(DateInput::At(parsed.format("%Y-%m-%dT%H:%M:%S").to_string()));
        }
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Ok(DateInput::At(format!("{}T00:00:00", parsed.format("%Y-%m-%d"))));
        }
        Err(BridgeError::validation(format!(
            "invalid date for {}: {}",
            field, value
        )))
    }

    pub fn parse_optional(field: &str, value: Option<&str>) -> Result<Option<Self>, BridgeError> {
        value.map(|value| Self::parse(field, value)).transpose()
    }
}

pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Like [`non_empty`] but returns the value untrimmed.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

pub fn clean_names(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        let trimmed = value.trim();
        if !trimmed.is_empty() && !out.iter().any(|existing| existing == trimmed) {
            out.push(trimmed.to_string());
        }
    }
    out
}
