//! Declarative queries over tasks, projects and tags.
//!
//! Filtering, sorting, limiting and projection all run inside the generated
//! program so only the selected records cross the process boundary. The
//! decoded records are then passed through [`finish_items`], which applies the
//! same ordering, limit and projection rules again on the Rust side.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::BridgeError;
use crate::escape::js_string;
use crate::model::{clean_names, non_empty, EntityKind};
use crate::script::{Expr, Js, Program, Stmt};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QueryFilters {
    pub id: Option<String>,
    pub name: Option<String>,
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    pub parent_id: Option<String>,
    pub parent_name: Option<String>,
    pub folder_id: Option<String>,
    pub folder_name: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<Vec<String>>,
    pub flagged: Option<bool>,
    pub inbox: Option<bool>,
    pub has_note: Option<bool>,
    pub due_within: Option<u32>,
    pub deferred_until: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpec {
    pub entity: EntityKind,
    #[serde(default)]
    pub filters: QueryFilters,
    #[serde(default)]
    pub fields: Option<Vec<String>>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: SortOrder,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub summary: bool,
    #[serde(default)]
    pub include_inactive: bool,
}

impl QuerySpec {
    pub fn new(entity: EntityKind) -> Self {
        Self {
            entity,
            filters: QueryFilters::default(),
            fields: None,
            sort_by: None,
            sort_order: SortOrder::Asc,
            limit: None,
            summary: false,
            include_inactive: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Map<String, Value>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Map<String, Value>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl From<Result<QueryOutcome, BridgeError>> for QueryResult {
    fn from(result: Result<QueryOutcome, BridgeError>) -> Self {
        match result {
            Ok(outcome) => Self {
                success: true,
                count: Some(outcome.count),
                items: outcome.items,
                ..Self::default()
            },
            Err(err) => Self {
                success: false,
                error: Some(err.to_string()),
                error_kind: Some(err.kind().to_string()),
                ..Self::default()
            },
        }
    }
}

pub struct FieldDef {
    pub name: &'static str,
    pub expr: &'static str,
}

const fn field(name: &'static str, expr: &'static str) -> FieldDef {
    FieldDef { name, expr }
}

const TASK_FIELDS: &[FieldDef] = &[
    field("id", "o.id.primaryKey"),
    field("name", "o.name"),
    field("note", "o.note"),
    field("flagged", "o.flagged"),
    field("completed", "o.completed"),
    field("taskStatus", "__enumName(o.taskStatus)"),
    field("dueDate", "__iso(o.dueDate)"),
    field("deferDate", "__iso(o.deferDate)"),
    field("plannedDate", "__iso(o.plannedDate)"),
    field("completionDate", "__iso(o.completionDate)"),
    field("estimatedMinutes", "o.estimatedMinutes || null"),
    field("projectId", "__pk(o.containingProject)"),
    field("projectName", "o.containingProject ? o.containingProject.name : null"),
    field("parentId", "__parentTask(o) ? __pk(__parentTask(o)) : null"),
    field("parentName", "__parentTask(o) ? __parentTask(o).name : null"),
    field("tagNames", "o.tags.map((t) => t.name)"),
    field("inInbox", "o.inInbox"),
    field("hasChildren", "o.hasChildren"),
    field("added", "__iso(o.added)"),
    field("modified", "__iso(o.modified)"),
];

const PROJECT_FIELDS: &[FieldDef] = &[
    field("id", "o.id.primaryKey"),
    field("name", "o.name"),
    field("note", "o.note"),
    field("status", "__enumName(o.status)"),
    field("flagged", "o.flagged"),
    field("sequential", "o.sequential"),
    field("dueDate", "__iso(o.dueDate)"),
    field("deferDate", "__iso(o.deferDate)"),
    field("folderId", "__pk(o.parentFolder)"),
    field("folderName", "o.parentFolder ? o.parentFolder.name : null"),
    field("taskCount", "o.flattenedTasks.length"),
    field("tagNames", "o.tags.map((t) => t.name)"),
    field("added", "__iso(o.task.added)"),
    field("modified", "__iso(o.task.modified)"),
];

const TAG_FIELDS: &[FieldDef] = &[
    field("id", "o.id.primaryKey"),
    field("name", "o.name"),
    field("status", "__enumName(o.status)"),
    field("active", "o.active"),
    field("allowsNextAction", "o.allowsNextAction"),
    field("parentId", "__pk(o.parent)"),
    field("parentName", "o.parent ? o.parent.name : null"),
    field("taskCount", "o.tasks.length"),
    field("remainingTaskCount", "o.remainingTasks.length"),
];

pub fn field_catalog(kind: EntityKind) -> &'static [FieldDef] {
    match kind {
        EntityKind::Task => TASK_FIELDS,
        EntityKind::Project => PROJECT_FIELDS,
        EntityKind::Tag => TAG_FIELDS,
    }
}

pub fn default_fields(kind: EntityKind) -> Vec<&'static str> {
    field_catalog(kind).iter().map(|def| def.name).collect()
}

fn status_field(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Task => "taskStatus",
        EntityKind::Project | EntityKind::Tag => "status",
    }
}

fn active_predicate(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Task => {
            "o.taskStatus !== Task.Status.Completed && o.taskStatus !== Task.Status.Dropped"
        }
        EntityKind::Project => {
            "o.status === Project.Status.Active || o.status === Project.Status.OnHold"
        }
        EntityKind::Tag => "o.status !== Tag.Status.Dropped",
    }
}

/// One compiled filter, evaluated against a record inside the program.
#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    Equals { field: &'static str, value: Js },
    Contains { field: &'static str, needle: String },
    AnyOf { field: &'static str, values: Vec<String> },
    Intersects { field: &'static str, values: Vec<String> },
    Within { field: &'static str, days: u32 },
    Present { field: &'static str, expected: bool },
}

impl Matcher {
    fn to_js(&self) -> Js {
        let (op, field, value) = match self {
            Matcher::Equals { field, value } => ("eq", *field, value.clone()),
            Matcher::Contains { field, needle } => ("contains", *field, Js::str(needle.clone())),
            Matcher::AnyOf { field, values } => ("anyOf", *field, Js::strings(values)),
            Matcher::Intersects { field, values } => ("intersects", *field, Js::strings(values)),
            Matcher::Within { field, days } => ("within", *field, Js::Int(i64::from(*days))),
            Matcher::Present { field, expected } => ("present", *field, Js::Bool(*expected)),
        };
        Js::Object(vec![
            ("op".to_string(), Js::str(op)),
            ("field".to_string(), Js::str(field)),
            ("value".to_string(), value),
        ])
    }
}

fn applies(kind: EntityKind, filter: &str, allowed: &[EntityKind]) -> Result<(), BridgeError> {
    if allowed.contains(&kind) {
        return Ok(());
    }
    Err(BridgeError::validation(format!(
        "filter {} does not apply to {}",
        filter,
        kind.plural()
    )))
}

pub fn compile_filters(kind: EntityKind, filters: &QueryFilters) -> Result<Vec<Matcher>, BridgeError> {
    use EntityKind::{Project, Tag, Task};

    let mut matchers = Vec::new();
    if let Some(id) = non_empty(filters.id.as_deref()) {
        matchers.push(Matcher::Equals {
            field: "id",
            value: Js::str(id),
        });
    }
    if let Some(name) = non_empty(filters.name.as_deref()) {
        matchers.push(Matcher::Contains {
            field: "name",
            needle: name.to_string(),
        });
    }
    if let Some(project_id) = non_empty(filters.project_id.as_deref()) {
        applies(kind, "projectId", &[Task])?;
        matchers.push(Matcher::Equals {
            field: "projectId",
            value: Js::str(project_id),
        });
    }
    if let Some(project_name) = non_empty(filters.project_name.as_deref()) {
        applies(kind, "projectName", &[Task])?;
        matchers.push(Matcher::Contains {
            field: "projectName",
            needle: project_name.to_string(),
        });
    }
    if let Some(parent_id) = non_empty(filters.parent_id.as_deref()) {
        applies(kind, "parentId", &[Task, Tag])?;
        matchers.push(Matcher::Equals {
            field: "parentId",
            value: Js::str(parent_id),
        });
    }
    if let Some(parent_name) = non_empty(filters.parent_name.as_deref()) {
        applies(kind, "parentName", &[Task, Tag])?;
        matchers.push(Matcher::Contains {
            field: "parentName",
            needle: parent_name.to_string(),
        });
    }
    if let Some(folder_id) = non_empty(filters.folder_id.as_deref()) {
        applies(kind, "folderId", &[Project])?;
        matchers.push(Matcher::Equals {
            field: "folderId",
            value: Js::str(folder_id),
        });
    }
    if let Some(folder_name) = non_empty(filters.folder_name.as_deref()) {
        applies(kind, "folderName", &[Project])?;
        matchers.push(Matcher::Contains {
            field: "folderName",
            needle: folder_name.to_string(),
        });
    }
    if let Some(tags) = &filters.tags {
        applies(kind, "tags", &[Task, Project])?;
        let tags = clean_names(tags);
        if !tags.is_empty() {
            matchers.push(Matcher::Intersects {
                field: "tagNames",
                values: tags,
            });
        }
    }
    if let Some(status) = &filters.status {
        let status = clean_names(status);
        if !status.is_empty() {
            matchers.push(Matcher::AnyOf {
                field: status_field(kind),
                values: status,
            });
        }
    }
    if let Some(flagged) = filters.flagged {
        applies(kind, "flagged", &[Task, Project])?;
        matchers.push(Matcher::Equals {
            field: "flagged",
            value: Js::Bool(flagged),
        });
    }
    if let Some(inbox) = filters.inbox {
        applies(kind, "inbox", &[Task])?;
        matchers.push(Matcher::Equals {
            field: "inInbox",
            value: Js::Bool(inbox),
        });
    }
    if let Some(has_note) = filters.has_note {
        applies(kind, "hasNote", &[Task, Project])?;
        matchers.push(Matcher::Present {
            field: "note",
            expected: has_note,
        });
    }
    if let Some(days) = filters.due_within {
        applies(kind, "dueWithin", &[Task, Project])?;
        matchers.push(Matcher::Within {
            field: "dueDate",
            days,
        });
    }
    if let Some(days) = filters.deferred_until {
        applies(kind, "deferredUntil", &[Task])?;
        matchers.push(Matcher::Within {
            field: "deferDate",
            days,
        });
    }
    Ok(matchers)
}

/// A validated query, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryCommand {
    pub kind: EntityKind,
    pub matchers: Vec<Matcher>,
    pub fields: Vec<&'static str>,
    pub sort_by: Option<&'static str>,
    pub descending: bool,
    pub limit: Option<usize>,
    pub summary: bool,
    pub include_inactive: bool,
}

fn known_field(kind: EntityKind, name: &str) -> Result<&'static str, BridgeError> {
    field_catalog(kind)
        .iter()
        .find(|def| def.name == name.trim())
        .map(|def| def.name)
        .ok_or_else(|| {
            BridgeError::validation(format!("unknown field for {}: {}", kind.plural(), name))
        })
}

pub fn query_command(spec: &QuerySpec) -> Result<QueryCommand, BridgeError> {
    let kind = spec.entity;
    let matchers = compile_filters(kind, &spec.filters)?;
    let fields = match &spec.fields {
        Some(requested) if !requested.is_empty() => {
            let mut fields: Vec<&'static str> = Vec::new();
            for name in requested {
                let name = known_field(kind, name)?;
                if !fields.contains(&name) {
                    fields.push(name);
                }
            }
            fields
        }
        _ => default_fields(kind),
    };
    let sort_by = match non_empty(spec.sort_by.as_deref()) {
        Some(name) => Some(known_field(kind, name)?),
        None => None,
    };
    Ok(QueryCommand {
        kind,
        matchers,
        fields,
        sort_by,
        descending: spec.sort_order == SortOrder::Desc,
        limit: spec.limit.filter(|limit| *limit > 0).map(|limit| limit as usize),
        summary: spec.summary,
        include_inactive: spec.include_inactive,
    })
}

const QUERY_HELPERS: &str = r#"function __parentTask(o) {
  const p = o.parent;
  if (p === null) { return null; }
  if (o.containingProject !== null && __pk(p) === __pk(o.containingProject)) { return null; }
  return p;
}
function __norm(v) { return String(v).toLowerCase().replace(/[^a-z0-9]/g, ""); }
function __matches(r, matchers) {
  for (const m of matchers) {
    const v = r[m.field];
    if (m.op === "eq") {
      if (v !== m.value) { return false; }
    } else if (m.op === "contains") {
      if (typeof v !== "string" || !v.toLowerCase().includes(m.value.toLowerCase())) { return false; }
    } else if (m.op === "anyOf") {
      if (v === null || v === undefined || !m.value.some((x) => __norm(x) === __norm(v))) { return false; }
    } else if (m.op === "intersects") {
      const have = (v || []).map((x) => String(x).toLowerCase());
      if (!m.value.some((x) => have.includes(String(x).toLowerCase()))) { return false; }
    } else if (m.op === "within") {
      if (!v || Date.parse(v) > Date.now() + m.value * 86400000) { return false; }
    } else if (m.op === "present") {
      const has = v !== null && v !== undefined && v !== "";
      if (has !== m.value) { return false; }
    }
  }
  return true;
}
function __cmp(a, b) {
  if (typeof a === "number" && typeof b === "number") { return a < b ? -1 : (a > b ? 1 : 0); }
  if (typeof a === "boolean" && typeof b === "boolean") { return a === b ? 0 : (a ? 1 : -1); }
  const sa = String(a);
  const sb = String(b);
  return sa < sb ? -1 : (sa > sb ? 1 : 0);
}
function __sorted(items, key, desc) {
  return items
    .map((r, i) => [r, i])
    .sort((x, y) => {
      const a = x[0][key];
      const b = y[0][key];
      const an = a === null || a === undefined;
      const bn = b === null || b === undefined;
      if (an || bn) { return an && bn ? x[1] - y[1] : (an ? 1 : -1); }
      const c = desc ? __cmp(b, a) : __cmp(a, b);
      return c !== 0 ? c : x[1] - y[1];
    })
    .map((p) => p[0]);
}
function __pick(r, fields) {
  const o = {};
  for (const f of fields) { o[f] = r[f] === undefined ? null : r[f]; }
  return o;
}"#;

fn record_helper(kind: EntityKind) -> String {
    let mut lines = vec![
        "function __record(o) {".to_string(),
        "  return {".to_string(),
    ];
    for def in field_catalog(kind) {
        lines.push(format!("    {}: {},", js_string(def.name), def.expr));
    }
    lines.push("  };".to_string());
    lines.push("}".to_string());
    lines.push(format!(
        "function __active(o) {{ return {}; }}",
        active_predicate(kind)
    ));
    lines.join("\n")
}

pub fn render_query(command: &QueryCommand) -> Program {
    let mut loop_body = Vec::new();
    if !command.include_inactive {
        loop_body.push(Stmt::when(Expr::code("!__active(o)"), vec![Stmt::Continue]));
    }
    loop_body.push(Stmt::Const("r", Expr::code("__record(o)")));
    loop_body.push(Stmt::when(
        Expr::code("!__matches(r, matchers)"),
        vec![Stmt::Continue],
    ));
    loop_body.push(Stmt::eval("items.push(r)"));

    let mut body = vec![
        Stmt::Const(
            "matchers",
            Expr::lit(Js::List(command.matchers.iter().map(Matcher::to_js).collect())),
        ),
        Stmt::Const("items", Expr::code("[]")),
        Stmt::ForOf {
            var: "o",
            iter: Expr::code(command.kind.class().collection()),
            body: loop_body,
        },
    ];

    if command.summary {
        body.push(Stmt::Finish(vec![("count", Expr::code("items.length"))]));
    } else {
        body.push(Stmt::Let("out", Expr::code("items")));
        if let Some(key) = command.sort_by {
            body.push(Stmt::assign(
                "out",
                Expr::call(
                    "__sorted",
                    vec![
                        Expr::code("out"),
                        Expr::text(key),
                        Expr::lit(Js::Bool(command.descending)),
                    ],
                ),
            ));
        }
        if let Some(limit) = command.limit {
            body.push(Stmt::assign("out", Expr::code(format!("out.slice(0, {})", limit))));
        }
        body.push(Stmt::Const(
            "fields",
            Expr::lit(Js::List(command.fields.iter().map(|f| Js::str(*f)).collect())),
        ));
        body.push(Stmt::assign("out", Expr::code("out.map((r) => __pick(r, fields))")));
        body.push(Stmt::Finish(vec![
            ("count", Expr::code("out.length")),
            ("items", Expr::code("out")),
        ]));
    }

    Program::new(body)
        .with_helper(QUERY_HELPERS)
        .with_helper(record_helper(command.kind))
}

fn sort_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(items) => items.iter().map(sort_text).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
        other => other.to_string(),
    }
}

/// UTF-16 code unit order, the same order the program's `<` uses.
fn compare_text(a: &str, b: &str) -> Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}

/// Case-sensitive ordinal for strings, numeric for numbers, `false < true`.
/// Mixed types compare by their text forms.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::String(a), Value::String(b)) => compare_text(a, b),
        _ => compare_text(&sort_text(a), &sort_text(b)),
    }
}

/// Stable sort by `key`; missing and null values go last in both directions.
pub fn sort_records(items: &mut [Map<String, Value>], key: &str, descending: bool) {
    items.sort_by(|x, y| {
        let a = x.get(key).filter(|value| !value.is_null());
        let b = y.get(key).filter(|value| !value.is_null());
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) if descending => compare_values(b, a),
            (Some(a), Some(b)) => compare_values(a, b),
        }
    });
}

pub fn prune_record(record: &Map<String, Value>, fields: &[&str]) -> Map<String, Value> {
    let mut out = Map::new();
    for field in fields {
        out.insert(
            (*field).to_string(),
            record.get(*field).cloned().unwrap_or(Value::Null),
        );
    }
    out
}

/// Re-apply ordering, limit and projection to decoded records. Sorting is
/// skipped when the sort key was projected away, keeping the program's order.
pub fn finish_items(command: &QueryCommand, mut items: Vec<Map<String, Value>>) -> Vec<Map<String, Value>> {
    if let Some(key) = command.sort_by {
        if command.fields.contains(&key) {
            sort_records(&mut items, key, command.descending);
        }
    }
    if let Some(limit) = command.limit {
        items.truncate(limit);
    }
    items
        .iter()
        .map(|record| prune_record(record, &command.fields))
        .collect()
}

/// Normalize a decoded envelope payload into an outcome.
pub fn finish_outcome(command: &QueryCommand, outcome: QueryOutcome) -> QueryOutcome {
    if command.summary {
        return QueryOutcome {
            count: outcome.count,
            items: None,
        };
    }
    let items = finish_items(command, outcome.items.unwrap_or_default());
    QueryOutcome {
        count: items.len(),
        items: Some(items),
    }
}
