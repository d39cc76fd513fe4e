//! Structured mutation commands and their rendering into programs.

use crate::model::{
    DateInput, Destination, DestinationRole, EntityKind, Lookup, ProjectStatus, TagStatus,
    TaskStatus,
};
use crate::script::{placed_in, require_lookup, resolve_destination, Expr, Js, Program, Stmt};

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyUpdate {
    Text {
        property: &'static str,
        value: String,
    },
    Flag {
        property: &'static str,
        value: bool,
    },
    Minutes {
        property: &'static str,
        value: Option<u32>,
    },
    Date {
        property: &'static str,
        value: DateInput,
    },
    TaskStatus(TaskStatus),
    ProjectStatus(ProjectStatus),
    TagStatus(TagStatus),
    AddTags(Vec<String>),
    RemoveTags(Vec<String>),
    ReplaceTags(Vec<String>),
}

impl PropertyUpdate {
    /// Name reported in `changedProperties`.
    pub fn property(&self) -> &'static str {
        match self {
            PropertyUpdate::Text { property, .. }
            | PropertyUpdate::Flag { property, .. }
            | PropertyUpdate::Minutes { property, .. }
            | PropertyUpdate::Date { property, .. } => property,
            PropertyUpdate::TaskStatus(_)
            | PropertyUpdate::ProjectStatus(_)
            | PropertyUpdate::TagStatus(_) => "status",
            PropertyUpdate::AddTags(_)
            | PropertyUpdate::RemoveTags(_)
            | PropertyUpdate::ReplaceTags(_) => "tags",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateCommand {
    pub kind: EntityKind,
    pub name: String,
    pub container: Option<Destination>,
    pub properties: Vec<PropertyUpdate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditCommand {
    pub kind: EntityKind,
    pub target: Lookup,
    pub updates: Vec<PropertyUpdate>,
    pub relocation: Option<Destination>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoveCommand {
    pub kind: EntityKind,
    pub target: Lookup,
}

fn mark(property: &'static str) -> Stmt {
    Stmt::Eval(Expr::call("__mark", vec![Expr::text(property)]))
}

/// Assign `subject.<property> = v` when `differs` holds.
fn assign_when(subject: &'static str, property: &'static str, value: Expr, differs: String) -> Stmt {
    Stmt::Block(vec![
        Stmt::Const("v", value),
        Stmt::when(
            Expr::code(differs),
            vec![
                Stmt::assign(format!("{}.{}", subject, property), Expr::code("v")),
                mark(property),
            ],
        ),
    ])
}

fn tag_or_create() -> Expr {
    Expr::code("__byName(flattenedTags, n) || new Tag(n, tags.ending)")
}

fn has_tag(subject: &'static str, tag: &str) -> String {
    format!("{}.tags.some((x) => __pk(x) === __pk({}))", subject, tag)
}

pub fn render_update(subject: &'static str, update: &PropertyUpdate) -> Stmt {
    match update {
        PropertyUpdate::Text { property, value } => assign_when(
            subject,
            property,
            Expr::text(value.clone()),
            format!("{}.{} !== v", subject, property),
        ),
        PropertyUpdate::Flag { property, value } => assign_when(
            subject,
            property,
            Expr::lit(Js::Bool(*value)),
            format!("{}.{} !== v", subject, property),
        ),
        PropertyUpdate::Minutes { property, value } => assign_when(
            subject,
            property,
            Expr::lit(value.map(|v| Js::Int(i64::from(v))).unwrap_or(Js::Null)),
            format!("({}.{} || null) !== v", subject, property),
        ),
        PropertyUpdate::Date { property, value } => assign_when(
            subject,
            property,
            Expr::lit(match value {
                DateInput::Clear => Js::Null,
                DateInput::At(iso) => Js::Date(iso.clone()),
            }),
            format!("!__sameDate({}.{}, v)", subject, property),
        ),
        PropertyUpdate::TaskStatus(TaskStatus::Completed) => Stmt::when(
            Expr::code(format!("!{}.completed", subject)),
            vec![stmt_code(format!("{}.markComplete()", subject)), mark("status")],
        ),
        PropertyUpdate::TaskStatus(TaskStatus::Dropped) => Stmt::when(
            Expr::code(format!("{}.taskStatus !== Task.Status.Dropped", subject)),
            vec![stmt_code(format!("{}.drop(false)", subject)), mark("status")],
        ),
        PropertyUpdate::TaskStatus(TaskStatus::Incomplete) => Stmt::If {
            cond: Expr::code(format!("{}.completed", subject)),
            then: vec![stmt_code(format!("{}.markIncomplete()", subject)), mark("status")],
            otherwise: vec![Stmt::when(
                Expr::code(format!("{}.taskStatus === Task.Status.Dropped", subject)),
                vec![
                    Stmt::assign(format!("{}.active", subject), Expr::code("true")),
                    mark("status"),
                ],
            )],
        },
        PropertyUpdate::ProjectStatus(status) => assign_when(
            subject,
            "status",
            Expr::code(status.script_value()),
            format!("{}.status !== v", subject),
        ),
        PropertyUpdate::TagStatus(status) => assign_when(
            subject,
            "status",
            Expr::code(status.script_value()),
            format!("{}.status !== v", subject),
        ),
        PropertyUpdate::AddTags(names) => Stmt::Block(vec![
            Stmt::Let("touched", Expr::code("false")),
            Stmt::ForOf {
                var: "n",
                iter: Expr::lit(Js::strings(names)),
                body: vec![
                    Stmt::Const("t", tag_or_create()),
                    Stmt::when(
                        Expr::code(format!("!{}", has_tag(subject, "t"))),
                        vec![
                            stmt_code(format!("{}.addTag(t)", subject)),
                            Stmt::assign("touched", Expr::code("true")),
                        ],
                    ),
                ],
            },
            Stmt::when(Expr::code("touched"), vec![mark("tags")]),
        ]),
        PropertyUpdate::RemoveTags(names) => Stmt::Block(vec![
            Stmt::Let("touched", Expr::code("false")),
            Stmt::ForOf {
                var: "n",
                iter: Expr::lit(Js::strings(names)),
                body: vec![
                    Stmt::Const("t", Expr::code("__byName(flattenedTags, n)")),
                    Stmt::when(
                        Expr::code(format!("t !== null && {}", has_tag(subject, "t"))),
                        vec![
                            stmt_code(format!("{}.removeTag(t)", subject)),
                            Stmt::assign("touched", Expr::code("true")),
                        ],
                    ),
                ],
            },
            Stmt::when(Expr::code("touched"), vec![mark("tags")]),
        ]),
        PropertyUpdate::ReplaceTags(names) => Stmt::Block(vec![
            Stmt::Const("wanted", Expr::code("[]")),
            Stmt::ForOf {
                var: "n",
                iter: Expr::lit(Js::strings(names)),
                body: vec![stmt_code("wanted.push(__byName(flattenedTags, n) || new Tag(n, tags.ending))")],
            },
            Stmt::Const(
                "have",
                Expr::code(format!("{}.tags.map(__pk).sort().join(\"\\n\")", subject)),
            ),
            Stmt::Const("want", Expr::code("wanted.map(__pk).sort().join(\"\\n\")")),
            Stmt::when(
                Expr::code("have !== want"),
                vec![
                    stmt_code(format!("{}.clearTags()", subject)),
                    stmt_code(format!("{}.addTags(wanted)", subject)),
                    mark("tags"),
                ],
            ),
        ]),
    }
}

fn stmt_code(code: impl Into<String>) -> Stmt {
    Stmt::eval(code.into())
}

fn move_call(role: DestinationRole, subject: &'static str) -> Stmt {
    let function = match role {
        DestinationRole::ProjectRoot | DestinationRole::ParentTask => "moveTasks",
        DestinationRole::ParentTag | DestinationRole::TagRoot => "moveTags",
        DestinationRole::Folder => "moveSections",
    };
    stmt_code(format!("{}([{}], dest.ending)", function, subject))
}

/// Refuse a destination that is the target itself or sits beneath it, before
/// any property is touched.
fn cycle_guard(kind: EntityKind, role: DestinationRole) -> Vec<Stmt> {
    let message = match (kind, role) {
        (EntityKind::Task, DestinationRole::ParentTask) => {
            "Cannot move a task into itself or one of its own subtasks"
        }
        (EntityKind::Tag, DestinationRole::ParentTag) => {
            "Cannot move a tag into itself or one of its own child tags"
        }
        _ => return Vec::new(),
    };
    vec![Stmt::when(
        Expr::code("__within(dest, target)"),
        vec![Stmt::Fail(Expr::text(message))],
    )]
}

fn default_position(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Task => "inbox.ending",
        EntityKind::Project => "library.ending",
        EntityKind::Tag => "tags.ending",
    }
}

fn id_key(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Task => "taskId",
        EntityKind::Project => "projectId",
        EntityKind::Tag => "tagId",
    }
}

pub fn render_create(command: &CreateCommand) -> Program {
    let mut body = Vec::new();
    match &command.container {
        Some(container) => body.extend(resolve_destination(std::slice::from_ref(container))),
        None => {
            body.push(Stmt::Let("dest", Expr::code("null")));
            body.push(Stmt::Let("destRole", Expr::code("null")));
        }
    }
    body.push(Stmt::Const(
        "item",
        Expr::call(
            format!("new {}", command.kind.class().constructor()),
            vec![
                Expr::text(command.name.clone()),
                Expr::code(format!(
                    "dest === null ? {} : dest.ending",
                    default_position(command.kind)
                )),
            ],
        ),
    ));
    for property in &command.properties {
        body.push(render_update("item", property));
    }
    let container_name = match command.kind {
        EntityKind::Task => "dest === null ? \"Inbox\" : dest.name",
        EntityKind::Project | EntityKind::Tag => "dest === null ? null : dest.name",
    };
    let mut fields = vec![
        (id_key(command.kind), Expr::code("__pk(item)")),
        ("name", Expr::code("item.name")),
        ("parentName", Expr::code(container_name)),
    ];
    if command.kind == EntityKind::Task {
        fields.push(("containerKind", Expr::code("destRole === null ? \"inbox\" : destRole")));
    }
    body.push(Stmt::Finish(fields));
    Program::new(body)
}

pub fn render_edit(command: &EditCommand) -> Program {
    let mut body = require_lookup("target", &command.target);
    if let Some(destination) = &command.relocation {
        body.extend(resolve_destination(std::slice::from_ref(destination)));
        body.extend(cycle_guard(command.kind, destination.role));
    }
    for update in &command.updates {
        body.push(render_update("target", update));
    }
    if let Some(destination) = &command.relocation {
        let placed = placed_in("target", destination.role).render();
        body.push(Stmt::when(
            Expr::code(format!("!{}", placed)),
            vec![
                move_call(destination.role, "target"),
                Stmt::when(
                    Expr::code(format!("!{}", placed)),
                    vec![Stmt::Fail(Expr::Concat(vec![
                        Expr::text("Move did not take effect; already changed: "),
                        Expr::code("(changed.length ? changed.join(\", \") : \"nothing\")"),
                    ]))],
                ),
                mark("moved"),
            ],
        ));
    }
    body.push(Stmt::Finish(vec![
        ("id", Expr::code("__pk(target)")),
        ("name", Expr::code("target.name")),
        ("changedProperties", Expr::code("changed")),
    ]));
    Program::new(body)
}

pub fn render_remove(command: &RemoveCommand) -> Program {
    let mut body = require_lookup("target", &command.target);
    body.push(Stmt::Const("removedId", Expr::code("__pk(target)")));
    body.push(Stmt::Const("removedName", Expr::code("target.name")));
    body.push(stmt_code("deleteObject(target)"));
    body.push(Stmt::Finish(vec![
        ("id", Expr::code("removedId")),
        ("name", Expr::code("removedName")),
    ]));
    Program::new(body)
}
