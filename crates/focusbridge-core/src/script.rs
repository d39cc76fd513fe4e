//! A small statement tree for Omni Automation programs.
//!
//! Generators build [`Stmt`] values from structured commands; [`Program::render`]
//! is the only place that turns them into text. Caller data only ever enters
//! the tree as [`Js`] literals, which are escaped by [`crate::escape`].

use std::borrow::Cow;

use crate::escape::js_string;
use crate::model::{Destination, DestinationRole, Lookup, LookupKey};

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum Js {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    /// `new Date("...")`
    Date(String),
    List(Vec<Js>),
    Object(Vec<(String, Js)>),
}

impl Js {
    pub fn str(value: impl Into<String>) -> Self {
        Js::Str(value.into())
    }

    pub fn strings(values: &[String]) -> Self {
        Js::List(values.iter().cloned().map(Js::Str).collect())
    }

    fn render(&self) -> String {
        match self {
            Js::Null => "null".to_string(),
            Js::Bool(value) => value.to_string(),
            Js::Int(value) => value.to_string(),
            Js::Str(value) => js_string(value),
            Js::Date(value) => format!("new Date({})", js_string(value)),
            Js::List(items) => format!(
                "[{}]",
                items.iter().map(Js::render).collect::<Vec<_>>().join(", ")
            ),
            Js::Object(fields) => {
                if fields.is_empty() {
                    return "{}".to_string();
                }
                format!(
                    "{{ {} }}",
                    fields
                        .iter()
                        .map(|(key, value)| format!("{}: {}", js_string(key), value.render()))
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Lit(Js),
    /// Fixed generator code. Never built from caller input.
    Code(Cow<'static, str>),
    /// String concatenation.
    Concat(Vec<Expr>),
    Call(Cow<'static, str>, Vec<Expr>),
    Object(Vec<(&'static str, Expr)>),
}

impl Expr {
    pub fn code(code: impl Into<Cow<'static, str>>) -> Self {
        Expr::Code(code.into())
    }

    pub fn lit(value: Js) -> Self {
        Expr::Lit(value)
    }

    pub fn text(value: impl Into<String>) -> Self {
        Expr::Lit(Js::Str(value.into()))
    }

    pub fn call(function: impl Into<Cow<'static, str>>, args: Vec<Expr>) -> Self {
        Expr::Call(function.into(), args)
    }

    pub fn render(&self) -> String {
        match self {
            Expr::Lit(value) => value.render(),
            Expr::Code(code) => code.to_string(),
            Expr::Concat(parts) => parts.iter().map(Expr::render).collect::<Vec<_>>().join(" + "),
            Expr::Call(function, args) => format!(
                "{}({})",
                function,
                args.iter().map(Expr::render).collect::<Vec<_>>().join(", ")
            ),
            Expr::Object(fields) => {
                if fields.is_empty() {
                    return "{}".to_string();
                }
                format!(
                    "{{ {} }}",
                    fields
                        .iter()
                        .map(|(key, value)| format!("{}: {}", key, value.render()))
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Const(&'static str, Expr),
    Let(&'static str, Expr),
    Assign(Cow<'static, str>, Expr),
    Eval(Expr),
    If {
        cond: Expr,
        then: Vec<Stmt>,
        otherwise: Vec<Stmt>,
    },
    ForOf {
        var: &'static str,
        iter: Expr,
        body: Vec<Stmt>,
    },
    Block(Vec<Stmt>),
    Continue,
    /// Record a failure envelope and leave the program body.
    Fail(Expr),
    /// Record the success envelope.
    Finish(Vec<(&'static str, Expr)>),
}

impl Stmt {
    pub fn when(cond: Expr, then: Vec<Stmt>) -> Self {
        Stmt::If {
            cond,
            then,
            otherwise: Vec::new(),
        }
    }

    pub fn assign(target: impl Into<Cow<'static, str>>, value: Expr) -> Self {
        Stmt::Assign(target.into(), value)
    }

    pub fn eval(code: impl Into<Cow<'static, str>>) -> Self {
        Stmt::Eval(Expr::code(code))
    }
}

const BODY_LABEL: &str = "__main";

/// Helpers shared by every program.
const PRELUDE: &str = r#"function __byId(cls, id) {
  try { return cls.byIdentifier(id) || null; } catch (e) { return null; }
}
function __byName(items, name) {
  for (const o of items) { if (o.name === name) { return o; } }
  return null;
}
function __pk(o) { return o ? o.id.primaryKey : null; }
function __within(o, ancestor) {
  for (let p = o; p; p = p.parent) { if (__pk(p) === __pk(ancestor)) { return true; } }
  return false;
}
function __mark(p) { if (!changed.includes(p)) { changed.push(p); } }
function __iso(d) { return d ? d.toISOString() : null; }
function __sameDate(a, b) {
  if (!a || !b) { return !a && !b; }
  return a.getTime() === b.getTime();
}
function __enumName(v) {
  if (v === null || v === undefined) { return null; }
  const m = String(v).match(/:\s*([^\]]+)\]$/);
  return m ? m[1].trim() : String(v);
}
function __message(e) {
  if (e && e.message) { return String(e.message); }
  return String(e);
}"#;

/// A complete program: prelude, one labelled body, one terminal return.
/// `changed` is declared outside the body so a thrown error can still report
/// what was already applied.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub helpers: Vec<String>,
    pub body: Vec<Stmt>,
}

impl Program {
    pub fn new(body: Vec<Stmt>) -> Self {
        Self {
            helpers: Vec::new(),
            body,
        }
    }

    pub fn with_helper(mut self, helper: impl Into<String>) -> Self {
        self.helpers.push(helper.into());
        self
    }

    pub fn render(&self) -> String {
        let mut out = Renderer::default();
        out.line("(() => {");
        out.indent += 1;
        for line in PRELUDE.lines() {
            out.line(line);
        }
        for helper in &self.helpers {
            for line in helper.lines() {
                out.line(line);
            }
        }
        out.line("let __result = { success: false, error: \"script produced no result\" };");
        out.line("const changed = [];");
        out.line("try {");
        out.indent += 1;
        out.line(&format!("{}: {{", BODY_LABEL));
        out.indent += 1;
        out.stmts(&self.body);
        out.indent -= 1;
        out.line("}");
        out.indent -= 1;
        out.line("} catch (err) {");
        out.line("  const done = changed.length ? \"; already changed: \" + changed.join(\", \") : \"\";");
        out.line("  __result = { success: false, error: __message(err) + done };");
        out.line("}");
        out.line("return JSON.stringify(__result);");
        out.indent -= 1;
        out.line("})()");
        out.finish()
    }
}

/// Wrap a rendered program for the JXA host: the program text becomes a
/// string literal handed to the application's OmniJS evaluator.
pub fn host_script(application: &str, program: &Program) -> String {
    format!(
        "Application({}).evaluateJavascript({});",
        js_string(application),
        js_string(&program.render())
    )
}

#[derive(Default)]
struct Renderer {
    lines: Vec<String>,
    indent: usize,
}

impl Renderer {
    fn line(&mut self, text: &str) {
        self.lines.push(format!("{}{}", "  ".repeat(self.indent), text));
    }

    fn block(&mut self, head: &str, body: &[Stmt]) {
        self.line(&format!("{} {{", head));
        self.indent += 1;
        self.stmts(body);
        self.indent -= 1;
    }

    fn stmts(&mut self, body: &[Stmt]) {
        for stmt in body {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Const(name, value) => self.line(&format!("const {} = {};", name, value.render())),
            Stmt::Let(name, value) => self.line(&format!("let {} = {};", name, value.render())),
            Stmt::Assign(target, value) => self.line(&format!("{} = {};", target, value.render())),
            Stmt::Eval(value) => self.line(&format!("{};", value.render())),
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                self.block(&format!("if ({})", cond.render()), then);
                if otherwise.is_empty() {
                    self.line("}");
                } else {
                    self.line("} else {");
                    self.indent += 1;
                    self.stmts(otherwise);
                    self.indent -= 1;
                    self.line("}");
                }
            }
            Stmt::ForOf { var, iter, body } => {
                self.block(&format!("for (const {} of {})", var, iter.render()), body);
                self.line("}");
            }
            Stmt::Block(body) => {
                self.line("{");
                self.indent += 1;
                self.stmts(body);
                self.indent -= 1;
                self.line("}");
            }
            Stmt::Continue => self.line("continue;"),
            Stmt::Fail(message) => {
                self.line(&format!(
                    "__result = {{ success: false, error: {} }};",
                    message.render()
                ));
                self.line(&format!("break {};", BODY_LABEL));
            }
            Stmt::Finish(fields) => {
                let mut all = vec![("success", Expr::code("true"))];
                all.extend(fields.iter().cloned());
                self.line(&format!("__result = {};", Expr::Object(all).render()));
            }
        }
    }

    fn finish(self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}

/// Expression that evaluates to the object or `null`.
pub fn lookup_expr(lookup: &Lookup) -> Expr {
    match &lookup.key {
        LookupKey::Id(id) => Expr::call(
            "__byId",
            vec![Expr::code(lookup.class.constructor()), Expr::text(id.clone())],
        ),
        LookupKey::Name(name) => Expr::call(
            "__byName",
            vec![Expr::code(lookup.class.collection()), Expr::text(name.clone())],
        ),
    }
}

/// `const <var> = lookup; if (<var> === null) fail`
pub fn require_lookup(var: &'static str, lookup: &Lookup) -> Vec<Stmt> {
    vec![
        Stmt::Const(var, lookup_expr(lookup)),
        Stmt::when(
            Expr::code(format!("{} === null", var)),
            vec![Stmt::Fail(Expr::text(lookup.describe()))],
        ),
    ]
}

/// Try each destination strategy in order until one resolves, binding the
/// result to `dest`/`destRole`. Fails when none is found.
pub fn resolve_destination(strategies: &[Destination]) -> Vec<Stmt> {
    let mut body = vec![
        Stmt::Let("dest", Expr::code("null")),
        Stmt::Let("destRole", Expr::code("null")),
    ];
    for strategy in strategies {
        let found = match &strategy.lookup {
            Some(lookup) => lookup_expr(lookup),
            None => Expr::code("tags"),
        };
        body.push(Stmt::when(
            Expr::code("dest === null"),
            vec![
                Stmt::Const("candidate", found),
                Stmt::when(
                    Expr::code("candidate !== null"),
                    vec![
                        Stmt::assign("dest", Expr::code("candidate")),
                        Stmt::assign("destRole", Expr::text(strategy.role.as_str())),
                    ],
                ),
            ],
        ));
    }
    let missing = strategies
        .iter()
        .filter_map(|strategy| strategy.lookup.as_ref())
        .map(Lookup::describe)
        .collect::<Vec<_>>()
        .join("; ");
    let missing = if missing.is_empty() {
        "Destination not found".to_string()
    } else {
        missing
    };
    body.push(Stmt::when(
        Expr::code("dest === null"),
        vec![Stmt::Fail(Expr::text(missing))],
    ));
    body
}

/// Condition that holds when `subject` already sits directly inside `dest`
/// for the given role.
pub fn placed_in(subject: &'static str, role: DestinationRole) -> Expr {
    let code = match role {
        DestinationRole::ProjectRoot => format!(
            "({s}.containingProject !== null && __pk({s}.containingProject) === __pk(dest) && ({s}.parent === null || __pk({s}.parent) === __pk(dest)))",
            s = subject
        ),
        DestinationRole::ParentTask | DestinationRole::ParentTag => {
            format!("({s}.parent !== null && __pk({s}.parent) === __pk(dest))", s = subject)
        }
        DestinationRole::TagRoot => format!("({}.parent === null)", subject),
        DestinationRole::Folder => format!(
            "({s}.parentFolder !== null && __pk({s}.parentFolder) === __pk(dest))",
            s = subject
        ),
    };
    Expr::code(code)
}
