#![allow(dead_code)]

mod omnijs;

pub use omnijs::OmniJsRunner;

use std::cell::RefCell;
use std::collections::VecDeque;

use focusbridge_core::runner::{ProcessOutput, ScriptRunner};
use focusbridge_core::BridgeError;

/// Replays canned interpreter results and records every script it was given.
#[derive(Default)]
pub struct ScriptedRunner {
    responses: RefCell<VecDeque<Result<ProcessOutput, BridgeError>>>,
    scripts: RefCell<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, stdout: &str) -> Self {
        self.responses.borrow_mut().push_back(Ok(ProcessOutput {
            stdout: stdout.to_string(),
            stderr: String::new(),
        }));
        self
    }

    pub fn fail(self, err: BridgeError) -> Self {
        self.responses.borrow_mut().push_back(Err(err));
        self
    }

    pub fn scripts(&self) -> Vec<String> {
        self.scripts.borrow().clone()
    }

    /// The OmniJS program inside the last host script.
    pub fn last_program(&self) -> String {
        let scripts = self.scripts.borrow();
        let script = scripts.last().expect("no script was run");
        unwrap_host(script)
    }
}

impl ScriptRunner for ScriptedRunner {
    fn run(&self, script: &str) -> Result<ProcessOutput, BridgeError> {
        self.scripts.borrow_mut().push(script.to_string());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected script run"))
    }
}

/// Reverse the host wrapper's literal escaping to recover the program text.
pub fn unwrap_host(script: &str) -> String {
    let start = script.find("evaluateJavascript(\"").expect("host wrapper") + "evaluateJavascript(\"".len();
    let end = script.rfind("\");").expect("host wrapper end");
    let escaped = &script[start..end];
    let mut out = String::new();
    let mut chars = escaped.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let code = u32::from_str_radix(&hex, 16).expect("hex escape");
                out.push(char::from_u32(code).expect("char"));
            }
            Some(other) => out.push(other),
            None => panic!("dangling escape"),
        }
    }
    out
}
