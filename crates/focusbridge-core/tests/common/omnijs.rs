use std::cell::RefCell;

use rquickjs::{Context, Runtime};

use focusbridge_core::runner::{ProcessOutput, ScriptRunner};
use focusbridge_core::BridgeError;

const OBJECT_MODEL: &str = include_str!("omnifocus.js");

/// Evaluates host scripts in QuickJS against an in-memory OmniFocus model, so
/// generated programs actually execute. State persists across runs.
pub struct OmniJsRunner {
    _runtime: Runtime,
    context: Context,
    scripts: RefCell<Vec<String>>,
}

impl OmniJsRunner {
    pub fn new() -> Self {
        let runtime = Runtime::new().expect("quickjs runtime");
        let context = Context::full(&runtime).expect("quickjs context");
        context
            .with(|ctx| ctx.eval::<(), _>(OBJECT_MODEL))
            .expect("load object model");
        Self {
            _runtime: runtime,
            context,
            scripts: RefCell::new(Vec::new()),
        }
    }

    /// Evaluate a snippet against the model and return its value as text.
    pub fn eval(&self, code: &str) -> String {
        self.context
            .with(|ctx| ctx.eval::<String, _>(format!("String({})", code)))
            .expect("evaluate snippet")
    }

    pub fn scripts(&self) -> Vec<String> {
        self.scripts.borrow().clone()
    }
}

impl ScriptRunner for OmniJsRunner {
    fn run(&self, script: &str) -> Result<ProcessOutput, BridgeError> {
        self.scripts.borrow_mut().push(script.to_string());
        self.context.with(|ctx| match ctx.eval::<String, _>(script) {
            Ok(stdout) => Ok(ProcessOutput {
                stdout,
                stderr: String::new(),
            }),
            Err(err) => {
                let message = ctx
                    .catch()
                    .as_exception()
                    .and_then(|exception| exception.message())
                    .unwrap_or_else(|| err.to_string());
                Err(BridgeError::Process {
                    message,
                    status: Some(1),
                    stderr: String::new(),
                })
            }
        })
    }
}
