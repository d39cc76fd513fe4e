use std::path::PathBuf;
use std::process::Command;

use tracing::{debug, warn};

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::escape::shell_command_line;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs one generated script to completion.
pub trait ScriptRunner {
    fn run(&self, script: &str) -> Result<ProcessOutput, BridgeError>;
}

impl<R: ScriptRunner + ?Sized> ScriptRunner for &R {
    fn run(&self, script: &str) -> Result<ProcessOutput, BridgeError> {
        (**self).run(script)
    }
}

/// Spawns the configured interpreter with the script as its last argument.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: String,
    args: Vec<String>,
}

impl ProcessRunner {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.interpreter(), config.interpreter_args())
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The invocation as a shell command line, for diagnostics.
    pub fn command_line(&self, script: &str) -> String {
        let mut args = self.args.clone();
        args.push(script.to_string());
        shell_command_line(&self.program, &args)
    }

    fn resolve_program(&self) -> Result<PathBuf, BridgeError> {
        which::which(&self.program).map_err(|err| BridgeError::Process {
            message: format!("interpreter {} not found: {}", self.program, err),
            status: None,
            stderr: String::new(),
        })
    }
}

impl ScriptRunner for ProcessRunner {
    fn run(&self, script: &str) -> Result<ProcessOutput, BridgeError> {
        let program = self.resolve_program()?;
        debug!(
            program = %program.display(),
            script_bytes = script.len(),
            "running automation script"
        );
        let output = Command::new(&program)
            .args(&self.args)
            .arg(script)
            .output()
            .map_err(|err| BridgeError::Process {
                message: format!("failed to run {}: {}", program.display(), err),
                status: None,
                stderr: String::new(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            let status = output.status.code();
            let detail = stderr.trim();
            return Err(BridgeError::Process {
                message: match status {
                    Some(code) if detail.is_empty() => format!("interpreter exited with status {}", code),
                    Some(code) => format!("interpreter exited with status {}: {}", code, detail),
                    None => "interpreter terminated by signal".to_string(),
                },
                status,
                stderr,
            });
        }
        if !stderr.trim().is_empty() {
            warn!(stderr = %stderr.trim(), "interpreter wrote to stderr");
        }
        Ok(ProcessOutput { stdout, stderr })
    }
}
