use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// The interpreter could not be started or exited abnormally.
    #[error("Process error: {message}")]
    Process {
        message: String,
        status: Option<i32>,
        stderr: String,
    },
    /// Stdout was not a single well-formed result envelope.
    #[error("Decode error: {message}")]
    Decode { message: String, raw: String },
    /// The script ran and reported `success: false`.
    #[error("{0}")]
    Business(String),
    /// Arguments were rejected before any script was generated.
    #[error("Invalid request: {0}")]
    Validation(String),
}

impl BridgeError {
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::Process { .. } => "process",
            BridgeError::Decode { .. } => "decode",
            BridgeError::Business(_) => "business",
            BridgeError::Validation(_) => "validation",
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        BridgeError::Validation(message.into())
    }

    pub fn decode(message: impl Into<String>, raw: &str) -> Self {
        BridgeError::Decode {
            message: message.into(),
            raw: raw.to_string(),
        }
    }
}
