//! Error types for service management.

use thiserror::Error;

/// Main error type for service management operations.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Settings could not be loaded or failed validation.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A name was rejected before any command was spawned.
    #[error("Validation error: {kind}")]
    Validation { kind: ValidationErrorKind },

    /// An external command failed to run or exited unsuccessfully.
    #[error("Command error: {kind}")]
    Command { kind: CommandErrorKind },

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ServiceError {
    /// Shorthand for a spawn/wait failure.
    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::Command {
            kind: CommandErrorKind::ExecutionFailed {
                message: message.into(),
            },
        }
    }

    /// Output captured from the failing command, if any.
    pub fn command_output(&self) -> Option<&str> {
        match self {
            Self::Command {
                kind: CommandErrorKind::NonZeroExit { output, .. },
            } => Some(output),
            _ => None,
        }
    }
}

/// Validation error kinds.
#[derive(Error, Debug)]
pub enum ValidationErrorKind {
    #[error("Invalid service name '{name}': {message}")]
    InvalidServiceName { name: String, message: String },

    #[error("Invalid package name '{name}': {message}")]
    InvalidPackageName { name: String, message: String },
}

/// Command error kinds.
#[derive(Error, Debug)]
pub enum CommandErrorKind {
    #[error("Command execution failed: {message}")]
    ExecutionFailed { message: String },

    #[error("{program} exited with {}: {output}", describe_exit(.exit_code))]
    NonZeroExit {
        program: String,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("Command timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    #[error("Command cancelled")]
    Cancelled,
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "signal".to_string(),
    }
}

/// Result type alias for service management operations.
pub type ServiceResult<T> = Result<T, ServiceError>;
