//! Error types for the registration assistant.

use crate::form::Field;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// User-correctable problems with a field or a file selection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{message}")]
    Invalid { field: String, message: String },

    #[error("{} is required", .field.label())]
    Required { field: Field },

    #[error("{field} does not hold text")]
    NotATextField { field: String },

    #[error("File {name} exceeds maximum size of {max} bytes ({size} bytes)")]
    FileTooLarge { name: String, size: u64, max: u64 },

    #[error("Maximum {max} files allowed per registration (got {count})")]
    TooManyFiles { count: usize, max: usize },

    #[error("File {name} has unsupported type {content_type}")]
    UnsupportedFileType { name: String, content_type: String },

    #[error("Could not read file {name}: {reason}")]
    Unreadable { name: String, reason: String },
}

/// Generic message shown when the backend gives no `detail`.
pub const GENERIC_SUBMIT_FAILURE: &str =
    "An error occurred during registration. Please try again.";

/// Registration submission failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("Form submission handler not found")]
    HandlerNotFound,

    #[error("A submission is already in progress")]
    InProgress,

    #[error("Network error: {0}")]
    Transport(String),

    #[error("{}", .detail.as_deref().unwrap_or(GENERIC_SUBMIT_FAILURE))]
    Rejected {
        status: Option<u16>,
        detail: Option<String>,
    },

    #[error("Invalid response from registration endpoint: {0}")]
    InvalidResponse(String),

    #[error("Form is invalid: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

impl SubmitError {
    /// Whether the failure came from the network or the backend, as opposed
    /// to local configuration or validation.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Rejected { .. } | Self::InvalidResponse(_)
        )
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failures talking to the unexpected-input endpoint.
#[derive(Debug, thiserror::Error)]
pub enum AssistError {
    #[error("Assist request failed: {0}")]
    Transport(String),

    #[error("Invalid assist response: {0}")]
    InvalidResponse(String),
}
