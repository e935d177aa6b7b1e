use serde::Serialize;
use thiserror::Error;

use crate::amount::AmountError;

/// Failures surfaced to callers. The set is closed: every error leaving this
/// crate is one of these five kinds.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Operation needs an established connection
    #[error("not connected")]
    NotConnected,

    /// The user declined a signing-agent prompt
    #[error("request rejected by user")]
    UserRejected,

    /// Input rejected locally, before any network traffic
    #[error("validation failed: {0}")]
    Validation(String),

    /// The network or registry refused to execute a submission
    #[error("execution failed{}", reason_suffix(.reason))]
    GasOrRevert { reason: Option<String> },

    /// A read the caller depends on could not be completed
    #[error("read '{operation}' failed: {detail}")]
    Read { operation: String, detail: String },
}

/// Machine-readable kind, stable across message wording changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotConnected,
    UserRejected,
    Validation,
    GasOrRevert,
    Read,
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::NotConnected => ErrorKind::NotConnected,
            ClientError::UserRejected => ErrorKind::UserRejected,
            ClientError::Validation(_) => ErrorKind::Validation,
            ClientError::GasOrRevert { .. } => ErrorKind::GasOrRevert,
            ClientError::Read { .. } => ErrorKind::Read,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ClientError::Validation(message.into())
    }

    pub fn read(operation: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        ClientError::Read {
            operation: operation.into(),
            detail: detail.to_string(),
        }
    }
}

impl From<AmountError> for ClientError {
    fn from(err: AmountError) -> Self {
        ClientError::Validation(err.to_string())
    }
}

/// Surfaced form of the last lifecycle failure, kept on the connection state.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&ClientError> for ErrorInfo {
    fn from(err: &ClientError) -> Self {
        ErrorInfo {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

fn reason_suffix(reason: &Option<String>) -> String {
    match reason {
        Some(reason) => format!(": {reason}"),
        None => String::new(),
    }
}
