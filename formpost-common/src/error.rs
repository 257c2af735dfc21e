use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Message shown for every failure that means the server could not be reached.
pub const UNREACHABLE_MESSAGE: &str = "Unable to connect to the server";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// No network path, refused connection, or connection dropped mid-transfer.
    Unreachable,
    Timeout,
    InvalidRequest,
    Cancelled,
    Unknown,
}

impl ErrorKind {
    /// Whether a caller may reasonably retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Unreachable | ErrorKind::Timeout)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unreachable => "unreachable",
            ErrorKind::Timeout => "timeout",
            ErrorKind::InvalidRequest => "invalid request",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct UploadError {
    kind: ErrorKind,
    message: String,
}

impl UploadError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unreachable(detail: impl Display) -> Self {
        Self::new(
            ErrorKind::Unreachable,
            format!("{UNREACHABLE_MESSAGE}: {detail}"),
        )
    }

    pub fn timeout(detail: impl Display) -> Self {
        Self::new(ErrorKind::Timeout, detail.to_string())
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "upload cancelled")
    }

    pub fn unknown(detail: impl Display) -> Self {
        Self::new(ErrorKind::Unknown, detail.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl From<Box<dyn std::error::Error + Sync + Send>> for UploadError {
    fn from(value: Box<dyn std::error::Error + Sync + Send>) -> Self {
        Self::unknown(value)
    }
}

pub type Result<T> = core::result::Result<T, UploadError>;
