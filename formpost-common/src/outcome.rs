use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::error::{ErrorKind, Result, UploadError};

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct UploadProgress {
    fraction_complete: f64,
}

impl UploadProgress {
    pub fn new(fraction_complete: f64) -> Self {
        let fraction_complete = if fraction_complete.is_nan() {
            0.0
        } else {
            fraction_complete.clamp(0.0, 1.0)
        };
        Self { fraction_complete }
    }

    pub fn from_bytes(sent: u64, total: u64) -> Self {
        if total == 0 {
            return Self::new(1.0);
        }
        Self::new(sent as f64 / total as f64)
    }

    pub fn fraction_complete(&self) -> f64 {
        self.fraction_complete
    }

    pub fn is_complete(&self) -> bool {
        self.fraction_complete >= 1.0
    }
}

/// The single terminal result of an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Any HTTP response, whatever its status code.
    Success { body: Bytes, status_code: u16 },
    Failure(UploadError),
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Success { .. })
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            UploadOutcome::Success { .. } => None,
            UploadOutcome::Failure(err) => Some(err.kind()),
        }
    }

    pub fn into_result(self) -> Result<(u16, Bytes)> {
        match self {
            UploadOutcome::Success { body, status_code } => Ok((status_code, body)),
            UploadOutcome::Failure(err) => Err(err),
        }
    }

    /// Decodes a success body as JSON. Decoding errors are reported as `Unknown`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        match self {
            UploadOutcome::Success { body, .. } => {
                serde_json::from_slice(body).map_err(UploadError::unknown)
            }
            UploadOutcome::Failure(err) => Err(err.clone()),
        }
    }
}

impl From<UploadError> for UploadOutcome {
    fn from(value: UploadError) -> Self {
        UploadOutcome::Failure(value)
    }
}
