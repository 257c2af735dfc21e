#[macro_use]
pub mod macros;

pub mod error;
pub mod form;
pub mod multipart;
pub mod outcome;
pub mod request;

pub use error::{ErrorKind, Result, UploadError};
pub use form::FormPart;
pub use multipart::MultipartBody;
pub use outcome::{UploadOutcome, UploadProgress};
pub use request::{UploadRequest, ValidatedRequest};

/// Default per-request timeout, counted from request start.
pub const DEFAULT_TIMEOUT_MS: u64 = 90_000;
