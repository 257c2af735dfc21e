use formpost_common::UploadError;

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Upload failed, {0}")]
    Upload(#[from] UploadError),
}

pub type Result<T> = core::result::Result<T, CliError>;
