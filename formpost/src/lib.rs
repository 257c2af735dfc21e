mod args;
pub use args::{FieldArg, FileArg, HeaderArg, LogOptions, Opts, UploadOptions};

mod errors;
pub use errors::{CliError, Result};

mod upload;
pub use upload::{build_request, run};
