/// A shortcut to box an error.
#[macro_export]
macro_rules! anyhow {
    ($e:expr) => ({
        use std::error::Error;
        let e: Box<dyn Error + Sync + Send> = ($e).into();
        e.into()
    });
    ($f:tt, $($arg:expr),+) => ({
        anyhow!(format!($f, $($arg),+))
    });
}

/// Builds an `InvalidRequest` error from a format string.
#[macro_export]
macro_rules! invalid_request {
    ($($arg:tt)+) => {
        $crate::error::UploadError::new($crate::error::ErrorKind::InvalidRequest, format!($($arg)+))
    };
}
