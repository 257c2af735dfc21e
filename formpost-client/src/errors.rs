use std::{error::Error as StdError, io};

use formpost_common::{UploadError, invalid_request};

/// Maps a transport failure onto the small caller-facing taxonomy.
pub fn classify(err: &reqwest::Error) -> UploadError {
    let detail = error_chain(err);

    // a connect phase that timed out never reached the server
    if err.is_connect() {
        return UploadError::unreachable(detail);
    }
    if err.is_timeout() || io_kinds(err).any(|kind| kind == io::ErrorKind::TimedOut) {
        return UploadError::timeout(detail);
    }
    if is_connection_lost(err) {
        return UploadError::unreachable(detail);
    }
    if err.is_builder() {
        return invalid_request!("{detail}");
    }
    UploadError::unknown(detail)
}

fn sources<'a>(err: &'a (dyn StdError + 'static)) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    std::iter::successors(Some(err), |&err| err.source())
}

fn io_kinds(err: &reqwest::Error) -> impl Iterator<Item = io::ErrorKind> + '_ {
    sources(err).filter_map(|err| err.downcast_ref::<io::Error>().map(io::Error::kind))
}

fn is_connection_lost(err: &reqwest::Error) -> bool {
    let io_lost = io_kinds(err).any(|kind| {
        matches!(
            kind,
            io::ErrorKind::ConnectionRefused
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::NotConnected
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::UnexpectedEof
                | io::ErrorKind::AddrNotAvailable
                | io::ErrorKind::HostUnreachable
                | io::ErrorKind::NetworkUnreachable
        )
    });
    io_lost
        || sources(err).any(|err| {
            err.downcast_ref::<hyper::Error>()
                .is_some_and(|err| err.is_incomplete_message() || err.is_closed())
        })
}

/// Renders an error with all of its sources, outermost first.
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(err) = source {
        let detail = err.to_string();
        if !message.contains(&detail) {
            message.push_str(": ");
            message.push_str(&detail);
        }
        source = err.source();
    }
    message
}
