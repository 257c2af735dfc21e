use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use formpost_common::UploadProgress;
use parking_lot::Mutex;

/// Callback receiving upload progress; may run on any runtime worker.
pub type ProgressFn = Box<dyn FnMut(UploadProgress) + Send + 'static>;

struct ProgressState {
    callback: Option<ProgressFn>,
    sent: u64,
    last_fraction: f64,
    last_emit: Option<Instant>,
    sealed: bool,
}

/// Turns byte counts into rate-limited, non-decreasing progress events.
///
/// Once sealed the callback is dropped, so nothing is emitted after the
/// outcome of the request has been produced.
#[derive(Clone)]
pub struct ProgressReporter {
    state: Arc<Mutex<ProgressState>>,
    total: u64,
    interval: Duration,
}

impl ProgressReporter {
    pub fn new(callback: Option<ProgressFn>, total: u64, interval: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(ProgressState {
                callback,
                sent: 0,
                last_fraction: 0.0,
                last_emit: None,
                sealed: false,
            })),
            total,
            interval,
        }
    }

    /// Records `len` more bytes handed to the transport.
    pub fn advance(&self, len: usize) {
        let mut state = self.state.lock();
        if state.sealed {
            return;
        }
        state.sent = state.sent.saturating_add(len as u64).min(self.total);

        let progress = UploadProgress::from_bytes(state.sent, self.total);
        let fraction = progress.fraction_complete();
        if fraction <= state.last_fraction {
            return;
        }
        if !progress.is_complete() {
            if let Some(last_emit) = state.last_emit {
                if last_emit.elapsed() < self.interval {
                    return;
                }
            }
        }
        emit(&mut state, progress);
    }

    /// Seals the reporter. A successful upload always ends on `1.0`.
    pub fn finish(&self, success: bool) {
        let mut state = self.state.lock();
        if state.sealed {
            return;
        }
        if success && state.last_fraction < 1.0 {
            emit(&mut state, UploadProgress::new(1.0));
        }
        state.sealed = true;
        state.callback = None;
    }

    pub fn last_fraction(&self) -> f64 {
        self.state.lock().last_fraction
    }
}

fn emit(state: &mut ProgressState, progress: UploadProgress) {
    state.last_fraction = progress.fraction_complete();
    state.last_emit = Some(Instant::now());
    if let Some(callback) = state.callback.as_mut() {
        callback(progress);
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use formpost_common::UploadProgress;
    use parking_lot::Mutex;

    use crate::progress::ProgressReporter;

    fn recorder() -> (Arc<Mutex<Vec<f64>>>, crate::ProgressFn) {
        let seen = Arc::new(Mutex::new(vec![]));
        let sink = seen.clone();
        let callback: crate::ProgressFn =
            Box::new(move |progress: UploadProgress| sink.lock().push(progress.fraction_complete()));
        (seen, callback)
    }

    #[test]
    pub fn test_every_step_without_interval() {
        let (seen, callback) = recorder();
        let reporter = ProgressReporter::new(Some(callback), 100, Duration::ZERO);
        for _ in 0..4 {
            reporter.advance(25);
        }
        reporter.finish(true);
        assert_eq!(*seen.lock(), vec![0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    pub fn test_coalesces_within_interval() {
        let (seen, callback) = recorder();
        let reporter = ProgressReporter::new(Some(callback), 1000, Duration::from_secs(3600));
        for _ in 0..10 {
            reporter.advance(100);
        }
        // first step is emitted, the rest coalesce until completion
        assert_eq!(*seen.lock(), vec![0.1, 1.0]);
    }

    #[test]
    pub fn test_final_one_on_success() {
        let (seen, callback) = recorder();
        let reporter = ProgressReporter::new(Some(callback), 1000, Duration::ZERO);
        reporter.advance(400);
        reporter.finish(true);
        assert_eq!(*seen.lock(), vec![0.4, 1.0]);
        assert_eq!(reporter.last_fraction(), 1.0);
    }

    #[test]
    pub fn test_sealed_reporter_is_silent() {
        let (seen, callback) = recorder();
        let reporter = ProgressReporter::new(Some(callback), 100, Duration::ZERO);
        reporter.advance(10);
        reporter.finish(false);
        reporter.advance(90);
        reporter.finish(true);
        assert_eq!(*seen.lock(), vec![0.1]);
    }

    #[test]
    pub fn test_overcount_is_clamped() {
        let (seen, callback) = recorder();
        let reporter = ProgressReporter::new(Some(callback), 10, Duration::ZERO);
        reporter.advance(8);
        reporter.advance(8);
        reporter.advance(8);
        assert_eq!(*seen.lock(), vec![0.8, 1.0]);
    }
}
