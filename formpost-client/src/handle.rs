use std::{
    future::Future,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    task::{Context, Poll},
};

use formpost_common::{UploadOutcome, anyhow};
use tokio::sync::{oneshot, watch};
use tracing::debug;

pub(crate) struct Shared {
    id: u64,
    cancel: watch::Sender<bool>,
    finished: AtomicBool,
}

impl Shared {
    pub(crate) fn new(id: u64) -> Arc<Self> {
        let (cancel, _) = watch::channel(false);
        Arc::new(Self {
            id,
            cancel,
            finished: AtomicBool::new(false),
        })
    }

    pub(crate) fn finished(id: u64) -> Arc<Self> {
        let shared = Self::new(id);
        shared.finish();
        shared
    }

    pub(crate) fn finish(&self) {
        self.finished.store(true, Ordering::Release);
    }

    /// Resolves once `cancel` was requested.
    pub(crate) async fn cancelled(&self) {
        let mut rx = self.cancel.subscribe();
        // the sender lives as long as `self`, so this only returns on cancel
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Cancellation handle for one in-flight upload. Cheap to clone.
#[derive(Clone)]
pub struct UploadHandle {
    shared: Arc<Shared>,
}

impl UploadHandle {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    pub fn id(&self) -> u64 {
        self.shared.id
    }

    /// Requests the upload to stop. Idempotent, and a no-op once the upload resolved.
    pub fn cancel(&self) {
        if self.is_finished() {
            return;
        }
        if !self.shared.cancel.send_replace(true) {
            debug!("cancel requested for upload {}", self.shared.id);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.shared.finished.load(Ordering::Acquire)
    }
}

enum State {
    Waiting(oneshot::Receiver<UploadOutcome>),
    Done(UploadOutcome),
}

/// The eventual outcome of an upload; resolves exactly once.
///
/// Dropping it does not stop the transfer, use [`UploadHandle::cancel`].
pub struct PendingUpload {
    state: State,
}

impl PendingUpload {
    pub(crate) fn waiting(rx: oneshot::Receiver<UploadOutcome>) -> Self {
        Self {
            state: State::Waiting(rx),
        }
    }

    pub(crate) fn ready(outcome: UploadOutcome) -> Self {
        Self {
            state: State::Done(outcome),
        }
    }
}

impl Future for PendingUpload {
    type Output = UploadOutcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match &mut this.state {
            State::Done(outcome) => Poll::Ready(outcome.clone()),
            State::Waiting(rx) => {
                let outcome = match Pin::new(rx).poll(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(Ok(outcome)) => outcome,
                    Poll::Ready(Err(_)) => {
                        UploadOutcome::Failure(anyhow!("upload task ended without an outcome"))
                    }
                };
                this.state = State::Done(outcome.clone());
                Poll::Ready(outcome)
            }
        }
    }
}
