use std::{
    convert::Infallible,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use bytes::Bytes;
use formpost_common::{
    MultipartBody, UploadError, UploadOutcome, UploadRequest, ValidatedRequest,
    multipart::DEFAULT_CHUNK_SIZE,
};
use futures::stream;
use reqwest::{
    Body,
    header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderValue},
};
use tokio::sync::oneshot;
use tracing::{Instrument, debug, info, info_span, warn};

mod errors;
pub use errors::{classify, error_chain};

mod handle;
pub use handle::{PendingUpload, UploadHandle};
use handle::Shared;

mod progress;
pub use progress::{ProgressFn, ProgressReporter};

static NEXT_UPLOAD_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub connect_timeout: Duration,
    pub pool_idle_timeout: Duration,
    /// Size of the slices the body is streamed in; also the progress granularity.
    pub chunk_size: usize,
    /// Minimum gap between two progress callbacks, except for the final one.
    pub progress_interval: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            pool_idle_timeout: Duration::from_secs(30),
            chunk_size: DEFAULT_CHUNK_SIZE,
            progress_interval: Duration::from_millis(50),
        }
    }
}

/// Posts `multipart/form-data` requests with progress reporting and cancellation.
///
/// Cloning is cheap and clones share one connection pool.
#[derive(Clone)]
pub struct UploadClient {
    inner: reqwest::Client,
    options: ClientOptions,
}

impl UploadClient {
    pub fn new() -> Result<Self, UploadError> {
        Self::with_options(ClientOptions::default())
    }

    pub fn with_options(options: ClientOptions) -> Result<Self, UploadError> {
        let inner = reqwest::Client::builder()
            .connect_timeout(options.connect_timeout)
            .pool_idle_timeout(options.pool_idle_timeout)
            .build()
            .map_err(|err| UploadError::unknown(error_chain(&err)))?;
        Ok(Self { inner, options })
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Starts an upload on the current tokio runtime.
    ///
    /// Invalid requests resolve immediately with `InvalidRequest` and no I/O.
    /// All progress callbacks happen before the outcome is delivered.
    pub fn upload(
        &self,
        request: UploadRequest,
        on_progress: Option<ProgressFn>,
    ) -> (UploadHandle, PendingUpload) {
        let id = NEXT_UPLOAD_ID.fetch_add(1, Ordering::Relaxed);

        let request = match request.validate() {
            Ok(request) => request,
            Err(err) => {
                warn!("reject upload {id}: {err}");
                return (
                    UploadHandle::new(Shared::finished(id)),
                    PendingUpload::ready(UploadOutcome::Failure(err)),
                );
            }
        };

        let shared = Shared::new(id);
        let (tx, rx) = oneshot::channel();
        let task = run_upload(
            self.inner.clone(),
            self.options.clone(),
            request,
            on_progress,
            shared.clone(),
            tx,
        );
        tokio::spawn(task.instrument(info_span!("upload", id)));

        (UploadHandle::new(shared), PendingUpload::waiting(rx))
    }

    /// Runs an upload to completion without exposing its handle.
    pub async fn upload_and_wait(
        &self,
        request: UploadRequest,
        on_progress: Option<ProgressFn>,
    ) -> UploadOutcome {
        let (_handle, pending) = self.upload(request, on_progress);
        pending.await
    }
}

async fn run_upload(
    client: reqwest::Client,
    options: ClientOptions,
    request: ValidatedRequest,
    on_progress: Option<ProgressFn>,
    shared: Arc<Shared>,
    tx: oneshot::Sender<UploadOutcome>,
) {
    let started = Instant::now();
    let body = MultipartBody::encode(&request.parts);
    debug!(
        "POST {} with {} parts, body size: {}, boundary: {}",
        request.url,
        request.parts.len(),
        body.len(),
        body.boundary()
    );

    let reporter = ProgressReporter::new(
        on_progress,
        body.len() as u64,
        options.progress_interval,
    );
    let transfer = send(&client, &request, &body, options.chunk_size, reporter.clone());

    let outcome = tokio::select! {
        biased;
        ret = transfer => match ret {
            Ok((status_code, body)) => {
                info!(
                    "upload to {} finished, status: {status_code}, response size: {}, elapsed: {:?}",
                    request.url,
                    body.len(),
                    started.elapsed()
                );
                UploadOutcome::Success { body, status_code }
            }
            Err(err) => {
                let err = classify(&err);
                warn!("upload to {} failed: {err}", request.url);
                UploadOutcome::Failure(err)
            }
        },
        _ = shared.cancelled() => {
            info!("upload to {} cancelled after {:?}", request.url, started.elapsed());
            UploadOutcome::Failure(UploadError::cancelled())
        }
    };

    reporter.finish(outcome.is_success());
    shared.finish();
    if tx.send(outcome).is_err() {
        debug!("upload outcome dropped, nobody is waiting for it");
    }
}

async fn send(
    client: &reqwest::Client,
    request: &ValidatedRequest,
    body: &MultipartBody,
    chunk_size: usize,
    reporter: ProgressReporter,
) -> Result<(u16, Bytes), reqwest::Error> {
    let chunks = stream::iter(body.chunks(chunk_size).map(move |chunk| {
        reporter.advance(chunk.len());
        Ok::<Bytes, Infallible>(chunk)
    }));

    let mut headers = request.headers.clone();
    headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
    // the boundary is plain ascii, it is always a valid header value
    if let Ok(content_type) = HeaderValue::from_str(&body.content_type()) {
        headers.insert(CONTENT_TYPE, content_type);
    }

    let response = client
        .post(request.url.clone())
        .headers(headers)
        .timeout(request.timeout)
        .body(Body::wrap_stream(chunks))
        .send()
        .await?;

    let status_code = response.status().as_u16();
    let body = response.bytes().await?;
    Ok((status_code, body))
}
