use std::time::Duration;

use formpost_client::{ProgressFn, UploadClient};
use formpost_common::{FormPart, UploadOutcome, UploadProgress, UploadRequest};
use tracing::{error, info, warn};

use crate::{
    args::UploadOptions,
    errors::{CliError, Result},
};

/// Assembles the request described on the command line, reading files from disk.
pub async fn build_request(options: &UploadOptions) -> Result<UploadRequest> {
    let mut request = UploadRequest::new(options.url.as_str())
        .timeout(Duration::from_millis(options.timeout_ms));

    for field in options.fields.iter() {
        request = request.part(FormPart::new(&field.name, field.value.clone()));
    }

    for file in options.files.iter() {
        let mut part = FormPart::from_path(&file.name, &file.path).await?;
        if let Some(filename) = file.filename.as_deref() {
            part = part.with_filename(filename);
        }
        if let Some(content_type) = file.content_type.as_deref() {
            part = part.with_content_type(content_type)?;
        }
        request = request.part(part);
    }

    for header in options.headers.iter() {
        request = request.header(&header.name, &header.value);
    }

    if options.fields.is_empty() && options.files.is_empty() {
        return Err(CliError::InvalidArgument(
            "at least one --field or --file is required".to_string(),
        ));
    }
    Ok(request)
}

pub async fn run(options: UploadOptions) -> Result<()> {
    let request = build_request(&options).await?;
    let client = UploadClient::new()?;

    let on_progress: ProgressFn = Box::new(|progress: UploadProgress| {
        info!(
            "Uploading.... {:.0}%",
            progress.fraction_complete() * 100.0
        );
    });
    let (handle, pending) = client.upload(request, Some(on_progress));
    info!("upload {} started, url: {}", handle.id(), options.url);

    tokio::pin!(pending);
    let outcome = tokio::select! {
        outcome = &mut pending => outcome,
        ret = tokio::signal::ctrl_c() => {
            ret?;
            warn!("received ctrl-c, cancelling upload {}", handle.id());
            handle.cancel();
            pending.await
        }
    };

    match outcome {
        UploadOutcome::Success { body, status_code } => {
            info!("server responded with status {status_code}, {} bytes", body.len());
            println!("{}", String::from_utf8_lossy(&body));
            Ok(())
        }
        UploadOutcome::Failure(err) => {
            error!("upload {} failed: {err}", handle.id());
            Err(err.into())
        }
    }
}
