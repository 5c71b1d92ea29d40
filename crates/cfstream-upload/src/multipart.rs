//! Single-shot multipart upload
//!
//! The whole file goes out as one multipart/form-data POST to a direct upload
//! URL obtained beforehand. The body is streamed from disk; a progress update
//! is emitted each time a buffer is handed to the request body.

use crate::cancel::cancellable;
use crate::chunk::UploadSource;
use crate::progress::ProgressRelay;
use crate::traits::{AccountApi, FormFile};
use cfstream_core::ApiResult;
use futures::TryStreamExt;
use tokio_util::sync::CancellationToken;

/// Multipart field carrying the video bytes
pub const FILE_FIELD: &str = "file";

/// Statuses the direct upload endpoint answers with on success
pub fn is_accepted_status(status: u16) -> bool {
    status == 200 || status == 201
}

/// Stream `source` to `upload_url` in a single request.
///
/// Atomic from the caller's point of view: either the whole file was
/// accepted or the call fails.
pub async fn upload_single_shot<A>(
    api: &A,
    upload_url: &str,
    source: UploadSource,
    buffer_size: usize,
    progress: Option<ProgressRelay>,
    cancel: Option<&CancellationToken>,
) -> ApiResult<()>
where
    A: AccountApi + ?Sized,
{
    let total = source.len();
    let file_name = source.file_name().to_string();
    let reader = source.into_chunks(buffer_size)?;

    let mut progress = progress;
    let mut written: u64 = 0;
    let body = reader.into_stream().inspect_ok(move |chunk| {
        written += chunk.len() as u64;
        if let Some(relay) = progress.as_mut() {
            relay.report(written, total);
        }
    });

    tracing::debug!(
        file_name = %file_name,
        size_bytes = total,
        "Posting multipart upload"
    );

    let form = FormFile {
        file_name,
        content_length: total,
        body: Box::pin(body),
    };

    cancellable(cancel, api.post_form(upload_url, form)).await
}
