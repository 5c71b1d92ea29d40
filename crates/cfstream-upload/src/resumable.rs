//! Resumable session upload (tus 1.0.0 wire shape)
//!
//! A session goes `Unopened → Opened → Complete`:
//!
//! - [`ResumableUpload::open`] declares the total length and receives a
//!   session URL in the `Location` header; its last path segment is the video
//!   identifier.
//! - [`ResumableUpload::send_all`] PATCHes successive chunks with an explicit
//!   `Upload-Offset`, advancing the offset only after a 204.
//! - [`ResumableUpload::finish`] hands back the identifier once every byte is
//!   committed.
//!
//! A failed step abandons the session; there is no failed state to recover
//! from. Nothing is persisted, but a caller that kept the session and the
//! committed offset can continue with [`ResumableUpload::resume`] and a
//! reader from [`crate::chunk::ChunkReader::open_at`].

use crate::cancel::cancellable;
use crate::chunk::ChunkReader;
use crate::progress::ProgressRelay;
use crate::traits::AccountApi;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use cfstream_core::models::{UploadOptions, UploadSession};
use cfstream_core::{ApiError, ApiResult};
use std::io;
use tokio_util::sync::CancellationToken;

pub const TUS_RESUMABLE: &str = "Tus-Resumable";
pub const TUS_VERSION: &str = "1.0.0";
pub const UPLOAD_LENGTH: &str = "Upload-Length";
pub const UPLOAD_OFFSET: &str = "Upload-Offset";
pub const UPLOAD_METADATA: &str = "Upload-Metadata";
pub const OFFSET_OCTET_STREAM: &str = "application/offset+octet-stream";

/// Session open succeeded
pub const SESSION_CREATED: u16 = 201;
/// Chunk accepted
pub const CHUNK_ACCEPTED: u16 = 204;

/// `Upload-Metadata` value: comma-separated `key base64(value)` pairs.
pub fn encode_upload_metadata(options: &UploadOptions) -> Option<String> {
    let mut pairs = Vec::new();
    if let Some(name) = options.display_name() {
        pairs.push(format!("name {}", BASE64.encode(name.as_bytes())));
    }
    if options.require_signed_urls {
        pairs.push("requiresignedurls".to_string());
    }

    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join(","))
    }
}

/// Build a session from the `Location` header of a session-open response.
pub fn session_from_location(location: Option<&str>) -> ApiResult<UploadSession> {
    let location = location.map(str::trim).unwrap_or_default();
    if location.is_empty() {
        return Err(ApiError::ProtocolViolation(
            "session open response is missing the Location header".to_string(),
        ));
    }

    let path = location
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');

    let video_id = path.rsplit('/').next().unwrap_or_default();
    if video_id.is_empty() || video_id.contains(':') {
        return Err(ApiError::ProtocolViolation(format!(
            "cannot extract a video ID from Location '{}'",
            location
        )));
    }

    Ok(UploadSession {
        video_id: video_id.to_string(),
        upload_url: location.to_string(),
    })
}

/// An opened resumable session and the number of bytes the server has acknowledged
#[derive(Debug)]
pub struct ResumableUpload<'a, A: ?Sized> {
    api: &'a A,
    session: UploadSession,
    offset: u64,
    total: u64,
    cancel: Option<CancellationToken>,
}

impl<'a, A> ResumableUpload<'a, A>
where
    A: AccountApi + ?Sized,
{
    /// `Unopened → Opened`
    pub async fn open(
        api: &'a A,
        total: u64,
        options: &UploadOptions,
        cancel: Option<CancellationToken>,
    ) -> ApiResult<Self> {
        let session = cancellable(cancel.as_ref(), api.open_upload_session(total, options)).await?;

        tracing::info!(
            video_id = %session.video_id,
            size_bytes = total,
            "Resumable upload session opened"
        );

        Ok(ResumableUpload {
            api,
            session,
            offset: 0,
            total,
            cancel,
        })
    }

    /// Continue a session whose first `offset` bytes the server already holds.
    pub fn resume(api: &'a A, session: UploadSession, offset: u64, total: u64) -> Self {
        ResumableUpload {
            api,
            session,
            offset,
            total,
            cancel: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn session(&self) -> &UploadSession {
        &self.session
    }

    /// Bytes acknowledged by the server so far
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// `Opened → Opened` for every chunk `reader` yields.
    ///
    /// Stops at the first rejected chunk; the offset then still points at the
    /// start of that chunk.
    pub async fn send_all(
        &mut self,
        reader: &mut ChunkReader,
        mut progress: Option<&mut ProgressRelay>,
    ) -> ApiResult<()> {
        if reader.offset() != self.offset {
            return Err(ApiError::InvalidInput(format!(
                "reader is positioned at {} but the session expects offset {}",
                reader.offset(),
                self.offset
            )));
        }

        while let Some(chunk) = reader.next_chunk().await? {
            let len = chunk.len() as u64;

            tracing::debug!(
                video_id = %self.session.video_id,
                offset = self.offset,
                chunk_bytes = len,
                "Sending chunk"
            );

            let sent = cancellable(
                self.cancel.as_ref(),
                self.api.send_chunk(&self.session, self.offset, chunk),
            )
            .await;

            if let Err(e) = sent {
                tracing::warn!(
                    video_id = %self.session.video_id,
                    committed_offset = self.offset,
                    size_bytes = self.total,
                    error = %e,
                    "Chunk upload failed, abandoning session"
                );
                return Err(e);
            }

            self.offset += len;
            if let Some(relay) = progress.as_deref_mut() {
                relay.report(self.offset, self.total);
            }
        }

        Ok(())
    }

    /// `Opened → Complete`: the identifier obtained at session open.
    pub fn finish(self) -> ApiResult<String> {
        if self.offset != self.total {
            return Err(ApiError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "file ended after {} of {} declared bytes",
                    self.offset, self.total
                ),
            )));
        }
        Ok(self.session.video_id)
    }
}
