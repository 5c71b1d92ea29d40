//! Account API abstraction
//!
//! The upload engine never talks HTTP itself. Everything it needs from the
//! remote service goes through [`AccountApi`], which `cfstream-api-client`
//! implements over reqwest and the engine's tests implement in memory.

use async_trait::async_trait;
use bytes::Bytes;
use cfstream_core::models::{
    DirectUpload, DirectUploadOptions, UpdateOptions, UploadOptions, UploadSession, Video,
};
use cfstream_core::ApiResult;
use futures::Stream;
use std::io;
use std::pin::Pin;
use std::sync::Arc;

/// Streaming request body, read lazily from disk
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// The `file` part of a single-shot multipart upload
pub struct FormFile {
    pub file_name: String,
    /// Exact number of bytes `body` will yield
    pub content_length: u64,
    pub body: ByteStream,
}

impl std::fmt::Debug for FormFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormFile")
            .field("file_name", &self.file_name)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Remote capabilities consumed by the upload engine
#[async_trait]
pub trait AccountApi: Send + Sync {
    /// Open a resumable session for `total_bytes`.
    ///
    /// The returned session carries the identifier taken from the response's
    /// `Location` header; see [`crate::resumable::session_from_location`].
    async fn open_upload_session(
        &self,
        total_bytes: u64,
        options: &UploadOptions,
    ) -> ApiResult<UploadSession>;

    /// Send one chunk at `offset`. Only a "no content" answer counts as success.
    async fn send_chunk(&self, session: &UploadSession, offset: u64, chunk: Bytes)
        -> ApiResult<()>;

    /// Obtain a one-time upload URL and the identifier of the video it creates.
    async fn create_direct_upload(&self, options: &DirectUploadOptions)
        -> ApiResult<DirectUpload>;

    /// POST `file` as a multipart/form-data body to a direct upload URL.
    async fn post_form(&self, upload_url: &str, file: FormFile) -> ApiResult<()>;

    /// Apply metadata or access changes to an existing video.
    async fn update_video(&self, video_id: &str, options: &UpdateOptions) -> ApiResult<Video>;

    /// Fetch the authoritative video record.
    async fn get_video(&self, video_id: &str) -> ApiResult<Video>;
}

#[async_trait]
impl<T: AccountApi + ?Sized> AccountApi for Arc<T> {
    async fn open_upload_session(
        &self,
        total_bytes: u64,
        options: &UploadOptions,
    ) -> ApiResult<UploadSession> {
        (**self).open_upload_session(total_bytes, options).await
    }

    async fn send_chunk(
        &self,
        session: &UploadSession,
        offset: u64,
        chunk: Bytes,
    ) -> ApiResult<()> {
        (**self).send_chunk(session, offset, chunk).await
    }

    async fn create_direct_upload(
        &self,
        options: &DirectUploadOptions,
    ) -> ApiResult<DirectUpload> {
        (**self).create_direct_upload(options).await
    }

    async fn post_form(&self, upload_url: &str, file: FormFile) -> ApiResult<()> {
        (**self).post_form(upload_url, file).await
    }

    async fn update_video(&self, video_id: &str, options: &UpdateOptions) -> ApiResult<Video> {
        (**self).update_video(video_id, options).await
    }

    async fn get_video(&self, video_id: &str) -> ApiResult<Video> {
        (**self).get_video(video_id).await
    }
}
