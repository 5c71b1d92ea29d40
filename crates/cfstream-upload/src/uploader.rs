//! Upload orchestration: open the file, pick a transport, run it, then fetch
//! the video record the service now holds.

use crate::cancel::cancellable;
use crate::chunk::UploadSource;
use crate::multipart::upload_single_shot;
use crate::progress::ProgressRelay;
use crate::resumable::ResumableUpload;
use crate::strategy::{TransportStrategy, UploadPolicy};
use crate::traits::AccountApi;
use cfstream_core::models::{DirectUploadOptions, UpdateOptions, UploadOptions, Video};
use cfstream_core::{ApiError, ApiResult};
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Uploads local files through an [`AccountApi`]
#[derive(Debug, Clone)]
pub struct Uploader<A> {
    api: A,
    policy: UploadPolicy,
    cancel: Option<CancellationToken>,
}

impl<A: AccountApi> Uploader<A> {
    pub fn new(api: A) -> Self {
        Uploader {
            api,
            policy: UploadPolicy::default(),
            cancel: None,
        }
    }

    pub fn with_policy(mut self, policy: UploadPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fail in-flight requests with [`ApiError::Cancelled`] once `token` fires.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Upload the file at `path` and return the video as the service sees it.
    ///
    /// The returned record always comes from a fresh `get_video` call, never
    /// from the upload responses.
    pub async fn upload(
        &self,
        path: impl AsRef<Path>,
        options: &UploadOptions,
        progress: Option<ProgressRelay>,
    ) -> ApiResult<Video> {
        let path = path.as_ref();
        self.policy.validate()?;

        let source = UploadSource::open(path).await?;
        if source.is_empty() {
            return Err(ApiError::InvalidInput(format!(
                "file is empty: {}",
                path.display()
            )));
        }

        let size = source.len();
        let strategy = TransportStrategy::for_size(size, &self.policy);

        tracing::info!(
            file = %path.display(),
            size_bytes = size,
            strategy = strategy.as_str(),
            "Starting upload"
        );

        let video_id = match strategy {
            TransportStrategy::SingleShotMultipart => {
                self.run_single_shot(source, options, progress).await?
            }
            TransportStrategy::ResumableSession => {
                self.run_resumable(source, options, progress).await?
            }
        };

        tracing::info!(video_id = %video_id, size_bytes = size, "Upload complete");

        cancellable(self.cancel.as_ref(), self.api.get_video(&video_id)).await
    }

    async fn run_single_shot(
        &self,
        source: UploadSource,
        options: &UploadOptions,
        progress: Option<ProgressRelay>,
    ) -> ApiResult<String> {
        let request = DirectUploadOptions {
            max_duration_seconds: Some(self.policy.max_duration_seconds),
            expiry: None,
            require_signed_urls: options.require_signed_urls,
            meta: options.meta(),
        };
        let direct = cancellable(
            self.cancel.as_ref(),
            self.api.create_direct_upload(&request),
        )
        .await?;

        tracing::debug!(video_id = %direct.uid, "Direct upload URL obtained");

        upload_single_shot(
            &self.api,
            &direct.upload_url,
            source,
            self.policy.stream_buffer_size,
            progress,
            self.cancel.as_ref(),
        )
        .await?;

        Ok(direct.uid)
    }

    async fn run_resumable(
        &self,
        source: UploadSource,
        options: &UploadOptions,
        progress: Option<ProgressRelay>,
    ) -> ApiResult<String> {
        let total = source.len();
        let mut session =
            ResumableUpload::open(&self.api, total, options, self.cancel.clone()).await?;

        let mut reader = source.into_chunks(self.policy.chunk_size)?;
        let mut progress = progress;
        session.send_all(&mut reader, progress.as_mut()).await?;
        let video_id = session.finish()?;

        // Upload-Metadata only carries the name; the rest goes on afterwards.
        if !options.metadata.is_empty() {
            let changes = UpdateOptions {
                meta: Some(options.meta()),
                require_signed_urls: None,
            };
            cancellable(
                self.cancel.as_ref(),
                self.api.update_video(&video_id, &changes),
            )
            .await?;
            tracing::debug!(video_id = %video_id, "Metadata applied");
        }

        Ok(video_id)
    }
}
