//! `AccountApi` over HTTP: resumable sessions, direct upload URLs, multipart posts.

use crate::{error_message, network_error, ApiClient};
use async_trait::async_trait;
use bytes::Bytes;
use cfstream_core::models::{
    DirectUpload, DirectUploadOptions, StreamVideo, UpdateOptions, UploadOptions, UploadSession,
    Video,
};
use cfstream_core::{ApiError, ApiResult};
use cfstream_upload::multipart::{is_accepted_status, FILE_FIELD};
use cfstream_upload::resumable::{
    encode_upload_metadata, session_from_location, CHUNK_ACCEPTED, OFFSET_OCTET_STREAM,
    SESSION_CREATED, TUS_RESUMABLE, TUS_VERSION, UPLOAD_LENGTH, UPLOAD_METADATA, UPLOAD_OFFSET,
};
use cfstream_upload::{AccountApi, FormFile};
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Response};

/// Drain the body of an unexpected response into an [`ApiError::Http`].
async fn unexpected_status(response: Response) -> ApiError {
    let status = response.status().as_u16();
    let body = match response.bytes().await {
        Ok(body) => error_message(&body),
        Err(e) => e.to_string(),
    };
    ApiError::Http { status, body }
}

/// `Location` of a session-open response, resolved against the request URL
fn resolved_location(response: &Response) -> Option<String> {
    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|l| !l.is_empty())?;

    Some(
        response
            .url()
            .join(location)
            .map(String::from)
            .unwrap_or_else(|_| location.to_string()),
    )
}

#[async_trait]
impl AccountApi for ApiClient {
    async fn open_upload_session(
        &self,
        total_bytes: u64,
        options: &UploadOptions,
    ) -> ApiResult<UploadSession> {
        let mut request = self
            .apply_auth(self.client().post(self.stream_url("")))
            .query(&[("direct_user", "true")])
            .header(TUS_RESUMABLE, TUS_VERSION)
            .header(UPLOAD_LENGTH, total_bytes.to_string());
        if let Some(metadata) = encode_upload_metadata(options) {
            request = request.header(UPLOAD_METADATA, metadata);
        }

        let response = request.send().await.map_err(network_error)?;
        if response.status().as_u16() != SESSION_CREATED {
            return Err(unexpected_status(response).await);
        }

        session_from_location(resolved_location(&response).as_deref())
    }

    async fn send_chunk(
        &self,
        session: &UploadSession,
        offset: u64,
        chunk: Bytes,
    ) -> ApiResult<()> {
        let request = self
            .apply_auth(self.upload_client().patch(&session.upload_url))
            .header(TUS_RESUMABLE, TUS_VERSION)
            .header(UPLOAD_OFFSET, offset.to_string())
            .header(CONTENT_TYPE, OFFSET_OCTET_STREAM)
            .body(chunk);

        let response = request.send().await.map_err(network_error)?;
        if response.status().as_u16() != CHUNK_ACCEPTED {
            return Err(unexpected_status(response).await);
        }
        Ok(())
    }

    async fn create_direct_upload(
        &self,
        options: &DirectUploadOptions,
    ) -> ApiResult<DirectUpload> {
        let direct: DirectUpload = self
            .post_json(&self.stream_url("/direct_upload"), options)
            .await?;

        if direct.uid.is_empty() || direct.upload_url.is_empty() {
            return Err(ApiError::ProtocolViolation(
                "direct upload response is missing uid or uploadURL".to_string(),
            ));
        }
        Ok(direct)
    }

    async fn post_form(&self, upload_url: &str, file: FormFile) -> ApiResult<()> {
        let FormFile {
            file_name,
            content_length,
            body,
        } = file;

        let part = Part::stream_with_length(Body::wrap_stream(body), content_length)
            .file_name(file_name);
        let form = Form::new().part(FILE_FIELD, part);

        // one-time URL, carries its own authorization
        let response = self
            .upload_client()
            .post(upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(network_error)?;

        if !is_accepted_status(response.status().as_u16()) {
            return Err(unexpected_status(response).await);
        }
        Ok(())
    }

    async fn update_video(&self, video_id: &str, options: &UpdateOptions) -> ApiResult<Video> {
        ApiClient::update_video(self, video_id, options).await
    }

    async fn get_video(&self, video_id: &str) -> ApiResult<Video> {
        let url = self.video_url(video_id, "")?;
        let video: StreamVideo = self.get(&url, &[]).await?;
        Ok(Video::from(video))
    }
}
