//! Domain methods for the API client.
//!
//! Wire types come from `cfstream_core::models`; every method hands back the
//! simplified [`Video`] rather than the raw API record.

use crate::ApiClient;
use cfstream_core::models::{ListOptions, StreamVideo, UpdateOptions, UploadOptions, Video};
use cfstream_core::{ApiError, ApiResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Body of a copy-from-URL request
#[derive(Debug, Serialize)]
struct CopyRequest<'a> {
    url: &'a str,
    #[serde(rename = "requireSignedURLs")]
    require_signed_urls: bool,
    #[serde(skip_serializing_if = "Map::is_empty")]
    meta: Map<String, JsonValue>,
}

#[derive(Debug, Serialize)]
struct TokenRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

impl ApiClient {
    /// List videos matching `options`. `limit` is applied after the response arrives.
    pub async fn list_videos(&self, options: &ListOptions) -> ApiResult<Vec<Video>> {
        let videos: Vec<StreamVideo> = self.get(&self.stream_url(""), &options.to_query()).await?;

        let mut videos: Vec<Video> = videos.into_iter().map(Video::from).collect();
        if let Some(limit) = options.limit {
            videos.truncate(limit);
        }

        tracing::debug!(count = videos.len(), "Listed videos");
        Ok(videos)
    }

    /// Delete a video by ID.
    pub async fn delete_video(&self, video_id: &str) -> ApiResult<()> {
        let url = self.video_url(video_id, "")?;
        self.delete(&url).await?;

        tracing::info!(video_id = %video_id, "Video deleted");
        Ok(())
    }

    /// Apply metadata and access changes to a video.
    pub async fn update_video(&self, video_id: &str, options: &UpdateOptions) -> ApiResult<Video> {
        let url = self.video_url(video_id, "")?;
        if options.is_empty() {
            return Err(ApiError::InvalidInput("nothing to update".to_string()));
        }

        let video: StreamVideo = self.post_json(&url, options).await?;
        Ok(Video::from(video))
    }

    /// Ask the service to fetch a video from a public URL.
    pub async fn upload_from_url(&self, url: &str, options: &UploadOptions) -> ApiResult<Video> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ApiError::InvalidInput("URL cannot be empty".to_string()));
        }

        let request = CopyRequest {
            url,
            require_signed_urls: options.require_signed_urls,
            meta: options.meta(),
        };
        let video: StreamVideo = self.post_json(&self.stream_url("/copy"), &request).await?;

        tracing::info!(video_id = %video.uid, source_url = %url, "Copy from URL accepted");
        Ok(Video::from(video))
    }

    /// Signed playback token for a video that requires signed URLs.
    ///
    /// With `expires_in_secs` the token stops working that many seconds from
    /// now; otherwise the service default applies.
    pub async fn create_signed_token(
        &self,
        video_id: &str,
        expires_in_secs: Option<u64>,
    ) -> ApiResult<String> {
        let url = self.video_url(video_id, "/token")?;
        let request = TokenRequest {
            exp: expires_in_secs
                .filter(|secs| *secs > 0)
                .map(|secs| Utc::now().timestamp().saturating_add(secs as i64)),
        };

        let response: TokenResponse = self.post_json(&url, &request).await?;
        if response.token.is_empty() {
            return Err(ApiError::ProtocolViolation(
                "token response is empty".to_string(),
            ));
        }
        Ok(response.token)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use cfstream_core::models::{ListOptions, ProcessingState, UpdateOptions, UploadOptions};
    use cfstream_core::{ApiError, ErrorKind};
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_list_videos_with_filters_and_limit() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", stream_path("").as_str())
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("search".into(), "launch".into()),
                Matcher::UrlEncoded("status".into(), "ready".into()),
                Matcher::UrlEncoded("asc".into(), "true".into()),
            ]))
            .with_status(200)
            .with_body(envelope(json!([
                video_json("a", "ready"),
                video_json("b", "ready"),
                video_json("c", "ready")
            ])))
            .create_async()
            .await;

        let options = ListOptions {
            search: Some("launch".to_string()),
            status: Some(ProcessingState::Ready),
            asc: true,
            limit: Some(2),
            ..Default::default()
        };
        let videos = client_for(&server).list_videos(&options).await.unwrap();

        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].uid, "a");
        assert_eq!(videos[0].name, "clip.mp4");
        assert_eq!(videos[0].status, ProcessingState::Ready);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_video_maps_wire_record() {
        use cfstream_upload::AccountApi;

        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", stream_path("/vid1").as_str())
            .with_status(200)
            .with_body(envelope(video_json("vid1", "inprogress")))
            .create_async()
            .await;

        let video = client_for(&server).get_video("vid1").await.unwrap();
        assert_eq!(video.uid, "vid1");
        assert_eq!(video.status, ProcessingState::InProgress);
        assert_eq!(video.status_details.as_deref(), Some("100.000000% complete"));
        assert!(video.require_signed_urls);
        assert_eq!(video.size, Some(1_048_576));
    }

    #[tokio::test]
    async fn test_get_missing_video_is_not_found() {
        use cfstream_upload::AccountApi;

        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", stream_path("/gone").as_str())
            .with_status(404)
            .with_body(r#"{"success":false,"errors":[{"code":10005,"message":"Video not found"}],"result":null}"#)
            .create_async()
            .await;

        let err = client_for(&server).get_video("gone").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(ref m) if m == "Video not found"));
    }

    #[tokio::test]
    async fn test_envelope_failure_with_ok_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", stream_path("").as_str())
            .with_status(200)
            .with_body(r#"{"success":false,"errors":[{"code":10000,"message":"Authentication error"}],"result":null}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .list_videos(&ListOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Api(ref m) if m == "Authentication error"));
        assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
    }

    #[tokio::test]
    async fn test_delete_video() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", stream_path("/vid1").as_str())
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .create_async()
            .await;

        client_for(&server).delete_video("vid1").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_ids_are_rejected_without_a_request() {
        let server = mockito::Server::new_async().await;
        let client = client_for(&server);

        assert!(matches!(
            client.delete_video("").await,
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            client.create_signed_token(" ", None).await,
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            client.upload_from_url("", &UploadOptions::default()).await,
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            client.update_video("vid1", &UpdateOptions::default()).await,
            Err(ApiError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_update_video_sends_changes() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", stream_path("/vid1").as_str())
            .match_body(Matcher::Json(json!({
                "meta": { "name": "renamed" },
                "requireSignedURLs": false
            })))
            .with_status(200)
            .with_body(envelope(video_json("vid1", "ready")))
            .create_async()
            .await;

        let mut meta = serde_json::Map::new();
        meta.insert("name".to_string(), json!("renamed"));
        let video = client_for(&server)
            .update_video(
                "vid1",
                &UpdateOptions {
                    meta: Some(meta),
                    require_signed_urls: Some(false),
                },
            )
            .await
            .unwrap();

        assert_eq!(video.uid, "vid1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_from_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", stream_path("/copy").as_str())
            .match_body(Matcher::Json(json!({
                "url": "https://cdn.example.com/a.mp4",
                "requireSignedURLs": true,
                "meta": { "name": "a.mp4" }
            })))
            .with_status(200)
            .with_body(envelope(video_json("copied", "downloading")))
            .create_async()
            .await;

        let mut options = UploadOptions::named("a.mp4");
        options.require_signed_urls = true;
        let video = client_for(&server)
            .upload_from_url("https://cdn.example.com/a.mp4", &options)
            .await
            .unwrap();

        assert_eq!(video.uid, "copied");
        assert_eq!(video.status, ProcessingState::Downloading);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_signed_token_with_expiry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", stream_path("/vid1/token").as_str())
            .match_body(Matcher::Regex(r#"^\{"exp":\d+\}$"#.into()))
            .with_status(200)
            .with_body(envelope(json!({ "token": "eyJhbGciOi.signed" })))
            .create_async()
            .await;

        let token = client_for(&server)
            .create_signed_token("vid1", Some(3600))
            .await
            .unwrap();

        assert_eq!(token, "eyJhbGciOi.signed");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_signed_token_default_expiry_sends_empty_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", stream_path("/vid1/token").as_str())
            .match_body(Matcher::Json(json!({})))
            .with_status(200)
            .with_body(envelope(json!({ "token": "t" })))
            .create_async()
            .await;

        let token = client_for(&server).create_signed_token("vid1", None).await.unwrap();
        assert_eq!(token, "t");
        mock.assert_async().await;
    }
}
