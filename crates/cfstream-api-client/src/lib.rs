//! HTTP client for the video hosting API.
//!
//! Provides a minimal client with bearer token auth, generic GET/POST/DELETE
//! helpers that unwrap the API's `{result, success, errors}` envelope, and
//! domain methods (list, get, update, delete, copy from URL, signed tokens).
//! The client also implements the upload engine's `AccountApi`, so the CLI
//! hands it straight to `cfstream_upload::Uploader`.

pub mod api;
mod upload;

use cfstream_core::{ApiError, ApiResult, Config};
use reqwest::Client;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// One entry of the envelope's `errors` array
#[derive(Debug, Clone, Deserialize)]
pub struct EnvelopeMessage {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Response envelope shared by every JSON endpoint
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub result: Option<T>,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<EnvelopeMessage>,
}

impl<T> Envelope<T> {
    fn first_error(&self) -> Option<&str> {
        self.errors
            .iter()
            .map(|e| e.message.as_str())
            .find(|m| !m.is_empty())
    }

    /// The `result`, or an error when the API reported failure.
    pub fn into_result(self) -> ApiResult<T> {
        if !self.success {
            let message = self.first_error().unwrap_or("API request failed").to_string();
            return Err(ApiError::Api(message));
        }
        self.result
            .ok_or_else(|| ApiError::Decode("response envelope has no result".to_string()))
    }
}

pub(crate) fn network_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Network(format!("request timed out: {}", err))
    } else {
        ApiError::Network(err.to_string())
    }
}

/// Best human-readable message out of an error response body
pub(crate) fn error_message(body: &[u8]) -> String {
    if let Ok(envelope) = serde_json::from_slice::<Envelope<IgnoredAny>>(body) {
        if let Some(message) = envelope.first_error() {
            return message.to_string();
        }
    }
    let text = String::from_utf8_lossy(body).trim().to_string();
    if text.is_empty() {
        "no response body".to_string()
    } else {
        text
    }
}

/// Unwrap a JSON response: status mapping, envelope check, deserialization.
pub(crate) async fn read_envelope<T: DeserializeOwned>(response: reqwest::Response) -> ApiResult<T> {
    let status = response.status();
    let body = response.bytes().await.map_err(network_error)?;

    if !status.is_success() {
        return Err(ApiError::from_status(status.as_u16(), error_message(&body)));
    }

    let envelope: Envelope<T> = serde_json::from_slice(&body)?;
    envelope.into_result()
}

/// HTTP client for one account of the video hosting API
///
/// JSON calls are bounded by the configured timeout. Chunk and multipart
/// bodies go through a second client that only bounds connecting; they end
/// through cancellation.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    upload_client: Client,
    base_url: String,
    account_id: String,
    api_token: String,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("account_id", &self.account_id)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        account_id: impl Into<String>,
        api_token: impl Into<String>,
        timeout: Duration,
    ) -> ApiResult<Self> {
        let account_id = account_id.into();
        let api_token = api_token.into();
        if account_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("account ID cannot be empty".to_string()));
        }
        if api_token.trim().is_empty() {
            return Err(ApiError::InvalidInput("API token cannot be empty".to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to create HTTP client: {}", e)))?;
        let upload_client = Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            upload_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            account_id,
            api_token,
        })
    }

    pub fn from_config(config: &Config) -> ApiResult<Self> {
        Self::new(
            config.api_url.as_str(),
            config.account_id.as_str(),
            config.api_token.as_str(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// URL under the account's stream collection, e.g. `stream_url("/copy")`.
    pub fn stream_url(&self, path: &str) -> String {
        self.build_url(&format!(
            "/accounts/{}/stream{}",
            urlencoding::encode(&self.account_id),
            path
        ))
    }

    /// `stream_url` for a single video; rejects an empty ID.
    pub(crate) fn video_url(&self, video_id: &str, suffix: &str) -> ApiResult<String> {
        let video_id = video_id.trim();
        if video_id.is_empty() {
            return Err(ApiError::InvalidInput("video ID cannot be empty".to_string()));
        }
        Ok(self.stream_url(&format!("/{}{}", urlencoding::encode(video_id), suffix)))
    }

    pub(crate) fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.bearer_auth(&self.api_token)
    }

    /// GET request with optional query parameters. Unwraps the envelope.
    pub async fn get<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> ApiResult<T> {
        let mut request = self.apply_auth(self.client.get(url));
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await.map_err(network_error)?;
        read_envelope(response).await
    }

    /// POST a JSON body. Unwraps the envelope.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> ApiResult<T> {
        let request = self.apply_auth(self.client.post(url).json(body));

        let response = request.send().await.map_err(network_error)?;
        read_envelope(response).await
    }

    /// DELETE request. Any 2xx counts as success; the body is ignored.
    pub async fn delete(&self, url: &str) -> ApiResult<()> {
        let request = self.apply_auth(self.client.delete(url));

        let response = request.send().await.map_err(network_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.map_err(network_error)?;
            return Err(ApiError::from_status(status.as_u16(), error_message(&body)));
        }
        Ok(())
    }

    /// Raw client for custom requests. Caller must apply auth.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Client for request bodies of unbounded duration (chunks, multipart files)
    pub(crate) fn upload_client(&self) -> &Client {
        &self.upload_client
    }
}
