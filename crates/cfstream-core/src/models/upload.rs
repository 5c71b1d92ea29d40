use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Caller-supplied settings for a new upload. Copied into outgoing requests, never mutated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadOptions {
    pub name: Option<String>,
    pub metadata: Map<String, JsonValue>,
    pub require_signed_urls: bool,
}

impl UploadOptions {
    pub fn named(name: impl Into<String>) -> Self {
        UploadOptions {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Non-empty display name, if any.
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }

    /// `meta` object sent to the API: the arbitrary metadata plus `name`.
    pub fn meta(&self) -> Map<String, JsonValue> {
        let mut meta = self.metadata.clone();
        if let Some(name) = self.display_name() {
            meta.insert("name".to_string(), JsonValue::String(name.to_string()));
        }
        meta
    }
}

/// Point-in-time report of an upload, `bytes_sent` never decreases within one upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadProgress {
    pub bytes_sent: u64,
    pub bytes_total: u64,
}

impl UploadProgress {
    pub fn new(bytes_sent: u64, bytes_total: u64) -> Self {
        UploadProgress {
            bytes_sent,
            bytes_total,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.bytes_sent >= self.bytes_total
    }

    /// Completed fraction in `0.0..=1.0`; an empty total counts as done.
    pub fn fraction(&self) -> f64 {
        if self.bytes_total == 0 {
            return 1.0;
        }
        (self.bytes_sent as f64 / self.bytes_total as f64).min(1.0)
    }
}

/// One resumable upload attempt, as issued by the server at session open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    pub video_id: String,
    pub upload_url: String,
}

/// Body of a direct-upload URL request
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectUploadOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_duration_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(rename = "requireSignedURLs", skip_serializing_if = "std::ops::Not::not")]
    pub require_signed_urls: bool,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, JsonValue>,
}

/// A one-time upload URL and the identifier of the video it will create
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DirectUpload {
    pub uid: String,
    #[serde(rename = "uploadURL")]
    pub upload_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}
