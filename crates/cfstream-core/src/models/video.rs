use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Processing state reported by the video service
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingState {
    PendingUpload,
    Downloading,
    Queued,
    InProgress,
    Ready,
    Error,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ProcessingState {
    /// `true` once the service will not change the state on its own.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessingState::Ready | ProcessingState::Error)
    }
}

impl Display for ProcessingState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ProcessingState::PendingUpload => write!(f, "pendingupload"),
            ProcessingState::Downloading => write!(f, "downloading"),
            ProcessingState::Queued => write!(f, "queued"),
            ProcessingState::InProgress => write!(f, "inprogress"),
            ProcessingState::Ready => write!(f, "ready"),
            ProcessingState::Error => write!(f, "error"),
            ProcessingState::Unknown => write!(f, "unknown"),
        }
    }
}

/// `status` object of a video as returned by the API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStatus {
    #[serde(default)]
    pub state: ProcessingState,
    #[serde(default)]
    pub pct_complete: Option<String>,
    #[serde(default)]
    pub error_reason_code: Option<String>,
    #[serde(default)]
    pub error_reason_text: Option<String>,
}

/// Video record exactly as the API returns it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamVideo {
    pub uid: String,
    #[serde(default)]
    pub status: StreamStatus,
    #[serde(default)]
    pub meta: Option<JsonValue>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ready_to_stream: bool,
    #[serde(default, rename = "requireSignedURLs")]
    pub require_signed_urls: bool,
    #[serde(default)]
    pub preview: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub creator: Option<String>,
}

/// Simplified video record handed back to callers and printed by the CLI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Video {
    pub uid: String,
    pub name: String,
    pub status: ProcessingState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_details: Option<String>,
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub ready_to_stream: bool,
    pub require_signed_urls: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, JsonValue>,
}

impl From<StreamVideo> for Video {
    fn from(video: StreamVideo) -> Self {
        let status_details = match (
            video.status.error_reason_text.as_deref(),
            video.status.pct_complete.as_deref(),
        ) {
            (Some(reason), _) if !reason.is_empty() => Some(reason.to_string()),
            (_, Some(pct)) if !pct.is_empty() => Some(format!("{}% complete", pct)),
            _ => None,
        };

        let meta = match video.meta {
            Some(JsonValue::Object(map)) => map,
            _ => Map::new(),
        };

        let name = meta
            .get("name")
            .and_then(JsonValue::as_str)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| video.uid.clone());

        Video {
            uid: video.uid,
            name,
            status: video.status.state,
            status_details,
            duration: video.duration,
            size: video.size,
            created: video.created,
            modified: video.modified,
            ready_to_stream: video.ready_to_stream,
            require_signed_urls: video.require_signed_urls,
            preview: video.preview.filter(|p| !p.is_empty()),
            thumbnail: video.thumbnail.filter(|t| !t.is_empty()),
            creator: video.creator.filter(|c| !c.is_empty()),
            meta,
        }
    }
}

/// Filters for listing videos
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub search: Option<String>,
    pub creator: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub status: Option<ProcessingState>,
    pub asc: bool,
    /// Applied client-side after the API responds
    pub limit: Option<usize>,
}

impl ListOptions {
    /// Query string pairs for the list endpoint.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            query.push(("search", search.to_string()));
        }
        if let Some(creator) = self.creator.as_deref().filter(|c| !c.is_empty()) {
            query.push(("creator", creator.to_string()));
        }
        if let Some(start) = self.start {
            query.push(("start", start.to_rfc3339()));
        }
        if let Some(end) = self.end {
            query.push(("end", end.to_rfc3339()));
        }
        if let Some(status) = self.status {
            query.push(("status", status.to_string()));
        }
        if self.asc {
            query.push(("asc", "true".to_string()));
        }
        query
    }
}

/// Changes to apply to an existing video
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, JsonValue>>,
    #[serde(rename = "requireSignedURLs", skip_serializing_if = "Option::is_none")]
    pub require_signed_urls: Option<bool>,
}

impl UpdateOptions {
    pub fn is_empty(&self) -> bool {
        self.meta.is_none() && self.require_signed_urls.is_none()
    }
}
