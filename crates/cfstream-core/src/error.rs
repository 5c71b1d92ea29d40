//! Error types module
//!
//! All failures surfaced by the API client and the upload engine are unified
//! under [`ApiError`]. Callers that only care about the broad class of a
//! failure (bad input, transport, protocol, cancellation) can use
//! [`ApiError::kind`] instead of matching every variant.

use std::io;

/// Broad classification of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller handed us something unusable (empty path, zero-length file, empty ID)
    InvalidInput,
    /// A request failed on the wire or came back with an unexpected status
    TransportFailure,
    /// The server answered, but not in the shape the protocol requires
    ProtocolViolation,
    /// The caller cancelled the operation
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Request failed with status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized: invalid API token or account ID ({0})")]
    Unauthorized(String),

    #[error("Forbidden: insufficient permissions ({0})")]
    Forbidden(String),

    #[error("Video not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded: please wait before retrying ({0})")]
    RateLimited(String),

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Failed to parse response: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Operation cancelled")]
    Cancelled,
}

/// Result type for API and upload operations
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Map a non-success HTTP status from a JSON API call onto a variant.
    ///
    /// Statuses without a dedicated variant become [`ApiError::Http`].
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 => ApiError::Unauthorized(body),
            403 => ApiError::Forbidden(body),
            404 => ApiError::NotFound(body),
            429 => ApiError::RateLimited(body),
            _ => ApiError::Http { status, body },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::InvalidInput(_) => ErrorKind::InvalidInput,
            ApiError::ProtocolViolation(_) | ApiError::Decode(_) | ApiError::Api(_) => {
                ErrorKind::ProtocolViolation
            }
            ApiError::Cancelled => ErrorKind::Cancelled,
            ApiError::Http { .. }
            | ApiError::Network(_)
            | ApiError::Unauthorized(_)
            | ApiError::Forbidden(_)
            | ApiError::NotFound(_)
            | ApiError::RateLimited(_)
            | ApiError::Io(_) => ErrorKind::TransportFailure,
        }
    }

    /// Machine-readable error code (e.g. "PROTOCOL_VIOLATION")
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::Http { .. } => "HTTP_STATUS",
            ApiError::Network(_) => "NETWORK_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::RateLimited(_) => "RATE_LIMITED",
            ApiError::ProtocolViolation(_) => "PROTOCOL_VIOLATION",
            ApiError::Api(_) => "API_ERROR",
            ApiError::Decode(_) => "DECODE_ERROR",
            ApiError::Io(_) => "IO_ERROR",
            ApiError::Cancelled => "CANCELLED",
        }
    }

    /// Whether re-running the whole operation could reasonably succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            ApiError::Network(_) | ApiError::RateLimited(_) => true,
            ApiError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Unauthorized(_) => Some(401),
            ApiError::Forbidden(_) => Some(403),
            ApiError::NotFound(_) => Some(404),
            ApiError::RateLimited(_) => Some(429),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}
