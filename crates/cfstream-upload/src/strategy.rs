//! Transport strategy selection

use cfstream_core::{ApiError, ApiResult};

pub const MIB: u64 = 1024 * 1024;

/// Files at or above this size go through a resumable session
pub const DEFAULT_RESUMABLE_THRESHOLD: u64 = 200 * MIB;
/// Bytes per PATCH in a resumable session
pub const DEFAULT_CHUNK_SIZE: usize = 50 * 1024 * 1024;
/// Read size when streaming a single-shot multipart body
pub const DEFAULT_STREAM_BUFFER_SIZE: usize = 1024 * 1024;
pub const DEFAULT_PROGRESS_CAPACITY: usize = 10;
/// 6 hours, the longest video the service accepts through a direct upload URL
pub const DEFAULT_MAX_DURATION_SECONDS: u32 = 21_600;

/// Which wire protocol carries one upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportStrategy {
    /// One multipart/form-data POST to a pre-obtained direct upload URL
    SingleShotMultipart,
    /// Session open followed by sequential PATCHes of fixed-size chunks
    ResumableSession,
}

impl TransportStrategy {
    pub fn for_size(size: u64, policy: &UploadPolicy) -> Self {
        if size >= policy.resumable_threshold {
            TransportStrategy::ResumableSession
        } else {
            TransportStrategy::SingleShotMultipart
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportStrategy::SingleShotMultipart => "single_shot_multipart",
            TransportStrategy::ResumableSession => "resumable_session",
        }
    }
}

/// Sizing knobs for the upload engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub resumable_threshold: u64,
    pub chunk_size: usize,
    pub stream_buffer_size: usize,
    pub progress_capacity: usize,
    pub max_duration_seconds: u32,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        UploadPolicy {
            resumable_threshold: DEFAULT_RESUMABLE_THRESHOLD,
            chunk_size: DEFAULT_CHUNK_SIZE,
            stream_buffer_size: DEFAULT_STREAM_BUFFER_SIZE,
            progress_capacity: DEFAULT_PROGRESS_CAPACITY,
            max_duration_seconds: DEFAULT_MAX_DURATION_SECONDS,
        }
    }
}

impl UploadPolicy {
    pub fn validate(&self) -> ApiResult<()> {
        if self.chunk_size == 0 {
            return Err(ApiError::InvalidInput(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if self.stream_buffer_size == 0 {
            return Err(ApiError::InvalidInput(
                "stream buffer size must be greater than zero".to_string(),
            ));
        }
        if self.progress_capacity == 0 {
            return Err(ApiError::InvalidInput(
                "progress capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
