//! In-memory [`AccountApi`] and temp-file helpers for engine tests

use crate::resumable::session_from_location;
use crate::traits::{AccountApi, FormFile};
use async_trait::async_trait;
use bytes::Bytes;
use cfstream_core::models::{
    DirectUpload, DirectUploadOptions, ProcessingState, UpdateOptions, UploadOptions, UploadSession,
    Video,
};
use cfstream_core::{ApiError, ApiResult};
use futures::StreamExt;
use serde_json::Map;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// File of `len` bytes with a repeating, non-zero pattern
pub fn write_temp_file(len: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8 + 1).collect();
    file.write_all(&data).unwrap();
    file.flush().unwrap();
    file
}

/// Sparse file of `len` bytes, for sizes too large to write out
pub fn sparse_temp_file(len: u64) -> NamedTempFile {
    let file = NamedTempFile::new().unwrap();
    file.as_file().set_len(len).unwrap();
    file
}

#[derive(Debug, Clone)]
pub struct RecordedForm {
    pub upload_url: String,
    pub file_name: String,
    pub content_length: u64,
    pub bytes_received: u64,
    pub buffers: Vec<usize>,
}

#[derive(Debug, Default)]
struct State {
    location: Option<String>,
    sessions_opened: Vec<u64>,
    session_metadata: Vec<UploadOptions>,
    chunks: Vec<(u64, u64)>,
    reject_chunk: Option<(usize, u16)>,
    direct_uploads: Vec<DirectUploadOptions>,
    forms: Vec<RecordedForm>,
    reject_forms: Option<u16>,
    updates: Vec<(String, UpdateOptions)>,
    fetched: Vec<String>,
}

/// Records every call and answers like a well-behaved service
#[derive(Debug, Clone)]
pub struct FakeAccountApi {
    state: Arc<Mutex<State>>,
}

impl FakeAccountApi {
    pub const SESSION_VIDEO_ID: &'static str = "tus-video-1";
    pub const DIRECT_VIDEO_ID: &'static str = "direct-video-1";

    pub fn new() -> Self {
        let state = State {
            location: Some(format!(
                "https://upload.example.com/client/v4/accounts/acc/stream/{}",
                Self::SESSION_VIDEO_ID
            )),
            ..Default::default()
        };
        FakeAccountApi {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// `Location` returned on session open; `None` omits the header
    pub fn with_location(self, location: Option<&str>) -> Self {
        self.state.lock().unwrap().location = location.map(str::to_string);
        self
    }

    /// Answer the chunk at `index` (0-based) with `status`
    pub fn reject_chunk(self, index: usize, status: u16) -> Self {
        self.state.lock().unwrap().reject_chunk = Some((index, status));
        self
    }

    pub fn reject_forms_with(self, status: u16) -> Self {
        self.state.lock().unwrap().reject_forms = Some(status);
        self
    }

    pub fn sessions_opened(&self) -> Vec<u64> {
        self.state.lock().unwrap().sessions_opened.clone()
    }

    pub fn session_metadata(&self) -> Vec<UploadOptions> {
        self.state.lock().unwrap().session_metadata.clone()
    }

    /// `(offset, length)` of every chunk received, including a rejected one
    pub fn chunks(&self) -> Vec<(u64, u64)> {
        self.state.lock().unwrap().chunks.clone()
    }

    pub fn direct_uploads(&self) -> Vec<DirectUploadOptions> {
        self.state.lock().unwrap().direct_uploads.clone()
    }

    pub fn forms(&self) -> Vec<RecordedForm> {
        self.state.lock().unwrap().forms.clone()
    }

    /// `(video_id, changes)` of every update call
    pub fn updates(&self) -> Vec<(String, UpdateOptions)> {
        self.state.lock().unwrap().updates.clone()
    }

    pub fn fetched(&self) -> Vec<String> {
        self.state.lock().unwrap().fetched.clone()
    }
}

#[async_trait]
impl AccountApi for FakeAccountApi {
    async fn open_upload_session(
        &self,
        total_bytes: u64,
        options: &UploadOptions,
    ) -> ApiResult<UploadSession> {
        let mut state = self.state.lock().unwrap();
        state.sessions_opened.push(total_bytes);
        state.session_metadata.push(options.clone());
        session_from_location(state.location.as_deref())
    }

    async fn send_chunk(
        &self,
        _session: &UploadSession,
        offset: u64,
        chunk: Bytes,
    ) -> ApiResult<()> {
        let mut state = self.state.lock().unwrap();
        let index = state.chunks.len();
        state.chunks.push((offset, chunk.len() as u64));

        match state.reject_chunk {
            Some((at, status)) if at == index => Err(ApiError::Http {
                status,
                body: "chunk rejected".to_string(),
            }),
            _ => Ok(()),
        }
    }

    async fn create_direct_upload(
        &self,
        options: &DirectUploadOptions,
    ) -> ApiResult<DirectUpload> {
        self.state
            .lock()
            .unwrap()
            .direct_uploads
            .push(options.clone());
        Ok(DirectUpload {
            uid: Self::DIRECT_VIDEO_ID.to_string(),
            upload_url: format!("https://upload.example.com/{}", Self::DIRECT_VIDEO_ID),
            expiry: None,
        })
    }

    async fn post_form(&self, upload_url: &str, file: FormFile) -> ApiResult<()> {
        let FormFile {
            file_name,
            content_length,
            mut body,
        } = file;

        let mut buffers = Vec::new();
        while let Some(buf) = body.next().await {
            buffers.push(buf?.len());
        }

        let mut state = self.state.lock().unwrap();
        state.forms.push(RecordedForm {
            upload_url: upload_url.to_string(),
            file_name,
            content_length,
            bytes_received: buffers.iter().map(|n| *n as u64).sum(),
            buffers,
        });

        match state.reject_forms {
            Some(status) => Err(ApiError::Http {
                status,
                body: "upload rejected".to_string(),
            }),
            None => Ok(()),
        }
    }

    async fn update_video(&self, video_id: &str, options: &UpdateOptions) -> ApiResult<Video> {
        self.state
            .lock()
            .unwrap()
            .updates
            .push((video_id.to_string(), options.clone()));
        Ok(fake_video(video_id))
    }

    async fn get_video(&self, video_id: &str) -> ApiResult<Video> {
        self.state.lock().unwrap().fetched.push(video_id.to_string());
        Ok(fake_video(video_id))
    }
}

fn fake_video(video_id: &str) -> Video {
    Video {
        uid: video_id.to_string(),
        name: video_id.to_string(),
        status: ProcessingState::Queued,
        status_details: None,
        duration: None,
        size: None,
        created: None,
        modified: None,
        ready_to_stream: false,
        require_signed_urls: false,
        preview: None,
        thumbnail: None,
        creator: None,
        meta: Map::new(),
    }
}
