//! Local file access for uploads: the source file and its chunked reader.

use bytes::{Bytes, BytesMut};
use cfstream_core::{ApiError, ApiResult};
use futures::Stream;
use std::io::{self, SeekFrom};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// An open local file plus its length, exclusively owned by one upload
#[derive(Debug)]
pub struct UploadSource {
    file: File,
    len: u64,
    file_name: String,
}

impl UploadSource {
    pub async fn open(path: &Path) -> ApiResult<Self> {
        if path.as_os_str().is_empty() {
            return Err(ApiError::InvalidInput(
                "file path cannot be empty".to_string(),
            ));
        }

        let file = File::open(path).await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => {
                ApiError::InvalidInput(format!("file not found: {}", path.display()))
            }
            _ => ApiError::Io(e),
        })?;

        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(ApiError::InvalidInput(format!(
                "not a regular file: {}",
                path.display()
            )));
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());

        Ok(UploadSource {
            file,
            len: metadata.len(),
            file_name,
        })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Hand the file over to a reader producing `chunk_size` buffers.
    pub fn into_chunks(self, chunk_size: usize) -> ApiResult<ChunkReader> {
        ChunkReader::new(self.file, chunk_size)
    }
}

/// Forward-only reader yielding fixed-size chunks until EOF.
///
/// Every chunk is exactly `chunk_size` bytes except the last, which holds the
/// remainder. Not restartable: to start over or resume, build a new reader
/// with [`ChunkReader::open_at`].
#[derive(Debug)]
pub struct ChunkReader {
    file: File,
    chunk_size: usize,
    offset: u64,
}

impl ChunkReader {
    pub fn new(file: File, chunk_size: usize) -> ApiResult<Self> {
        if chunk_size == 0 {
            return Err(ApiError::InvalidInput(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        Ok(ChunkReader {
            file,
            chunk_size,
            offset: 0,
        })
    }

    /// Open `path` on a fresh handle positioned at `offset`.
    pub async fn open_at(path: &Path, offset: u64, chunk_size: usize) -> ApiResult<Self> {
        let mut file = File::open(path).await?;
        file.seek(SeekFrom::Start(offset)).await?;

        let mut reader = ChunkReader::new(file, chunk_size)?;
        reader.offset = offset;
        Ok(reader)
    }

    /// Bytes consumed from the file so far, including the starting offset.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Next chunk, or `None` once the file is exhausted.
    ///
    /// The buffer is sized from what is left in the file, so the final call
    /// allocates nothing.
    pub async fn next_chunk(&mut self) -> io::Result<Option<Bytes>> {
        let len = self.file.metadata().await?.len();
        let remaining = len.saturating_sub(self.offset);
        let want = usize::try_from(remaining).map_or(self.chunk_size, |r| r.min(self.chunk_size));
        if want == 0 {
            return Ok(None);
        }

        let mut buf = BytesMut::with_capacity(want);
        // the OS may hand back less than asked for; keep going until full or EOF
        while buf.len() < want {
            let n = (&mut self.file)
                .take((want - buf.len()) as u64)
                .read_buf(&mut buf)
                .await?;
            if n == 0 {
                break;
            }
        }

        if buf.is_empty() {
            return Ok(None);
        }

        self.offset += buf.len() as u64;
        Ok(Some(buf.freeze()))
    }

    pub fn into_stream(self) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        futures::stream::try_unfold(self, |mut reader| async move {
            let next = reader.next_chunk().await?;
            Ok::<_, io::Error>(next.map(|chunk| (chunk, reader)))
        })
    }
}
