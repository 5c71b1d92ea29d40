//! cfstream upload engine
//!
//! Moves a local video file to the hosting service over one of two
//! transports and reports progress while doing so.
//!
//! # Transports
//!
//! - Files under 200 MiB are streamed as a single multipart/form-data POST
//!   to a one-time direct upload URL.
//! - Files of 200 MiB and more go through a resumable session: one request
//!   declares the length, then 50 MiB chunks are PATCHed in order with an
//!   explicit `Upload-Offset`.
//!
//! Either way the upload ends with a fresh fetch of the video record.
//!
//! The engine is HTTP-agnostic; the remote side is reached through
//! [`AccountApi`].

pub(crate) mod cancel;
pub mod chunk;
pub mod multipart;
pub mod progress;
pub mod resumable;
pub mod strategy;
pub mod traits;
pub mod uploader;

#[cfg(test)]
pub(crate) mod test_support;

pub use chunk::{ChunkReader, UploadSource};
pub use progress::{progress_channel, ProgressReceiver, ProgressRelay};
pub use resumable::ResumableUpload;
pub use strategy::{TransportStrategy, UploadPolicy};
pub use traits::{AccountApi, ByteStream, FormFile};
pub use uploader::Uploader;
