//! Progress relay between an active uploader and whoever renders progress.
//!
//! The uploader side never waits: updates go through a bounded channel with
//! `try_send`, and an update that finds the channel full is discarded. A
//! consumer that has gone away is ignored as well.

use cfstream_core::models::UploadProgress;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

/// Create a relay/receiver pair backed by a channel holding `capacity` updates.
///
/// # Panics
/// Panics if `capacity` is zero, like [`tokio::sync::mpsc::channel`].
pub fn progress_channel(capacity: usize) -> (ProgressRelay, ProgressReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        ProgressRelay {
            tx,
            last_reported: 0,
            dropped: 0,
        },
        ProgressReceiver { rx },
    )
}

/// Producer half, owned by the active uploader
#[derive(Debug)]
pub struct ProgressRelay {
    tx: mpsc::Sender<UploadProgress>,
    last_reported: u64,
    dropped: u64,
}

impl ProgressRelay {
    /// Offer an update without blocking. Returns `true` if it was queued.
    ///
    /// Updates that would move `bytes_sent` backwards are refused.
    pub fn report(&mut self, bytes_sent: u64, bytes_total: u64) -> bool {
        if bytes_sent < self.last_reported {
            tracing::trace!(
                bytes_sent,
                last_reported = self.last_reported,
                "Ignoring non-monotonic progress update"
            );
            return false;
        }
        self.last_reported = bytes_sent;

        match self.tx.try_send(UploadProgress::new(bytes_sent, bytes_total)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                tracing::trace!(bytes_sent, bytes_total, "Progress consumer busy, update dropped");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Number of updates discarded because the channel was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Consumer half; yields `None` once the relay is dropped and the queue drained
#[derive(Debug)]
pub struct ProgressReceiver {
    rx: mpsc::Receiver<UploadProgress>,
}

impl ProgressReceiver {
    pub async fn recv(&mut self) -> Option<UploadProgress> {
        self.rx.recv().await
    }

    /// Drive `on_progress` from an independent task until the upload ends.
    pub fn spawn<F>(mut self, mut on_progress: F) -> JoinHandle<()>
    where
        F: FnMut(UploadProgress) + Send + 'static,
    {
        tokio::spawn(async move {
            while let Some(progress) = self.rx.recv().await {
                on_progress(progress);
            }
        })
    }
}
