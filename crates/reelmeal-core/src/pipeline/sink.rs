//! Where progress goes while a run is in flight.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::progress::ProgressState;
use crate::recipe::RecipeSummary;

/// One message to the caller.
///
/// Serialized untagged, so each variant is exactly the JSON object a
/// streaming client receives.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Frame {
    Progress { progress: ProgressState },
    Recipe(RecipeSummary),
    Error { error: String, progress: ProgressState },
}

#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn send(&self, frame: Frame);

    /// No frames follow. Idempotent.
    async fn close(&self);
}

/// Discards everything. Used for synchronous requests, where only the final
/// outcome matters.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl ProgressSink for NullSink {
    async fn send(&self, _frame: Frame) {}

    async fn close(&self) {}
}

/// Forwards frames to a bounded channel.
///
/// Once the receiver is gone (client disconnected) further frames are dropped
/// silently and the run carries on.
#[derive(Debug)]
pub struct ChannelSink {
    tx: Mutex<Option<mpsc::Sender<Frame>>>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                tx: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    fn sender(&self) -> Option<mpsc::Sender<Frame>> {
        self.tx.lock().ok().and_then(|tx| tx.clone())
    }

    fn detach(&self) {
        if let Ok(mut tx) = self.tx.lock() {
            tx.take();
        }
    }
}

#[async_trait]
impl ProgressSink for ChannelSink {
    async fn send(&self, frame: Frame) {
        let Some(tx) = self.sender() else {
            return;
        };
        if tx.send(frame).await.is_err() {
            tracing::debug!("progress receiver dropped, discarding further frames");
            self.detach();
        }
    }

    async fn close(&self) {
        self.detach();
    }
}
