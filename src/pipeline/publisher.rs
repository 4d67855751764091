//! Bounded hand-off from the poll loop to the upload loop.

use crate::error::{AgentError, Result};
use crate::metrics::MetricSnapshot;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::SendTimeoutError};
use tracing::warn;

/// Snapshots that can wait in the channel.
pub const CHANNEL_CAPACITY: usize = 1;

/// Sending half of the snapshot channel.
///
/// A publish waits at most `timeout` for room; after that the snapshot is
/// dropped. Losing one interval is preferred over stalling the poll loop.
#[derive(Debug, Clone)]
pub struct Publisher {
    tx: mpsc::Sender<MetricSnapshot>,
    timeout: Duration,
}

impl Publisher {
    pub fn new(tx: mpsc::Sender<MetricSnapshot>, timeout: Duration) -> Self {
        Self { tx, timeout }
    }

    /// Create a publisher together with the receiver the uploader drains.
    pub fn channel(timeout: Duration) -> (Self, mpsc::Receiver<MetricSnapshot>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        (Self::new(tx, timeout), rx)
    }

    /// Hand `snapshot` to the consumer or drop it.
    pub async fn publish(&self, snapshot: MetricSnapshot) -> Result<()> {
        match self.tx.send_timeout(snapshot, self.timeout).await {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => {
                warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Upload queue is full, dropping snapshot"
                );
                Err(AgentError::PublishTimeout(self.timeout))
            }
            Err(SendTimeoutError::Closed(_)) => {
                warn!("Upload queue is closed, dropping snapshot");
                Err(AgentError::PublishClosed)
            }
        }
    }
}
