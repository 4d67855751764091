//! Standing consumer that ships snapshots to the metrics API.

use crate::error::{AgentError, Result, UploadError};
use crate::metrics::MetricSnapshot;
use crate::upload::config::UploadConfig;
use crate::upload::envelope::{AgentIdentity, Component, UploadEnvelope};
use crate::upload::transport::{MetricsSink, UploadRequest};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Counters returned when the upload loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadStats {
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
}

/// Builds envelopes and posts them, one per received snapshot.
pub struct Uploader {
    config: UploadConfig,
    license_key: String,
    duration: Duration,
    identity: AgentIdentity,
    sink: Arc<dyn MetricsSink>,
}

impl Uploader {
    /// Create an uploader. Fails when no license key is configured.
    ///
    /// `duration` is the poll interval the uploaded metrics cover.
    pub fn new(config: UploadConfig, duration: Duration, sink: Arc<dyn MetricsSink>) -> Result<Self> {
        let license_key = config
            .license_key
            .clone()
            .ok_or_else(|| AgentError::config_error("no license key configured"))?;

        Ok(Self {
            config,
            license_key,
            duration,
            identity: AgentIdentity::current(),
            sink,
        })
    }

    /// Replace the reported agent identity.
    pub fn with_identity(mut self, identity: AgentIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// The envelope that would be posted for `snapshot`.
    pub fn envelope_for(&self, snapshot: &MetricSnapshot) -> UploadEnvelope {
        UploadEnvelope::new(
            self.identity.clone(),
            vec![Component::from_snapshot(
                &self.config.app_name,
                self.duration,
                snapshot,
            )],
        )
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Content-Type", "application/json".to_string()),
            ("Accept", "application/json".to_string()),
            (
                "User-Agent",
                format!("{}/{}", crate::AGENT_NAME, crate::AGENT_VERSION),
            ),
            ("X-License-Key", self.license_key.clone()),
        ]
    }

    /// Upload a single snapshot. Never retried.
    pub async fn upload_one(&self, snapshot: &MetricSnapshot) -> Result<()> {
        debug!("Uploading to New Relic");

        let body = serde_json::to_vec(&self.envelope_for(snapshot))?;
        debug!("{}", String::from_utf8_lossy(&body));

        let response = self
            .sink
            .post(UploadRequest {
                url: self.config.api_url.clone(),
                headers: self.headers(),
                body,
            })
            .await?;

        if !response.is_success() {
            return Err(UploadError::Rejected {
                status: response.status,
                body: response.body,
            }
            .into());
        }

        debug!("Successful upload to New Relic");
        Ok(())
    }

    /// Consume snapshots until the channel closes.
    ///
    /// A failed upload is logged and the loop moves on to the next snapshot.
    pub async fn run(self, mut rx: mpsc::Receiver<MetricSnapshot>) -> UploadStats {
        info!("Uploader started, posting to {}", self.config.api_url);
        let mut stats = UploadStats::default();

        while let Some(snapshot) = rx.recv().await {
            stats.attempted += 1;
            match self.upload_one(&snapshot).await {
                Ok(()) => stats.succeeded += 1,
                Err(e) => {
                    stats.failed += 1;
                    error!("{}", e);
                }
            }
        }

        info!(
            "Uploader stopped after {} uploads ({} failed)",
            stats.attempted, stats.failed
        );
        stats
    }
}
