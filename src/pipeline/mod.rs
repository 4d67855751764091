//! The running agent: poll task, hand-off channel and upload task.
//!
//! [`Agent::run`] spawns the [`Uploader`] (only when a license key is set)
//! and drives the [`Scheduler`] on the calling task until shutdown.

pub mod publisher;
pub mod scheduler;

// Re-export commonly used items
pub use publisher::Publisher;
pub use scheduler::{Scheduler, SchedulerState, SchedulerStats};

use crate::config::AgentConfig;
use crate::error::Result;
use crate::metrics::{HttpStatusSource, StatusSource};
use crate::upload::{HttpMetricsSink, MetricsSink, Uploader};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// A configured agent, ready to run.
pub struct Agent<S> {
    config: AgentConfig,
    source: S,
    sink: Arc<dyn MetricsSink>,
}

impl Agent<HttpStatusSource> {
    /// Build an agent that talks HTTP on both ends.
    pub fn from_config(config: AgentConfig) -> Result<Self> {
        config.validate()?;
        let source = HttpStatusSource::new(config.stats_url.clone(), config.fetch_timeout)?;
        let sink = Arc::new(HttpMetricsSink::new(config.upload.timeout)?);
        Ok(Self::new(config, source, sink))
    }
}

impl<S: StatusSource> Agent<S> {
    pub fn new(config: AgentConfig, source: S, sink: Arc<dyn MetricsSink>) -> Self {
        Self {
            config,
            source,
            sink,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run until `shutdown` is set.
    ///
    /// The upload task is detached and not waited for; a snapshot still in
    /// the channel when the poll loop stops is lost.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<SchedulerStats> {
        let (publisher, rx) = Publisher::channel(self.config.publish_timeout);

        // Without an uploader the receiver is kept alive but never drained.
        let _undrained = if self.config.upload.is_enabled() {
            let uploader = Uploader::new(
                self.config.upload.clone(),
                self.config.poll_interval,
                self.sink,
            )?;
            tokio::spawn(uploader.run(rx));
            None
        } else {
            warn!("No license key configured, metrics will not be uploaded");
            Some(rx)
        };

        let mut scheduler = Scheduler::new(
            self.source,
            publisher,
            self.config.poll_interval,
            self.config.backoff,
        );

        info!("Agent started");
        let stats = scheduler.run(shutdown).await;
        info!("Agent stopped");

        Ok(stats)
    }
}
