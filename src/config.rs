//! Resolved agent configuration.
//!
//! Values come from the command line or `AGENT_*` environment variables (see
//! the binary); this module only holds and checks them.

use crate::error::{AgentError, Result};
use crate::upload::UploadConfig;
use reqwest::Url;
use std::time::Duration;
use tracing::info;

/// Everything the agent needs to run.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// URL of the nginx stub_status page
    pub stats_url: String,
    /// Time between polls; also the `duration` reported upstream
    pub poll_interval: Duration,
    /// Pause after a failed poll before trying again
    pub backoff: Duration,
    /// Timeout for fetching the status page
    pub fetch_timeout: Duration,
    /// Longest a poll waits for the upload queue
    pub publish_timeout: Duration,
    /// Debug-level logging, including upload bodies; selects the log level in the binary
    pub debug: bool,
    /// Metrics API settings
    pub upload: UploadConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            stats_url: crate::DEFAULT_STATS_URL.to_string(),
            poll_interval: Duration::from_secs(crate::DEFAULT_POLL_INTERVAL_SECS),
            backoff: Duration::from_secs(crate::DEFAULT_BACKOFF_SECS),
            fetch_timeout: Duration::from_secs(crate::DEFAULT_REQUEST_TIMEOUT_SECS),
            publish_timeout: Duration::from_millis(crate::DEFAULT_PUBLISH_TIMEOUT_MS),
            debug: false,
            upload: UploadConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Create a configuration polling `stats_url` with default timings.
    pub fn new(stats_url: impl Into<String>, upload: UploadConfig) -> Self {
        Self {
            stats_url: stats_url.into(),
            upload,
            ..Default::default()
        }
    }

    /// Set the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the backoff after a failed poll.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set the status fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Set how long a publish may wait for the upload queue.
    pub fn with_publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = timeout;
        self
    }

    /// Enable or disable debug output.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Check the configuration before anything is started.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval < Duration::from_secs(1) {
            return Err(AgentError::config_error(
                "poll interval must be at least one second",
            ));
        }
        if self.backoff >= self.poll_interval {
            return Err(AgentError::config_error(format!(
                "backoff ({:?}) must be shorter than the poll interval ({:?})",
                self.backoff, self.poll_interval
            )));
        }
        if self.upload.app_name.trim().is_empty() {
            return Err(AgentError::config_error("app name must not be empty"));
        }

        Url::parse(&self.stats_url)
            .map_err(|e| AgentError::config_error(format!("Invalid stats URL '{}': {}", self.stats_url, e)))?;
        Url::parse(&self.upload.api_url).map_err(|e| {
            AgentError::config_error(format!("Invalid API URL '{}': {}", self.upload.api_url, e))
        })?;

        Ok(())
    }

    /// Log the resolved settings with the license key masked.
    pub fn log_summary(&self) {
        info!("Agent configuration:");
        info!("  - Stats URL: {}", self.stats_url);
        info!("  - App name: {}", self.upload.app_name);
        info!("  - API URL: {}", self.upload.api_url);
        info!("  - License key: {}", self.upload.masked_license_key());
        info!("  - Poll interval: {}s", self.poll_interval.as_secs());
        info!("  - Backoff: {}s", self.backoff.as_secs());
        info!("  - Debug: {}", self.debug);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AgentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert!(config.backoff < config.poll_interval);
        assert!(!config.upload.is_enabled());
    }

    #[test]
    fn test_backoff_must_be_shorter_than_interval() {
        let config = AgentConfig::default()
            .with_poll_interval(Duration::from_secs(10))
            .with_backoff(Duration::from_secs(10));
        assert!(matches!(config.validate(), Err(AgentError::Config(_))));
    }

    #[test]
    fn test_rejects_zero_interval() {
        let config = AgentConfig::default()
            .with_poll_interval(Duration::ZERO)
            .with_backoff(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_urls() {
        let config = AgentConfig::new("not a url", UploadConfig::default());
        assert!(config.validate().unwrap_err().to_string().contains("stats URL"));

        let config = AgentConfig::new(
            "http://127.0.0.1/nginx_status",
            UploadConfig::default().with_api_url("::"),
        );
        assert!(config.validate().unwrap_err().to_string().contains("API URL"));
    }
}
