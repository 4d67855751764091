//! Metrics API upload configuration.

use std::fmt;
use std::time::Duration;

/// Configuration for talking to the New Relic platform API.
#[derive(Clone)]
pub struct UploadConfig {
    /// Component name shown in the New Relic UI
    pub app_name: String,
    /// Metrics ingestion endpoint
    pub api_url: String,
    /// License key sent as `X-License-Key`; uploads are disabled without one
    pub license_key: Option<String>,
    /// Timeout for a single POST
    pub timeout: Duration,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            app_name: crate::DEFAULT_APP_NAME.to_string(),
            api_url: crate::DEFAULT_API_URL.to_string(),
            license_key: None,
            timeout: Duration::from_secs(crate::DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl UploadConfig {
    /// Create a new upload configuration for the given app name and key.
    pub fn new(app_name: impl Into<String>, license_key: Option<String>) -> Self {
        Self {
            app_name: app_name.into(),
            ..Default::default()
        }
        .with_license_key(license_key)
    }

    /// Set the metrics API URL.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Set the license key.
    pub fn with_license_key(mut self, license_key: Option<String>) -> Self {
        self.license_key = license_key.filter(|key| !key.trim().is_empty());
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether a license key is configured, i.e. whether uploads happen at all.
    pub fn is_enabled(&self) -> bool {
        self.license_key.is_some()
    }

    /// License key with everything but the last four characters hidden.
    pub fn masked_license_key(&self) -> String {
        match &self.license_key {
            None => "<unset>".to_string(),
            Some(key) => {
                let chars: Vec<char> = key.chars().collect();
                let visible = chars.len().saturating_sub(4);
                let tail: String = chars[visible..].iter().collect();
                format!("{}{}", "*".repeat(visible), tail)
            }
        }
    }
}

impl fmt::Debug for UploadConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadConfig")
            .field("app_name", &self.app_name)
            .field("api_url", &self.api_url)
            .field("license_key", &self.masked_license_key())
            .field("timeout", &self.timeout)
            .finish()
    }
}
