//! HTTP collection of the nginx stub_status page.

use crate::error::{AgentError, Result};
use crate::metrics::traits::StatusSource;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

/// Fetches stub_status over HTTP with a short request timeout.
#[derive(Debug, Clone)]
pub struct HttpStatusSource {
    client: Client,
    url: String,
}

impl HttpStatusSource {
    /// Create a source for `url`, giving up on any request after `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::config_error(format!("Unable to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl StatusSource for HttpStatusSource {
    async fn fetch(&self) -> Result<String> {
        debug!("Fetching stub status from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AgentError::fetch_error(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(AgentError::fetch_error(format!(
                "{} answered with {}",
                self.url, status
            )));
        }

        response
            .text()
            .await
            .map_err(|e| AgentError::fetch_error(format!("Failed to read body: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_endpoint_is_fetch_error() {
        // Port 9 (discard) on loopback is essentially never listening.
        let source =
            HttpStatusSource::new("http://127.0.0.1:9/nginx_status", Duration::from_millis(500))
                .unwrap();

        let err = source.fetch_reading().await.unwrap_err();
        assert!(matches!(err, AgentError::Fetch(_)));
    }

    #[test]
    fn test_keeps_configured_url() {
        let source = HttpStatusSource::new("http://localhost/status", Duration::from_secs(3)).unwrap();
        assert_eq!(source.url(), "http://localhost/status");
    }
}
