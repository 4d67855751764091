//! HTTP transport for metric uploads.

use crate::error::{AgentError, Result, UploadError};
use reqwest::Client;
use std::time::Duration;

/// A fully prepared POST.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

/// What came back from the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResponse {
    pub status: u16,
    pub body: String,
}

impl UploadResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Something that can deliver an [`UploadRequest`].
///
/// Interpreting the status code is the uploader's job; a sink only fails
/// when no response was obtained at all.
#[async_trait::async_trait]
pub trait MetricsSink: Send + Sync {
    async fn post(&self, request: UploadRequest) -> std::result::Result<UploadResponse, UploadError>;
}

/// [`MetricsSink`] backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpMetricsSink {
    client: Client,
}

impl HttpMetricsSink {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::config_error(format!("Unable to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl MetricsSink for HttpMetricsSink {
    async fn post(&self, request: UploadRequest) -> std::result::Result<UploadResponse, UploadError> {
        let mut builder = self.client.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value.as_str());
        }

        let response = builder
            .body(request.body)
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<unreadable body: {}>", e));

        Ok(UploadResponse { status, body })
    }
}
