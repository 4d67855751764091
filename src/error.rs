//! Error handling for the nginx New Relic agent.

use std::time::Duration;

/// A specialized `Result` type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;

/// The main error type for the poll/derive/upload pipeline.
///
/// None of these are fatal once the agent is running: the scheduler and the
/// uploader log them and carry on with the next interval.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The status endpoint could not be reached or answered with a non-200.
    #[error("Unable to fetch stats from nginx: {0}")]
    Fetch(String),

    /// The status text did not have the expected stub_status shape.
    #[error("Failed to parse stub status: {0}")]
    Parse(String),

    /// Nobody took the snapshot off the hand-off channel in time.
    #[error("Publish timed out after {0:?}, snapshot dropped")]
    PublishTimeout(Duration),

    /// The upload side of the hand-off channel is gone.
    #[error("Upload channel closed, snapshot dropped")]
    PublishClosed,

    /// Upload to the metrics API failed
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// Envelope serialization failed
    #[error("Unable to encode upload: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failure of a single POST to the metrics API.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The API answered with a status outside 2xx.
    #[error("Got invalid response from New Relic ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// The request never produced a response.
    #[error("Failed to upload to New Relic: {0}")]
    Transport(String),
}

impl AgentError {
    /// Create a new fetch error
    pub fn fetch_error(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Create a new parse error
    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
