//! Delivery of derived metrics to the New Relic platform API.
//!
//! The [`Uploader`] runs as its own task, receives snapshots from the poll
//! loop and posts each one exactly once through a [`MetricsSink`].

pub mod config;
pub mod envelope;
pub mod transport;
pub mod uploader;

// Re-export commonly used items
pub use config::UploadConfig;
pub use envelope::{AgentIdentity, Component, UploadEnvelope};
pub use transport::{HttpMetricsSink, MetricsSink, UploadRequest, UploadResponse};
pub use uploader::{UploadStats, Uploader};
