//! # nginx New Relic agent
//!
//! Polls the nginx `stub_status` page on a fixed interval, derives
//! connection rates and gauges from the counters it reports, and uploads them
//! to the New Relic platform API.
//!
//! ## Pipeline
//!
//! - **Fetch + parse**: [`metrics::HttpStatusSource`] and [`metrics::parse_status`]
//! - **Derive**: [`metrics::MetricDeriver`] turns absolute counters into rates
//! - **Hand-off**: [`pipeline::Publisher`] drops a snapshot rather than block polling
//! - **Upload**: [`upload::Uploader`] posts one envelope per snapshot
//! - **Schedule**: [`pipeline::Scheduler`] ties it together with backoff and shutdown
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nginx_nr_agent::{Agent, AgentConfig, UploadConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let upload = UploadConfig::new("frontend", std::env::var("LICENSE_KEY").ok());
//!     let config = AgentConfig::new("http://127.0.0.1/nginx_status", upload);
//!
//!     let (_stop, shutdown) = tokio::sync::watch::channel(false);
//!     Agent::from_config(config)?.run(shutdown).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod upload;

// Re-export public API
pub use config::AgentConfig;
pub use error::{AgentError, Result, UploadError};
pub use metrics::{
    data::{MetricSnapshot, RawReading},
    deriver::{DerivationState, MetricDeriver},
    parser::parse_status,
    traits::StatusSource,
    HttpStatusSource,
};
pub use pipeline::{Agent, Publisher, Scheduler, SchedulerState, SchedulerStats};
pub use upload::{HttpMetricsSink, MetricsSink, UploadConfig, UploadEnvelope, Uploader};

/// Product token sent in the `User-Agent` header
pub const AGENT_NAME: &str = "newrelic-nginx-agent";

/// Version reported in the envelope and `User-Agent`
pub const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Plugin GUID the metrics are filed under
pub const AGENT_GUID: &str = "com.nginx.newrelic-agent";

/// Default New Relic platform metrics endpoint
pub const DEFAULT_API_URL: &str = "https://platform-api.newrelic.com/platform/v1/metrics";

/// Default location of the stub_status page
pub const DEFAULT_STATS_URL: &str = "http://127.0.0.1/nginx_status";

/// Default component name
pub const DEFAULT_APP_NAME: &str = "nginx";

/// New Relic expects one report per minute
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Pause after a failed poll
pub const DEFAULT_BACKOFF_SECS: u64 = 5;

/// Timeout for each HTTP request, fetch or upload
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 3;

/// Longest a poll waits on the upload queue
pub const DEFAULT_PUBLISH_TIMEOUT_MS: u64 = 1000;
