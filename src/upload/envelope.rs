//! Wire format of the New Relic platform API.

use crate::metrics::MetricSnapshot;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use sysinfo::System;

/// Body of one POST to the metrics API.
#[derive(Debug, Clone, Serialize)]
pub struct UploadEnvelope {
    pub agent: AgentIdentity,
    pub components: Vec<Component>,
}

/// Who is reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentIdentity {
    pub version: String,
    pub host: String,
    pub pid: String,
}

/// One named block of metrics.
#[derive(Debug, Clone, Serialize)]
pub struct Component {
    pub guid: String,
    /// Seconds covered by the metrics
    pub duration: u64,
    pub name: String,
    pub metrics: BTreeMap<&'static str, i64>,
}

impl AgentIdentity {
    /// Identity of the running process.
    pub fn current() -> Self {
        Self {
            version: crate::AGENT_VERSION.to_string(),
            host: System::host_name().unwrap_or_else(|| "unknown".to_string()),
            pid: std::process::id().to_string(),
        }
    }
}

impl Component {
    /// The nginx component for one snapshot.
    pub fn from_snapshot(name: &str, duration: Duration, snapshot: &MetricSnapshot) -> Self {
        Self {
            guid: crate::AGENT_GUID.to_string(),
            duration: duration.as_secs(),
            name: name.to_string(),
            metrics: snapshot.to_metric_map(),
        }
    }
}

impl UploadEnvelope {
    pub fn new(agent: AgentIdentity, components: Vec<Component>) -> Self {
        Self { agent, components }
    }
}
