//! Data structures for nginx status readings and derived metrics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One parsed response from the nginx stub_status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReading {
    /// Active client connections, including waiting ones
    pub connections: i64,
    /// Total accepted client connections since nginx started
    pub accepts: i64,
    /// Total handled connections since nginx started
    pub handled: i64,
    /// Total client requests since nginx started
    pub requests: i64,
    /// Connections where nginx is reading the request header
    pub reading: i64,
    /// Connections where nginx is writing the response back
    pub writing: i64,
    /// Idle keep-alive connections
    pub waiting: i64,
}

/// Derived metrics for one poll interval.
///
/// Fields are private so that `total_connections` can only ever be the sum
/// of the active and idle gauges.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSnapshot {
    taken_at: DateTime<Utc>,
    accepted_rate: i64,
    dropped: i64,
    total_connections: i64,
    active_connections: i64,
    idle_connections: i64,
    current_requests: i64,
}

impl MetricSnapshot {
    /// Build a snapshot stamped with the current time.
    pub fn new(
        accepted_rate: i64,
        dropped: i64,
        active_connections: i64,
        idle_connections: i64,
        current_requests: i64,
    ) -> Self {
        Self {
            taken_at: Utc::now(),
            accepted_rate,
            dropped,
            total_connections: active_connections.saturating_add(idle_connections),
            active_connections,
            idle_connections,
            current_requests,
        }
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// Accepted connections per second since the previous poll.
    pub fn accepted_rate(&self) -> i64 {
        self.accepted_rate
    }

    pub fn dropped(&self) -> i64 {
        self.dropped
    }

    pub fn total_connections(&self) -> i64 {
        self.total_connections
    }

    pub fn active_connections(&self) -> i64 {
        self.active_connections
    }

    pub fn idle_connections(&self) -> i64 {
        self.idle_connections
    }

    pub fn current_requests(&self) -> i64 {
        self.current_requests
    }

    /// Map every field onto its New Relic metric name.
    pub fn to_metric_map(&self) -> BTreeMap<&'static str, i64> {
        BTreeMap::from([
            (metric_names::ACCEPTED, self.accepted_rate),
            (metric_names::DROPPED, self.dropped),
            (metric_names::TOTAL, self.total_connections),
            (metric_names::ACTIVE, self.active_connections),
            (metric_names::IDLE, self.idle_connections),
            (metric_names::CURRENT, self.current_requests),
        ])
    }
}

/// Metric names as understood by the New Relic platform API.
///
/// The bracketed suffix is the unit the dashboard displays.
pub mod metric_names {
    pub const ACCEPTED: &str = "Component/Connections/Accepted[Connections/sec]";
    pub const DROPPED: &str = "Component/Connections/Dropped[Connections/sec]";
    pub const TOTAL: &str = "Component/Requests/Total[Connections]";
    pub const ACTIVE: &str = "Component/Connections/Active[Connections]";
    pub const IDLE: &str = "Component/Connections/Idle[Connections]";
    pub const CURRENT: &str = "Component/Requests/Current[Requests]";
}
