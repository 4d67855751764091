//! Turns successive raw readings into per-interval metrics.

use crate::metrics::data::{MetricSnapshot, RawReading};
use std::time::Duration;

/// Running state carried from one poll to the next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivationState {
    /// Last absolute `accepts` counter seen. `None` until the first reading.
    pub last_accepts_total: Option<i64>,
    /// Value reported as `dropped` on the previous poll.
    pub last_dropped: i64,
}

/// Stateful converter from [`RawReading`] to [`MetricSnapshot`].
///
/// Owned by the poll loop; nothing else reads or writes the state.
#[derive(Debug)]
pub struct MetricDeriver {
    interval_secs: i64,
    state: DerivationState,
}

impl MetricDeriver {
    /// Create a deriver for the given poll interval.
    ///
    /// Intervals below one second are treated as one second.
    pub fn new(poll_interval: Duration) -> Self {
        let interval_secs = i64::try_from(poll_interval.as_secs())
            .unwrap_or(i64::MAX)
            .max(1);
        Self {
            interval_secs,
            state: DerivationState::default(),
        }
    }

    pub fn state(&self) -> &DerivationState {
        &self.state
    }

    /// Derive a snapshot from `reading` and advance the running state.
    ///
    /// `accepts` is tracked by absolute value, so an nginx restart shows up
    /// as a single negative rate and then settles again. Arithmetic saturates
    /// at the `i64` bounds.
    pub fn process_one(&mut self, reading: &RawReading) -> MetricSnapshot {
        let accepted_rate = match self.state.last_accepts_total {
            Some(last) => reading.accepts.saturating_sub(last) / self.interval_secs,
            None => 0,
        };
        self.state.last_accepts_total = Some(reading.accepts);

        let dropped = reading
            .accepts
            .saturating_sub(reading.handled)
            .saturating_sub(self.state.last_dropped);
        self.state.last_dropped = dropped;

        MetricSnapshot::new(
            accepted_rate,
            dropped,
            reading.connections,
            reading.waiting,
            reading.reading.saturating_add(reading.writing),
        )
    }
}
