//! Fixed-interval poll loop.

use crate::error::Result;
use crate::metrics::{MetricDeriver, MetricSnapshot, StatusSource};
use crate::pipeline::publisher::Publisher;
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, trace};

/// Where the poll loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Polling,
    Fetching,
    Deriving,
    BackingOff,
    Stopped,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Polling => "polling",
            Self::Fetching => "fetching",
            Self::Deriving => "deriving",
            Self::BackingOff => "backing off",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Counters kept by the poll loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Poll attempts, successful or not
    pub polls: u64,
    /// Snapshots produced by the deriver
    pub derived: u64,
    /// Snapshots accepted by the upload channel
    pub published: u64,
    /// Snapshots dropped at the hand-off
    pub dropped: u64,
    /// Failed fetches or unparsable responses
    pub failures: u64,
}

/// Drives fetch -> parse -> derive -> publish on a fixed interval.
///
/// The scheduler is the only owner of the [`MetricDeriver`], so its state
/// never needs a lock.
pub struct Scheduler<S> {
    source: S,
    deriver: MetricDeriver,
    publisher: Publisher,
    interval: Duration,
    backoff: Duration,
    state: SchedulerState,
    stats: SchedulerStats,
}

impl<S: StatusSource> Scheduler<S> {
    /// Create a scheduler. `backoff` should be shorter than `interval`.
    pub fn new(source: S, publisher: Publisher, interval: Duration, backoff: Duration) -> Self {
        Self {
            source,
            deriver: MetricDeriver::new(interval),
            publisher,
            interval,
            backoff,
            state: SchedulerState::Idle,
            stats: SchedulerStats::default(),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    pub fn deriver(&self) -> &MetricDeriver {
        &self.deriver
    }

    fn transition(&mut self, next: SchedulerState) {
        trace!("Scheduler {} -> {}", self.state, next);
        self.state = next;
    }

    /// One fetch and derivation. A failure leaves the deriver untouched.
    pub async fn poll_once(&mut self) -> Result<MetricSnapshot> {
        self.transition(SchedulerState::Fetching);
        self.stats.polls += 1;
        let reading = self.source.fetch_reading().await?;

        self.transition(SchedulerState::Deriving);
        let snapshot = self.deriver.process_one(&reading);
        self.stats.derived += 1;
        debug!(
            accepted = snapshot.accepted_rate(),
            dropped = snapshot.dropped(),
            total = snapshot.total_connections(),
            active = snapshot.active_connections(),
            idle = snapshot.idle_connections(),
            current = snapshot.current_requests(),
            "Derived nginx metrics"
        );
        Ok(snapshot)
    }

    /// Run until `shutdown` flips to `true` or its sender goes away.
    ///
    /// The first poll happens immediately. Nothing still waiting in the
    /// upload channel is flushed on the way out.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> SchedulerStats {
        info!(
            "Polling nginx every {}s (backoff {}s)",
            self.interval.as_secs(),
            self.backoff.as_secs()
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            self.transition(SchedulerState::Polling);
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }

            match self.poll_once().await {
                Ok(snapshot) => match self.publisher.publish(snapshot).await {
                    Ok(()) => self.stats.published += 1,
                    Err(_) => self.stats.dropped += 1,
                },
                Err(e) => {
                    self.stats.failures += 1;
                    error!("{}", e);

                    self.transition(SchedulerState::BackingOff);
                    tokio::select! {
                        _ = time::sleep(self.backoff) => {}
                        _ = shutdown.changed() => break,
                    }
                    ticker.reset_immediately();
                }
            }
        }

        self.transition(SchedulerState::Stopped);
        info!(
            "Poll loop stopped after {} polls ({} failed, {} dropped)",
            self.stats.polls, self.stats.failures, self.stats.dropped
        );
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    const STATUS_TEMPLATE: &str =
        "Active connections: 2\nserver accepts handled requests\n {accepts} 30 42\nReading: 0 Writing: 10 Waiting: 1";

    fn status(accepts: i64) -> String {
        STATUS_TEMPLATE.replace("{accepts}", &accepts.to_string())
    }

    /// Plays back canned results, then signals shutdown.
    struct Script {
        responses: Mutex<VecDeque<Result<String>>>,
        fetched_at: Mutex<Vec<Instant>>,
        shutdown: watch::Sender<bool>,
    }

    impl Script {
        fn new(responses: Vec<Result<String>>, shutdown: watch::Sender<bool>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                fetched_at: Mutex::new(Vec::new()),
                shutdown,
            }
        }
    }

    impl StatusSource for Script {
        async fn fetch(&self) -> Result<String> {
            self.fetched_at.lock().unwrap().push(Instant::now());
            let next = self.responses.lock().unwrap().pop_front();
            match next {
                Some(response) => response,
                None => {
                    let _ = self.shutdown.send(true);
                    Err(AgentError::fetch_error("script exhausted"))
                }
            }
        }
    }

    fn scheduler(
        responses: Vec<Result<String>>,
    ) -> (
        Scheduler<Script>,
        watch::Receiver<bool>,
        tokio::sync::mpsc::Receiver<MetricSnapshot>,
    ) {
        let (tx, rx) = watch::channel(false);
        let (publisher, snapshots) = Publisher::channel(Duration::from_secs(1));
        let scheduler = Scheduler::new(
            Script::new(responses, tx),
            publisher,
            Duration::from_secs(60),
            Duration::from_secs(5),
        );
        (scheduler, rx, snapshots)
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_state_untouched() {
        let (mut scheduler, _shutdown, _rx) = scheduler(vec![
            Ok(status(100)),
            Err(AgentError::fetch_error("connection refused")),
            Ok("502 Bad Gateway".to_string()),
            Ok(status(160)),
        ]);

        scheduler.poll_once().await.unwrap();
        let before = scheduler.deriver().state().clone();

        assert!(scheduler.poll_once().await.is_err());
        assert!(matches!(scheduler.poll_once().await, Err(AgentError::Parse(_))));
        assert_eq!(scheduler.deriver().state(), &before);

        let snapshot = scheduler.poll_once().await.unwrap();
        assert_eq!(snapshot.accepted_rate(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_on_interval_and_stops_on_shutdown() {
        let (mut scheduler, shutdown, mut rx) =
            scheduler(vec![Ok(status(100)), Ok(status(160)), Ok(status(280))]);

        let drain = tokio::spawn(async move {
            let mut rates = Vec::new();
            while let Some(snapshot) = rx.recv().await {
                rates.push(snapshot.accepted_rate());
            }
            rates
        });

        let stats = scheduler.run(shutdown).await;
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert_eq!(stats.derived, 3);
        assert_eq!(stats.published, 3);
        assert_eq!(stats.failures, 1);

        let fetched_at = scheduler.source.fetched_at.lock().unwrap().clone();
        assert_eq!(fetched_at.len(), 4);
        for pair in fetched_at.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::from_secs(60));
        }

        drop(scheduler);
        assert_eq!(drain.await.unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backs_off_then_retries_before_next_interval() {
        let (mut scheduler, shutdown, _rx) = scheduler(vec![
            Err(AgentError::fetch_error("connection refused")),
            Ok(status(100)),
        ]);

        let stats = scheduler.run(shutdown).await;
        assert_eq!(stats.failures, 2);
        assert_eq!(stats.derived, 1);

        let fetched_at = scheduler.source.fetched_at.lock().unwrap().clone();
        assert_eq!(fetched_at[1] - fetched_at[0], Duration::from_secs(5));
        assert_eq!(fetched_at[2] - fetched_at[1], Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_consumer_does_not_stall_polling() {
        let (mut scheduler, shutdown, _rx) =
            scheduler(vec![Ok(status(1)), Ok(status(2)), Ok(status(3))]);

        let stats = scheduler.run(shutdown).await;
        assert_eq!(stats.derived, 3);
        assert_eq!(stats.published, 1);
        assert_eq!(stats.dropped, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_before_start() {
        let (mut scheduler, _shutdown, _rx) = scheduler(vec![Ok(status(1))]);
        let (tx, rx) = watch::channel(true);

        let stats = scheduler.run(rx).await;
        drop(tx);
        assert_eq!(stats.polls, 0);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }
}
