use nginx_nr_agent::{
    error::AgentError,
    metrics::{data::metric_names, parse_status, MetricDeriver, RawReading},
    upload::{AgentIdentity, Component, UploadEnvelope},
    AgentConfig, UploadConfig, DEFAULT_API_URL,
};
use std::time::Duration;

const STATUS: &str = "Active connections: 2
server accepts handled requests
 31 30 42
Reading: 0 Writing: 10 Waiting: 1";

/// Test the documented example block end to end through the public API
#[test]
fn test_status_to_envelope() {
    let reading = parse_status(STATUS).expect("Should parse example status");
    assert_eq!(
        reading,
        RawReading {
            connections: 2,
            accepts: 31,
            handled: 30,
            requests: 42,
            reading: 0,
            writing: 10,
            waiting: 1,
        }
    );

    let mut deriver = MetricDeriver::new(Duration::from_secs(60));
    let snapshot = deriver.process_one(&reading);
    assert_eq!(snapshot.accepted_rate(), 0);
    assert_eq!(snapshot.dropped(), 1);
    assert_eq!(snapshot.current_requests(), 10);

    let envelope = UploadEnvelope::new(
        AgentIdentity::current(),
        vec![Component::from_snapshot("web", Duration::from_secs(60), &snapshot)],
    );
    let json = serde_json::to_string(&envelope).expect("Should serialize to JSON");
    assert!(json.contains(metric_names::IDLE));
    assert!(json.contains("\"duration\":60"));
    assert!(json.contains("\"name\":\"web\""));
}

/// RawReading survives JSON, as printed by `snapshot --format json`
#[test]
fn test_raw_reading_serialization() {
    let reading = parse_status(STATUS).unwrap();
    let json = serde_json::to_string_pretty(&reading).expect("Should serialize to JSON");
    assert!(json.contains("\"accepts\": 31"));

    let back: RawReading = serde_json::from_str(&json).expect("Should deserialize from JSON");
    assert_eq!(back, reading);
}

/// Snapshot invariants hold across a run of readings
#[test]
fn test_snapshot_invariants_over_many_polls() {
    let mut deriver = MetricDeriver::new(Duration::from_secs(60));

    for step in 0..50_i64 {
        let reading = RawReading {
            connections: step % 7,
            accepts: 1_000 + step * 120,
            handled: 1_000 + step * 119,
            requests: 5_000 + step * 300,
            reading: step % 3,
            writing: step % 5,
            waiting: step % 11,
        };
        let snapshot = deriver.process_one(&reading);

        assert_eq!(
            snapshot.total_connections(),
            snapshot.active_connections() + snapshot.idle_connections()
        );
        assert_eq!(snapshot.current_requests(), reading.reading + reading.writing);
        if step == 0 {
            assert_eq!(snapshot.accepted_rate(), 0);
        } else {
            assert_eq!(snapshot.accepted_rate(), 2);
        }
    }
}

/// Test configuration defaults and builder methods
#[test]
fn test_agent_config() {
    let config = AgentConfig::default();
    assert_eq!(config.upload.api_url, DEFAULT_API_URL);
    assert_eq!(config.fetch_timeout, Duration::from_secs(3));
    assert_eq!(config.publish_timeout, Duration::from_secs(1));

    let config = AgentConfig::new(
        "http://10.1.2.3:8080/status",
        UploadConfig::new("edge", Some("key-1234".to_string())),
    )
    .with_poll_interval(Duration::from_secs(30))
    .with_backoff(Duration::from_secs(3))
    .with_publish_timeout(Duration::from_millis(250))
    .with_debug(true);

    assert!(config.validate().is_ok());
    assert!(config.debug);
    assert!(config.upload.is_enabled());
    assert_eq!(config.stats_url, "http://10.1.2.3:8080/status");
}

/// Test error display messages
#[test]
fn test_error_types() {
    let errors = vec![
        AgentError::fetch_error("connection refused"),
        AgentError::parse_error("missing field 'waiting'"),
        AgentError::PublishTimeout(Duration::from_secs(1)),
        AgentError::config_error("backoff too long"),
    ];

    for error in errors {
        let message = error.to_string();
        assert!(!message.is_empty());
    }

    assert!(AgentError::fetch_error("refused")
        .to_string()
        .starts_with("Unable to fetch stats from nginx"));
}
