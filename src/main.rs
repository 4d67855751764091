//! nginx New Relic agent binary
//!
//! Reports a single nginx instance to New Relic, configured from flags or
//! `AGENT_*` environment variables.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use nginx_nr_agent::{
    metrics::MetricDeriver,
    upload::{AgentIdentity, Component},
    Agent, AgentConfig, HttpStatusSource, StatusSource, UploadConfig, UploadEnvelope,
    DEFAULT_API_URL, DEFAULT_APP_NAME, DEFAULT_BACKOFF_SECS, DEFAULT_POLL_INTERVAL_SECS,
    DEFAULT_STATS_URL,
};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "nginx_nr_agent")]
#[command(about = "Reports nginx stub_status metrics to New Relic")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Polls the nginx stub_status page and uploads connection metrics to the New Relic platform API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Component name shown in New Relic
    #[arg(long, env = "AGENT_NEW_RELIC_APP_NAME", default_value = DEFAULT_APP_NAME)]
    app_name: String,

    /// New Relic metrics API URL
    #[arg(long, env = "AGENT_NEW_RELIC_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// New Relic license key; uploads are disabled without it
    #[arg(long, env = "AGENT_NEW_RELIC_LICENSE_KEY", hide_env_values = true)]
    license_key: Option<String>,

    /// nginx stub_status URL
    #[arg(long, env = "AGENT_STATS_URL", default_value = DEFAULT_STATS_URL)]
    stats_url: String,

    /// Poll interval in seconds
    #[arg(short, long, default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    interval: u64,

    /// Seconds to wait after a failed poll
    #[arg(long, default_value_t = DEFAULT_BACKOFF_SECS)]
    backoff: u64,

    /// Enable verbose logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Enable debug logging, including upload bodies
    #[arg(short, long, env = "AGENT_DEBUG")]
    debug: bool,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "debug")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll and upload until interrupted (default)
    Run,

    /// Fetch the status page once, print what would be uploaded and exit
    Snapshot(SnapshotArgs),
}

#[derive(Args)]
struct SnapshotArgs {
    /// Output format: json or pretty
    #[arg(short, long, default_value = "pretty")]
    format: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);

    init_logging(&cli, &config)?;

    print_banner();

    config.validate().context("Invalid configuration")?;

    match &cli.command {
        Some(Commands::Snapshot(args)) => snapshot_command(&config, args).await?,
        Some(Commands::Run) | None => run_command(config).await?,
    }

    Ok(())
}

fn log_level(cli: &Cli, config: &AgentConfig) -> Level {
    if config.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else if cli.quiet {
        Level::WARN
    } else {
        Level::INFO
    }
}

fn init_logging(cli: &Cli, config: &AgentConfig) -> anyhow::Result<()> {
    let level = log_level(cli, config);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

fn print_banner() {
    info!("nginx New Relic agent v{}", env!("CARGO_PKG_VERSION"));
}

fn build_config(cli: &Cli) -> AgentConfig {
    let upload = UploadConfig::new(&cli.app_name, None)
        .with_api_url(&cli.api_url)
        .with_license_key(cli.license_key.clone());

    AgentConfig::new(&cli.stats_url, upload)
        .with_poll_interval(Duration::from_secs(cli.interval))
        .with_backoff(Duration::from_secs(cli.backoff))
        .with_debug(cli.debug)
}

async fn run_command(config: AgentConfig) -> anyhow::Result<()> {
    config.log_summary();

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown signal received, stopping");
        let _ = stop_tx.send(true);
    });

    let agent = Agent::from_config(config).context("Failed to start agent")?;
    agent.run(stop_rx).await?;

    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(_) => {
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

async fn snapshot_command(config: &AgentConfig, args: &SnapshotArgs) -> anyhow::Result<()> {
    let source = HttpStatusSource::new(config.stats_url.clone(), config.fetch_timeout)?;
    let reading = source
        .fetch_reading()
        .await
        .with_context(|| format!("Failed to read {}", config.stats_url))?;

    let snapshot = MetricDeriver::new(config.poll_interval).process_one(&reading);

    let envelope = UploadEnvelope::new(
        AgentIdentity::current(),
        vec![Component::from_snapshot(
            &config.upload.app_name,
            config.poll_interval,
            &snapshot,
        )],
    );

    match args.format.as_str() {
        "json" => {
            let json = serde_json::json!({
                "reading": reading,
                "snapshot": snapshot,
                "envelope": envelope,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        "pretty" => {
            print_pretty_snapshot(config, &reading, &snapshot);
        }
        _ => {
            anyhow::bail!("Unsupported format: {}. Use 'json' or 'pretty'", args.format);
        }
    }

    Ok(())
}

fn print_pretty_snapshot(
    config: &AgentConfig,
    reading: &nginx_nr_agent::RawReading,
    snapshot: &nginx_nr_agent::MetricSnapshot,
) {
    println!(
        "nginx status ({})",
        snapshot.taken_at().format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("  Source: {}", config.stats_url);
    println!();

    println!("Raw counters:");
    println!("  Active connections: {}", reading.connections);
    println!("  Accepts: {}", reading.accepts);
    println!("  Handled: {}", reading.handled);
    println!("  Requests: {}", reading.requests);
    println!(
        "  Reading/Writing/Waiting: {}/{}/{}",
        reading.reading, reading.writing, reading.waiting
    );
    println!();

    println!("Metrics for '{}':", config.upload.app_name);
    for (name, value) in snapshot.to_metric_map() {
        println!("  {}: {}", name, value);
    }
}
