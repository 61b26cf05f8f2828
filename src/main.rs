//! CLI entry point for the live-board watcher.
//!
//! `watch` polls a station's board and re-renders it on every new snapshot;
//! `once` runs a single cycle and prints the snapshot as JSON.

use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};
use liveboard_watch::{
    config::{AggregatorConfig, DEFAULT_BASE_URL, DEFAULT_STATION},
    fetch::FeedClient,
    output::{print_json, print_pretty, render_board},
    scheduler::{Aggregator, CycleOutcome},
};
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "liveboard_watch")]
#[command(about = "Watch a railway live board and derive delay statistics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the live board and redraw it whenever a new snapshot is published
    Watch {
        #[command(flatten)]
        board: BoardArgs,

        /// Seconds between two polls
        #[arg(short = 'r', long, default_value_t = 60)]
        poll_interval: u64,
    },
    /// Run a single cycle and print the snapshot as JSON
    Once {
        #[command(flatten)]
        board: BoardArgs,
    },
}

#[derive(Args)]
struct BoardArgs {
    /// Station whose live board is polled
    #[arg(short, long, env = "LIVEBOARD_STATION", default_value = DEFAULT_STATION)]
    station: String,

    /// Case-insensitive route fragment; repeat for several
    #[arg(short = 'm', long = "route", value_name = "FRAGMENT")]
    route: Vec<String>,

    /// Forward look-ahead, in minutes
    #[arg(long, default_value_t = 120)]
    horizon_minutes: i64,

    /// Forward window of the average delay, in minutes
    #[arg(long, default_value_t = 60)]
    next_hour_minutes: i64,

    /// Backward window of the cancellation rate, in minutes
    #[arg(long, default_value_t = 180)]
    recent_minutes: i64,

    /// Per-request timeout, in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Liveboard endpoint
    #[arg(long, env = "LIVEBOARD_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,
}

/// Upper bound for any window flag: one week.
const MAX_WINDOW_MINUTES: i64 = 7 * 24 * 60;

/// Validates a window flag and converts it to a duration.
fn window_minutes(flag: &str, minutes: i64) -> Result<chrono::Duration> {
    if !(1..=MAX_WINDOW_MINUTES).contains(&minutes) {
        bail!("--{flag} must be between 1 and {MAX_WINDOW_MINUTES}, got {minutes}");
    }
    match chrono::Duration::try_minutes(minutes) {
        Some(d) => Ok(d),
        None => bail!("--{flag} is out of range: {minutes}"),
    }
}

impl BoardArgs {
    fn into_config(self) -> Result<AggregatorConfig> {
        if self.timeout_secs == 0 {
            bail!("--timeout-secs must be at least 1 second");
        }
        let mut config = AggregatorConfig::new(self.station)
            .with_horizon(window_minutes("horizon-minutes", self.horizon_minutes)?)
            .with_next_hour_window(window_minutes("next-hour-minutes", self.next_hour_minutes)?)
            .with_recent_window(window_minutes("recent-minutes", self.recent_minutes)?)
            .with_request_timeout(std::time::Duration::from_secs(self.timeout_secs))
            .with_base_url(self.base_url);
        if !self.route.is_empty() {
            config = config.with_route_substrings(&self.route);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/liveboard_watch.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("liveboard_watch.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Watch {
            board,
            poll_interval,
        } => {
            if poll_interval == 0 {
                bail!("--poll-interval must be at least 1 second");
            }
            let config = board
                .into_config()?
                .with_poll_interval(std::time::Duration::from_secs(poll_interval));
            watch(config).await?;
        }
        Commands::Once { board } => {
            let config = board.into_config()?;
            let client = FeedClient::from_config(&config)?;
            let aggregator = Aggregator::new(client, config);

            match aggregator.run_cycle().await {
                CycleOutcome::Failed(e) => return Err(e.into()),
                outcome => info!(?outcome, "Cycle finished"),
            }
            print_json(&aggregator.snapshot())?;
        }
    }

    Ok(())
}

/// Polls until Ctrl+C, printing the board after every published snapshot.
#[tracing::instrument(skip(config), fields(station = %config.station))]
async fn watch(config: AggregatorConfig) -> Result<()> {
    let client = FeedClient::from_config(&config)?;
    let aggregator = Arc::new(Aggregator::new(client, config));
    let station = aggregator.config().station.clone();
    let mut snapshots = aggregator.subscribe();

    let handle = aggregator.spawn();
    info!("Watching live board. Press Ctrl+C to stop.");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                println!("{}", render_board(&snapshot, &station));
                print_pretty(&snapshot);
            }
            signal = &mut ctrl_c => {
                if let Err(e) = signal {
                    error!(error = %e, "Failed to listen for Ctrl+C");
                }
                break;
            }
        }
    }

    handle.shutdown().await;
    info!("Stopped");
    Ok(())
}
