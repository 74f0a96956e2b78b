//! flowwatch CLI
//!
//! Harvests the money-flow allocation tooltips from the dashboard during
//! trading hours and appends them to a JSON history file.
//!
//! Usage:
//!   flowwatch                     # same as `flowwatch run`
//!   flowwatch run                 # collect every interval while the market is open
//!   flowwatch once                # one collection cycle, ignoring trading hours
//!   flowwatch history --hours 6   # print snapshots from the last 6 hours
//!   flowwatch window              # show whether collection is currently permitted
//!
//! Requires a running WebDriver endpoint (e.g. `chromedriver --port=9515`).

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDateTime, TimeDelta};
use clap::{Parser, Subcommand};
use flowwatch::calendar::{self, GateDecision};
use flowwatch::config::{self, HarvestConfig};
use flowwatch::{
    Clock, ExtractionSession, HarvestError, HistoryStore, Scheduler, SnapshotCollector,
    SystemClock, WebDriverClient,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Upper bound for `history --hours`, roughly a century.
const MAX_HISTORY_HOURS: i64 = 876_000;

#[derive(Parser, Debug)]
#[command(name = "flowwatch")]
#[command(author, version, about = "Trading-hours tooltip harvester for the dashboard money-flow chart")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Dashboard page to open
    #[arg(long, env = "FLOWWATCH_URL", default_value = config::DEFAULT_DASHBOARD_URL, global = true)]
    url: String,

    /// WebDriver endpoint (chromedriver or compatible)
    #[arg(long, env = "FLOWWATCH_WEBDRIVER_URL", default_value = config::DEFAULT_WEBDRIVER_URL, global = true)]
    webdriver_url: String,

    /// History log file (JSON list)
    #[arg(long, env = "FLOWWATCH_HISTORY_PATH", default_value = config::DEFAULT_HISTORY_PATH, global = true)]
    history_path: PathBuf,

    /// Seconds to wait between collection cycles
    #[arg(long, env = "FLOWWATCH_INTERVAL_SECS", default_value_t = 10, global = true)]
    interval_secs: u64,

    /// Show the browser window instead of running headless
    #[arg(long, global = true)]
    headed: bool,

    /// Browser window size as WIDTH,HEIGHT
    #[arg(long, env = "FLOWWATCH_WINDOW_SIZE", default_value = "1920,1080", global = true)]
    window_size: String,

    /// Verbose output
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Commands {
    /// Collect snapshots every interval while the trading window is open (default)
    Run,
    /// Collect a single snapshot now, regardless of trading hours
    Once,
    /// Print recent snapshots from the history log
    History {
        /// Look-back window in hours (1 to 876000)
        #[arg(long, default_value_t = 24, value_parser = clap::value_parser!(i64).range(1..=MAX_HISTORY_HOURS))]
        hours: i64,
    },
    /// Show the trading-window state for the current local time
    Window,
}

impl Cli {
    fn harvest_config(&self) -> Result<HarvestConfig> {
        let mut config = HarvestConfig {
            dashboard_url: self.url.clone(),
            webdriver_url: self.webdriver_url.clone(),
            history_path: self.history_path.clone(),
            interval: Duration::from_secs(self.interval_secs),
            ..HarvestConfig::default()
        };
        config.browser.headless = !self.headed;
        config.browser.window_size = config::parse_window_size(&self.window_size)
            .with_context(|| format!("Invalid --window-size '{}'", self.window_size))?;
        Ok(config)
    }
}

enum Stop {
    Failed(Result<(), HarvestError>),
    Interrupted(std::io::Result<()>),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.harvest_config()?;
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_loop(config).await,
        Commands::Once => collect_once(config).await,
        Commands::History { hours } => print_history(&config, hours),
        Commands::Window => print_window(),
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let default_filter = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

async fn open_session(config: &HarvestConfig) -> Result<ExtractionSession> {
    if !WebDriverClient::is_available(&config.webdriver_url).await {
        bail!(
            "WebDriver not reachable at {}. Start chromedriver (e.g. `chromedriver --port=9515`) or set FLOWWATCH_WEBDRIVER_URL",
            config.webdriver_url
        );
    }

    let driver = WebDriverClient::connect(&config.webdriver_url, &config.browser)
        .await
        .context("Failed to start browser session")?;

    ExtractionSession::open(
        Box::new(driver),
        &config.dashboard_url,
        &config.popup,
        &config.target,
    )
    .await
    .context("Failed to locate the chart on the dashboard")
}

async fn run_loop(config: HarvestConfig) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let session = open_session(&config).await?;
    let collector = SnapshotCollector::new(session, config.points.clone(), clock.clone());
    let store = HistoryStore::new(&config.history_path);
    let mut scheduler = Scheduler::new(clock, collector, store, config.interval);

    let stop = tokio::select! {
        result = scheduler.run() => Stop::Failed(result),
        signal = tokio::signal::ctrl_c() => Stop::Interrupted(signal),
    };

    match stop {
        Stop::Interrupted(signal) => {
            signal.context("Failed to listen for Ctrl+C")?;
            info!("Interrupted, shutting down");
            release_after_interrupt(scheduler.shutdown().await);
            Ok(())
        }
        Stop::Failed(result) => {
            let e = match result {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };
            error!(error = %e, "Collection failed, exiting");
            if let Err(release) = scheduler.shutdown().await {
                warn!(error = %release, "Failed to release browser session");
            }
            Err(anyhow::Error::new(e).context("Harvester stopped"))
        }
    }
}

async fn collect_once(config: HarvestConfig) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let session = open_session(&config).await?;
    let mut collector = SnapshotCollector::new(session, config.points.clone(), clock);

    let collected = collector.collect().await;
    let released = collector.into_session().close().await;
    let snapshot = collected.context("Collection failed")?;
    if let Err(e) = released {
        warn!(error = %e, "Failed to release browser session");
    }

    let store = HistoryStore::new(&config.history_path);
    let records = store
        .append(&snapshot)
        .with_context(|| format!("Failed to write {}", config.history_path.display()))?;
    info!(records, "Appended snapshot");
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

/// An interrupt is a clean exit even when the browser could not be released.
fn release_after_interrupt(released: std::result::Result<(), HarvestError>) {
    if let Err(e) = released {
        warn!(error = %e, "Failed to release browser session");
    }
}

fn history_since(now: NaiveDateTime, hours: i64) -> Result<NaiveDateTime> {
    if !(1..=MAX_HISTORY_HOURS).contains(&hours) {
        bail!("--hours must be between 1 and {MAX_HISTORY_HOURS}, got {hours}");
    }
    TimeDelta::try_hours(hours)
        .and_then(|window| now.checked_sub_signed(window))
        .with_context(|| format!("Look-back of {hours}h from {now} is out of range"))
}

fn print_history(config: &HarvestConfig, hours: i64) -> Result<()> {
    let since = history_since(Local::now().naive_local(), hours)?;
    let snapshots = HistoryStore::new(&config.history_path).recent(since);
    let out = serde_json::json!({
        "count": snapshots.len(),
        "data": snapshots,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn print_window() -> Result<()> {
    let now = Local::now().naive_local();
    match calendar::decide(now) {
        GateDecision::Open => println!("{now}: open"),
        GateDecision::Closed { state, resume_at } => {
            let wait = resume_at - now;
            println!(
                "{now}: closed ({state}), reopens at {resume_at} (in {}h{:02}m)",
                wait.num_hours(),
                wait.num_minutes() % 60
            );
        }
    }
    Ok(())
}
