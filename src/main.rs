//! Poolwatch - DEX Pool Alert Lifecycle Tracker

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

use poolwatch::adapters::geckoterminal::GeckoTerminalClient;
use poolwatch::adapters::sqlite::SqliteAlertStore;
use poolwatch::application::{TrackerSettings, TrackingScheduler};
use poolwatch::config::{load_config, Config};
use poolwatch::ports::store::AlertStore;

/// Poolwatch - tracks DEX pool alerts against their TP/SL targets
#[derive(Parser, Debug)]
#[command(
    name = "poolwatch",
    version = env!("CARGO_PKG_VERSION"),
    about = "DEX pool alert lifecycle tracker",
    long_about = "Poolwatch polls alerted liquidity pools on a schedule, records \
                  checkpoint prices and TP/SL progress, and closes every alert \
                  exactly once with its observed outcome."
)]
struct CliApp {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the tracking loop
    Run(RunCmd),

    /// Run a single tracking cycle and exit
    Cycle(CycleCmd),

    /// Print outcome statistics for stored alerts
    Stats(StatsCmd),
}

#[derive(Parser, Debug)]
struct RunCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/default.toml")]
    config: PathBuf,
}

#[derive(Parser, Debug)]
struct CycleCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/default.toml")]
    config: PathBuf,
}

#[derive(Parser, Debug)]
struct StatsCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/default.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env holds machine-local overrides like DATABASE_PATH
    dotenvy::dotenv().ok();

    let app = CliApp::parse();
    init_logging(app.verbose, app.debug);

    match app.command {
        Command::Run(cmd) => run_command(cmd).await,
        Command::Cycle(cmd) => cycle_command(cmd).await,
        Command::Stats(cmd) => stats_command(cmd).await,
    }
}

fn init_logging(verbose: bool, debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    fmt().with_env_filter(filter).init();
}

fn build_scheduler(
    config: &Config,
) -> Result<TrackingScheduler<GeckoTerminalClient, SqliteAlertStore>> {
    let price_source = GeckoTerminalClient::with_api_url(
        &config.price_source.api_url,
        config.price_timeout(),
    )
    .context("Failed to create GeckoTerminal client")?;

    let store = SqliteAlertStore::open(config.database.resolved_path())
        .context("Failed to open alert database")?;

    let settings = TrackerSettings {
        poll_interval: config.poll_interval(),
        expiry_horizon_hours: config.tracking.expiry_horizon_hours,
        rate_delay: config.rate_delay(),
    };

    Ok(TrackingScheduler::new(price_source, store, settings))
}

async fn run_command(cmd: RunCmd) -> Result<()> {
    let config = load_config(&cmd.config).context("Failed to load configuration")?;
    let scheduler = build_scheduler(&config)?;

    let stop = scheduler.stop_handle();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("shutdown signal received");
        stop.stop().await;
    });

    scheduler.run().await?;
    Ok(())
}

async fn cycle_command(cmd: CycleCmd) -> Result<()> {
    let config = load_config(&cmd.config).context("Failed to load configuration")?;
    let scheduler = build_scheduler(&config)?;

    let report = scheduler.run_cycle().await?;
    println!(
        "tracked: {}  skipped: {}  advanced: {}  closed TP3: {}  closed SL: {}  swept: {}",
        report.tracked,
        report.skipped,
        report.advanced,
        report.closed_tp3,
        report.closed_sl,
        report.swept
    );
    Ok(())
}

async fn stats_command(cmd: StatsCmd) -> Result<()> {
    let config = load_config(&cmd.config).context("Failed to load configuration")?;
    let store = SqliteAlertStore::open(config.database.resolved_path())
        .context("Failed to open alert database")?;

    let summary = store.outcome_summary().await?;
    println!("open:     {}", summary.open);
    println!("WIN_TP1:  {}", summary.win_tp1);
    println!("WIN_TP2:  {}", summary.win_tp2);
    println!("WIN_TP3:  {}", summary.win_tp3);
    println!("LOSS_SL:  {}", summary.loss_sl);
    println!("TIMEOUT:  {}", summary.timeout);

    let closed = summary.closed();
    if closed > 0 {
        let win_rate = summary.wins() as f64 / closed as f64 * 100.0;
        println!("win rate: {:.1}% of {} closed", win_rate, closed);
    }
    Ok(())
}
