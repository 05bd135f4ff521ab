//! # PriceTrack — scheduled product price tracker
//!
//! Re-checks registered product trackings on a fixed cadence, decides
//! which changes warrant an alert, and fans notifications out over
//! Telegram without tripping the Bot API rate limits.
//!
//! Usage:
//!   pricetrack run                       # Start the scheduler daemon
//!   pricetrack check-now                 # Run one check cycle and exit
//!   pricetrack track --user 42 <url>     # Register a tracking
//!   pricetrack list --user 42            # List a user's trackings

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pricetrack_channels::TelegramSender;
use pricetrack_core::config::PriceTrackConfig;
use pricetrack_core::traits::{MessageSender, Scraper, Store};
use pricetrack_core::types::{AlertConfig, AlertKind, Tracking};
use pricetrack_engine::{CheckCycle, RateLimitedDispatcher, TrackingLifecycle, maintenance};
use pricetrack_scheduler::{Job, JobRunner};
use pricetrack_scraper::HttpScraper;
use pricetrack_store::SqliteStore;

#[derive(Parser)]
#[command(name = "pricetrack", version, about = "Product price tracking and alerting")]
struct Cli {
    /// Config file path (default: ~/.pricetrack/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the recurring check cycle and maintenance jobs.
    Run,
    /// Run a single check cycle immediately and exit.
    CheckNow {
        /// Override the configured batch size.
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// Register a new tracking for a user.
    Track {
        #[arg(long)]
        user: i64,
        url: String,
        #[arg(long, default_value = "amazon")]
        platform: String,
        /// any-change, percentage-drop, fixed-price, or stock-only.
        #[arg(long, default_value = "any-change")]
        alert: String,
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// List a user's trackings (stopped ones never shown).
    List {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        include_paused: bool,
    },
    /// Pause checking for a tracking.
    Pause {
        #[arg(long)]
        user: i64,
        tracking_id: String,
    },
    /// Resume a paused tracking.
    Resume {
        #[arg(long)]
        user: i64,
        tracking_id: String,
    },
    /// Stop a tracking permanently.
    Stop {
        #[arg(long)]
        user: i64,
        tracking_id: String,
    },
}

fn parse_alert_kind(s: &str) -> Result<AlertKind> {
    match s {
        "any-change" => Ok(AlertKind::AnyChange),
        "percentage-drop" => Ok(AlertKind::PercentageDrop),
        "fixed-price" => Ok(AlertKind::FixedPrice),
        "stock-only" => Ok(AlertKind::StockOnly),
        other => bail!("unknown alert kind '{other}'"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "pricetrack=debug" } else { "pricetrack=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => PriceTrackConfig::load_from(std::path::Path::new(path))?,
        None => PriceTrackConfig::load()?,
    };

    // Store connectivity is the one failure allowed to halt startup:
    // nothing runs without persistence.
    let db_path = shellexpand::tilde(&config.store.db_path).to_string();
    let store: Arc<dyn Store> = Arc::new(
        SqliteStore::open(std::path::Path::new(&db_path))
            .context("failed to open tracking store")?,
    );
    let scraper: Arc<dyn Scraper> = Arc::new(HttpScraper::new(config.scraper.clone()));
    let lifecycle = TrackingLifecycle::new(store.clone());

    match cli.command {
        Command::Run => run_daemon(&config, store, scraper).await,
        Command::CheckNow { batch_size } => {
            let sender = telegram_sender(&config).await?;
            let dispatcher = Arc::new(RateLimitedDispatcher::new(
                sender,
                store.clone(),
                config.dispatch.clone(),
            ));
            let cycle = CheckCycle::new(
                store,
                scraper,
                dispatcher,
                config.scheduler.politeness_delay_ms,
                Arc::new(AtomicBool::new(false)),
            );
            let batch = batch_size.unwrap_or(config.scheduler.batch_size);
            let report = cycle.run(batch).await?;
            println!(
                "Checked {} trackings ({} scrape failures), sent {} alerts",
                report.checked, report.scrape_failures, report.events_sent
            );
            Ok(())
        }
        Command::Track { user, url, platform, alert, threshold } => {
            let kind = parse_alert_kind(&alert)?;
            if matches!(kind, AlertKind::PercentageDrop | AlertKind::FixedPrice)
                && threshold.is_none()
            {
                bail!("--threshold is required for {alert} alerts");
            }
            let snapshot = scraper
                .fetch_snapshot(&url, &platform)
                .await
                .context("could not fetch an initial product snapshot")?;
            let mut tracking = Tracking::new(user, &url, &platform, &snapshot);
            tracking.alert = AlertConfig { kind, threshold, ..AlertConfig::default() };
            store.insert_tracking(&tracking).await?;
            println!(
                "Tracking {} — {} @ {} {}",
                tracking.id,
                tracking.product_name.as_deref().unwrap_or(&url),
                tracking.currency,
                tracking.current_price.unwrap_or_default()
            );
            Ok(())
        }
        Command::List { user, include_paused } => {
            let trackings = lifecycle.list(user, include_paused).await?;
            if trackings.is_empty() {
                println!("No trackings.");
            }
            for t in trackings {
                println!(
                    "{}  [{:?}]  {} {}  {}  (checks: {}, alerts: {})",
                    t.id,
                    t.state(),
                    t.currency,
                    t.current_price.unwrap_or_default(),
                    t.product_name.as_deref().unwrap_or(&t.product_url),
                    t.check_count,
                    t.alert_count
                );
            }
            Ok(())
        }
        Command::Pause { user, tracking_id } => {
            lifecycle.pause(&tracking_id, user).await?;
            println!("Paused {tracking_id}");
            Ok(())
        }
        Command::Resume { user, tracking_id } => {
            lifecycle.resume(&tracking_id, user).await?;
            println!("Resumed {tracking_id}");
            Ok(())
        }
        Command::Stop { user, tracking_id } => {
            lifecycle.stop(&tracking_id, user).await?;
            println!("Stopped {tracking_id}");
            Ok(())
        }
    }
}

async fn telegram_sender(config: &PriceTrackConfig) -> Result<Arc<dyn MessageSender>> {
    if !config.telegram.enabled || config.telegram.bot_token.is_empty() {
        bail!("Telegram channel is not configured (set [telegram] enabled and bot_token)");
    }
    let sender = TelegramSender::new(&config.telegram.bot_token);
    let me = sender.get_me().await.context("Telegram token check failed")?;
    tracing::info!("Telegram bot: @{}", me.username.as_deref().unwrap_or("unknown"));
    Ok(Arc::new(sender))
}

async fn run_daemon(
    config: &PriceTrackConfig,
    store: Arc<dyn Store>,
    scraper: Arc<dyn Scraper>,
) -> Result<()> {
    tracing::info!("Starting PriceTrack");
    let sender = telegram_sender(config).await?;
    let shutdown = Arc::new(AtomicBool::new(false));

    let dispatcher = Arc::new(RateLimitedDispatcher::new(
        sender.clone(),
        store.clone(),
        config.dispatch.clone(),
    ));
    let cycle = Arc::new(CheckCycle::new(
        store.clone(),
        scraper,
        dispatcher,
        config.scheduler.politeness_delay_ms,
        shutdown.clone(),
    ));

    let mut runner = JobRunner::new();

    let batch_size = config.scheduler.batch_size;
    let check_cycle = cycle.clone();
    runner.add_job(Job::interval(
        "price_check",
        config.scheduler.check_interval_secs,
        move || {
            let cycle = check_cycle.clone();
            Box::pin(async move {
                if let Err(e) = cycle.run(batch_size).await {
                    tracing::error!("Price check failed: {e}");
                }
            })
        },
    ));

    let summary_store = store.clone();
    let summary_sender = sender.clone();
    runner.add_job(Job::cron(
        "daily_summary",
        &config.scheduler.daily_summary_time,
        move || {
            let store = summary_store.clone();
            let sender = summary_sender.clone();
            Box::pin(async move {
                if let Err(e) = maintenance::send_summaries(store, sender, "Daily Summary", 100).await {
                    tracing::error!("Daily summaries failed: {e}");
                }
            })
        },
    ));

    let weekly_store = store.clone();
    let weekly_sender = sender.clone();
    runner.add_job(Job::cron(
        "weekly_summary",
        &config.scheduler.weekly_summary_time,
        move || {
            let store = weekly_store.clone();
            let sender = weekly_sender.clone();
            Box::pin(async move {
                if let Err(e) = maintenance::send_summaries(store, sender, "Weekly Summary", 100).await {
                    tracing::error!("Weekly summaries failed: {e}");
                }
            })
        },
    ));

    let cleanup_store = store.clone();
    let retention_days = config.cleanup.retention_days;
    runner.add_job(Job::cron("cleanup", &config.scheduler.cleanup_time, move || {
        let store = cleanup_store.clone();
        Box::pin(async move {
            if let Err(e) = maintenance::cleanup_old_data(store, retention_days).await {
                tracing::error!("Cleanup failed: {e}");
            }
        })
    }));

    let analytics_store = store.clone();
    runner.add_job(Job::cron("analytics", &config.scheduler.analytics_time, move || {
        let store = analytics_store.clone();
        Box::pin(async move {
            if let Err(e) = maintenance::record_analytics(store).await {
                tracing::error!("Analytics failed: {e}");
            }
        })
    }));

    // Ctrl-C sets the flag; the cycle finishes its current item and the
    // runner stops at its next tick — no tracking left half-written.
    let signal_flag = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
            signal_flag.store(true, Ordering::SeqCst);
        }
    });

    tracing::info!("PriceTrack is ready ({} jobs registered)", runner.job_count());
    runner.run(shutdown).await;
    tracing::info!("PriceTrack shutdown complete");
    Ok(())
}
