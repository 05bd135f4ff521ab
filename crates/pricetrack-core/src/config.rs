//! PriceTrack configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PriceTrackConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

impl PriceTrackConfig {
    /// Load config from the default path (~/.pricetrack/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::PriceTrackError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| crate::error::PriceTrackError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::PriceTrackError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the PriceTrack home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".pricetrack")
    }
}

/// Timing of the recurring jobs. The scheduler owns timing only — what
/// each job does lives in the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between price-check cycles.
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    /// Maximum trackings re-verified per cycle.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Delay between per-tracking scrapes within a cycle (politeness
    /// toward upstream sites, not a correctness requirement).
    #[serde(default = "default_politeness_delay")]
    pub politeness_delay_ms: u64,
    /// Cron (MIN HOUR DOM MON DOW) for the daily summary.
    #[serde(default = "default_daily_summary_time")]
    pub daily_summary_time: String,
    /// Cron for the weekly summary.
    #[serde(default = "default_weekly_summary_time")]
    pub weekly_summary_time: String,
    /// Cron for the old-data cleanup job.
    #[serde(default = "default_cleanup_time")]
    pub cleanup_time: String,
    /// Cron for the analytics snapshot job.
    #[serde(default = "default_analytics_time")]
    pub analytics_time: String,
}

fn default_check_interval() -> u64 {
    3600
}
fn default_batch_size() -> usize {
    100
}
fn default_politeness_delay() -> u64 {
    500
}
fn default_daily_summary_time() -> String {
    "0 9 * * *".into()
}
fn default_weekly_summary_time() -> String {
    "0 9 * * 1".into()
}
fn default_cleanup_time() -> String {
    "0 2 * * *".into()
}
fn default_analytics_time() -> String {
    "0 0 * * *".into()
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval(),
            batch_size: default_batch_size(),
            politeness_delay_ms: default_politeness_delay(),
            daily_summary_time: default_daily_summary_time(),
            weekly_summary_time: default_weekly_summary_time(),
            cleanup_time: default_cleanup_time(),
            analytics_time: default_analytics_time(),
        }
    }
}

/// Pacing of the notification fan-out. Two tiers: a short delay between
/// items inside a batch, a longer one between batches. Sustained
/// throughput stays near `batch_size / batch_delay`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Messages per burst — matches the channel's practical burst limit.
    #[serde(default = "default_dispatch_batch")]
    pub batch_size: usize,
    #[serde(default = "default_item_delay")]
    pub item_delay_ms: u64,
    #[serde(default = "default_batch_delay")]
    pub batch_delay_ms: u64,
}

fn default_dispatch_batch() -> usize {
    30
}
fn default_item_delay() -> u64 {
    50
}
fn default_batch_delay() -> u64 {
    1000
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_dispatch_batch(),
            item_delay_ms: default_item_delay(),
            batch_delay_ms: default_batch_delay(),
        }
    }
}

/// Store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_db_path() -> String {
    "~/.pricetrack/pricetrack.db".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { db_path: default_db_path() }
    }
}

/// Snapshot-service scraper configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Base URL of the snapshot service that does the per-site parsing.
    #[serde(default = "default_scraper_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_scrape_timeout")]
    pub timeout_secs: u64,
}

fn default_scraper_endpoint() -> String {
    "http://127.0.0.1:8090".into()
}
fn default_scrape_timeout() -> u64 {
    30
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            endpoint: default_scraper_endpoint(),
            timeout_secs: default_scrape_timeout(),
        }
    }
}

/// Telegram delivery channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub bot_token: String,
}

/// Retention policy applied by the cleanup job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Stopped trackings older than this many days are deleted.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
}

fn default_retention_days() -> i64 {
    90
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self { retention_days: default_retention_days() }
    }
}
