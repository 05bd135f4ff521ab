//! Trait seams for the external collaborators. The engine only ever
//! talks to these; concrete implementations live in their own crates
//! and are injected at startup.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{PricePoint, ProductSnapshot, StoreStats, Tracking};

/// Persistent storage for trackings.
#[async_trait]
pub trait Store: Send + Sync {
    /// Trackings due for a check: active, not paused, oldest
    /// `last_checked` first (never-checked sort before everything).
    /// The ordering is the starvation-avoidance guarantee — do not
    /// reorder.
    async fn get_due_trackings(&self, limit: usize) -> Result<Vec<Tracking>>;

    async fn get_tracking(&self, id: &str) -> Result<Option<Tracking>>;

    async fn insert_tracking(&self, tracking: &Tracking) -> Result<()>;

    /// Atomically: set current price, append the history entry, bump
    /// `check_count`, advance `last_checked`/`updated_at`.
    async fn record_price_update(&self, id: &str, point: &PricePoint) -> Result<()>;

    async fn set_paused(&self, id: &str, paused: bool) -> Result<()>;

    /// Terminal: clears the paused flag and marks the tracking stopped.
    async fn set_stopped(&self, id: &str) -> Result<()>;

    /// Bump `alert_count` and set `last_alert_sent` after a delivered
    /// price alert.
    async fn record_alert_sent(&self, id: &str) -> Result<()>;

    /// A user's trackings, stopped ones always excluded.
    async fn get_trackings_by_owner(
        &self,
        user_id: i64,
        include_paused: bool,
    ) -> Result<Vec<Tracking>>;

    /// Distinct owners of non-stopped trackings (summary recipients).
    async fn list_owner_ids(&self) -> Result<Vec<i64>>;

    /// Delete stopped trackings untouched for `retention_days`.
    /// Returns the number removed.
    async fn cleanup_stopped(&self, retention_days: i64) -> Result<u64>;

    async fn stats(&self) -> Result<StoreStats>;

    async fn record_analytics(&self, stats: &StoreStats) -> Result<()>;
}

/// Produces a fresh product snapshot for a URL. Scraping internals are
/// not this system's concern; any failure cause comes back as one
/// uniform `Scrape` error.
#[async_trait]
pub trait Scraper: Send + Sync {
    async fn fetch_snapshot(&self, url: &str, platform: &str) -> Result<ProductSnapshot>;
}

/// Sends one message to one user. The channel behind this enforces its
/// own hard rate limit; the dispatcher's pacing stays under it.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_message(&self, user_id: i64, text: &str) -> Result<()>;
}
