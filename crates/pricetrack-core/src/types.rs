//! Domain types — trackings, snapshots, alert policy, notification events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stock availability as reported by a scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    OutOfStock,
    Unknown,
}

impl StockStatus {
    pub fn label(&self) -> &'static str {
        match self {
            StockStatus::InStock => "in_stock",
            StockStatus::OutOfStock => "out_of_stock",
            StockStatus::Unknown => "unknown",
        }
    }
}

/// What kind of price movement triggers an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Any price difference.
    AnyChange,
    /// Drop of at least `threshold` percent.
    PercentageDrop,
    /// Price at or below `threshold`.
    FixedPrice,
    /// Never fires on price — stock notifications only.
    StockOnly,
}

/// Per-tracking alert decision policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    #[serde(default = "default_alert_kind")]
    pub kind: AlertKind,
    /// Required for `percentage_drop` and `fixed_price`; ignored otherwise.
    /// A missing required threshold means the rule never fires.
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default = "bool_true")]
    pub notify_on_stock: bool,
    #[serde(default)]
    pub notify_on_price_increase: bool,
}

fn default_alert_kind() -> AlertKind {
    AlertKind::AnyChange
}
fn bool_true() -> bool {
    true
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            kind: default_alert_kind(),
            threshold: None,
            notify_on_stock: true,
            notify_on_price_increase: false,
        }
    }
}

/// One entry in a tracking's append-only, time-ordered price history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
    pub price: f64,
    pub currency: String,
    pub timestamp: DateTime<Utc>,
    pub stock_status: StockStatus,
    pub discount: Option<f64>,
}

/// Derived lifecycle state of a tracking.
///
/// Storage keeps the flattened two-flag form (`is_active`, `is_paused`);
/// `stopped` is terminal and a stopped tracking is never paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Active,
    Paused,
    Stopped,
}

/// One user's monitoring subscription to one product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tracking {
    pub id: String,
    pub user_id: i64,
    pub product_url: String,
    pub platform: String,
    pub product_name: Option<String>,
    pub current_price: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub image_url: Option<String>,
    /// Platform-native product id, when the scrape exposed one.
    pub product_id: Option<String>,

    #[serde(default)]
    pub alert: AlertConfig,
    #[serde(default = "bool_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_paused: bool,

    #[serde(default)]
    pub price_history: Vec<PricePoint>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_checked: Option<DateTime<Utc>>,
    pub last_alert_sent: Option<DateTime<Utc>>,

    #[serde(default)]
    pub check_count: u32,
    #[serde(default)]
    pub alert_count: u32,
}

fn default_currency() -> String {
    "INR".into()
}

impl Tracking {
    /// Create a fresh tracking from a first successful snapshot.
    pub fn new(user_id: i64, product_url: &str, platform: &str, snapshot: &ProductSnapshot) -> Self {
        let now = Utc::now();
        let mut tracking = Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            product_url: product_url.to_string(),
            platform: platform.to_string(),
            product_name: snapshot.name.clone(),
            current_price: snapshot.price,
            currency: snapshot.currency.clone().unwrap_or_else(default_currency),
            image_url: snapshot.image_url.clone(),
            product_id: snapshot.product_id.clone(),
            alert: AlertConfig::default(),
            is_active: true,
            is_paused: false,
            price_history: Vec::new(),
            created_at: now,
            updated_at: now,
            last_checked: None,
            last_alert_sent: None,
            check_count: 0,
            alert_count: 0,
        };
        if let Some(price) = snapshot.price {
            tracking.price_history.push(PricePoint {
                price,
                currency: tracking.currency.clone(),
                timestamp: now,
                stock_status: snapshot.stock_status,
                discount: snapshot.discount,
            });
        }
        tracking
    }

    /// Lifecycle state derived from the flattened flags.
    pub fn state(&self) -> LifecycleState {
        if !self.is_active {
            LifecycleState::Stopped
        } else if self.is_paused {
            LifecycleState::Paused
        } else {
            LifecycleState::Active
        }
    }

    /// Whether the check cycle may select this tracking.
    pub fn is_checkable(&self) -> bool {
        self.state() == LifecycleState::Active
    }

    /// Price recorded before the most recent history entry.
    pub fn previous_price(&self) -> Option<f64> {
        let len = self.price_history.len();
        if len >= 2 {
            Some(self.price_history[len - 2].price)
        } else {
            None
        }
    }
}

/// A scrape's normalized view of a product. Ephemeral — the check cycle
/// folds what it keeps into the tracking's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    #[serde(default = "default_stock_status")]
    pub stock_status: StockStatus,
    pub discount: Option<f64>,
    pub image_url: Option<String>,
    pub product_id: Option<String>,
}

fn default_stock_status() -> StockStatus {
    StockStatus::InStock
}

/// A decision produced by the evaluator, consumed exactly once by the
/// dispatcher. Carries the tracking so the dispatcher can format the
/// message and update alert counters without a store round-trip.
#[derive(Debug, Clone)]
pub enum NotificationEvent {
    PriceAlert {
        tracking: Tracking,
        old_price: f64,
        new_price: f64,
        change_percent: f64,
    },
    StockAlert {
        tracking: Tracking,
        status: StockStatus,
    },
}

impl NotificationEvent {
    pub fn user_id(&self) -> i64 {
        match self {
            NotificationEvent::PriceAlert { tracking, .. } => tracking.user_id,
            NotificationEvent::StockAlert { tracking, .. } => tracking.user_id,
        }
    }

    pub fn tracking_id(&self) -> &str {
        match self {
            NotificationEvent::PriceAlert { tracking, .. } => &tracking.id,
            NotificationEvent::StockAlert { tracking, .. } => &tracking.id,
        }
    }
}

/// Aggregate counts persisted by the analytics job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_trackings: u64,
    pub active_trackings: u64,
    pub paused_trackings: u64,
    pub stopped_trackings: u64,
    pub total_users: u64,
    pub total_checks: u64,
    pub total_alerts: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(price: Option<f64>) -> ProductSnapshot {
        ProductSnapshot {
            name: Some("Widget".into()),
            price,
            currency: Some("INR".into()),
            stock_status: StockStatus::InStock,
            discount: None,
            image_url: None,
            product_id: Some("B0WIDGET".into()),
        }
    }

    #[test]
    fn test_new_tracking_seeds_history() {
        let t = Tracking::new(42, "https://example.com/p", "amazon", &snapshot(Some(999.0)));
        assert_eq!(t.price_history.len(), 1);
        assert_eq!(t.current_price, Some(999.0));
        assert_eq!(t.state(), LifecycleState::Active);
    }

    #[test]
    fn test_new_tracking_without_price_has_empty_history() {
        let t = Tracking::new(42, "https://example.com/p", "amazon", &snapshot(None));
        assert!(t.price_history.is_empty());
        assert!(t.previous_price().is_none());
    }

    #[test]
    fn test_state_mapping() {
        let mut t = Tracking::new(1, "u", "amazon", &snapshot(Some(10.0)));
        assert!(t.is_checkable());
        t.is_paused = true;
        assert_eq!(t.state(), LifecycleState::Paused);
        assert!(!t.is_checkable());
        t.is_paused = false;
        t.is_active = false;
        assert_eq!(t.state(), LifecycleState::Stopped);
        assert!(!t.is_checkable());
    }

    #[test]
    fn test_previous_price_needs_two_entries() {
        let mut t = Tracking::new(1, "u", "amazon", &snapshot(Some(100.0)));
        assert!(t.previous_price().is_none());
        t.price_history.push(PricePoint {
            price: 90.0,
            currency: "INR".into(),
            timestamp: Utc::now(),
            stock_status: StockStatus::InStock,
            discount: None,
        });
        assert_eq!(t.previous_price(), Some(100.0));
    }

    #[test]
    fn test_stock_status_serde_snake_case() {
        let json = serde_json::to_string(&StockStatus::OutOfStock).unwrap();
        assert_eq!(json, "\"out_of_stock\"");
    }
}
