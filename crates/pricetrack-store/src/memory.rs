//! In-memory store. Same contract as the SQLite backend, no disk —
//! used by the engine and scheduler tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use pricetrack_core::error::{PriceTrackError, Result};
use pricetrack_core::traits::Store;
use pricetrack_core::types::{PricePoint, StoreStats, Tracking};

#[derive(Default)]
pub struct MemoryStore {
    trackings: Mutex<HashMap<String, Tracking>>,
    analytics: Mutex<Vec<StoreStats>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of analytics snapshots recorded.
    pub fn analytics_count(&self) -> usize {
        self.analytics.lock().unwrap().len()
    }

    fn with_tracking<T>(&self, id: &str, f: impl FnOnce(&mut Tracking) -> T) -> Result<T> {
        let mut map = self.trackings.lock().unwrap();
        let tracking = map
            .get_mut(id)
            .ok_or_else(|| PriceTrackError::NotFound(id.to_string()))?;
        Ok(f(tracking))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_due_trackings(&self, limit: usize) -> Result<Vec<Tracking>> {
        let map = self.trackings.lock().unwrap();
        let mut due: Vec<Tracking> = map
            .values()
            .filter(|t| t.is_checkable())
            .cloned()
            .collect();
        // None (never checked) sorts before any timestamp.
        due.sort_by_key(|t| (t.last_checked, t.created_at));
        due.truncate(limit);
        Ok(due)
    }

    async fn get_tracking(&self, id: &str) -> Result<Option<Tracking>> {
        Ok(self.trackings.lock().unwrap().get(id).cloned())
    }

    async fn insert_tracking(&self, tracking: &Tracking) -> Result<()> {
        self.trackings
            .lock()
            .unwrap()
            .insert(tracking.id.clone(), tracking.clone());
        Ok(())
    }

    async fn record_price_update(&self, id: &str, point: &PricePoint) -> Result<()> {
        self.with_tracking(id, |t| {
            t.current_price = Some(point.price);
            t.price_history.push(point.clone());
            t.check_count += 1;
            t.last_checked = Some(Utc::now());
            t.updated_at = Utc::now();
        })
    }

    async fn set_paused(&self, id: &str, paused: bool) -> Result<()> {
        self.with_tracking(id, |t| {
            t.is_paused = paused;
            t.updated_at = Utc::now();
        })
    }

    async fn set_stopped(&self, id: &str) -> Result<()> {
        self.with_tracking(id, |t| {
            t.is_active = false;
            t.is_paused = false;
            t.updated_at = Utc::now();
        })
    }

    async fn record_alert_sent(&self, id: &str) -> Result<()> {
        self.with_tracking(id, |t| {
            t.alert_count += 1;
            t.last_alert_sent = Some(Utc::now());
            t.updated_at = Utc::now();
        })
    }

    async fn get_trackings_by_owner(
        &self,
        user_id: i64,
        include_paused: bool,
    ) -> Result<Vec<Tracking>> {
        let map = self.trackings.lock().unwrap();
        let mut out: Vec<Tracking> = map
            .values()
            .filter(|t| t.user_id == user_id && t.is_active)
            .filter(|t| include_paused || !t.is_paused)
            .cloned()
            .collect();
        out.sort_by_key(|t| t.created_at);
        Ok(out)
    }

    async fn list_owner_ids(&self) -> Result<Vec<i64>> {
        let map = self.trackings.lock().unwrap();
        let mut ids: Vec<i64> = map
            .values()
            .filter(|t| t.is_active)
            .map(|t| t.user_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn cleanup_stopped(&self, retention_days: i64) -> Result<u64> {
        let cutoff = Utc::now() - Duration::days(retention_days);
        let mut map = self.trackings.lock().unwrap();
        let before = map.len();
        map.retain(|_, t| t.is_active || t.updated_at >= cutoff);
        Ok((before - map.len()) as u64)
    }

    async fn stats(&self) -> Result<StoreStats> {
        let map = self.trackings.lock().unwrap();
        let mut stats = StoreStats::default();
        let mut users: Vec<i64> = Vec::new();
        for t in map.values() {
            stats.total_trackings += 1;
            match (t.is_active, t.is_paused) {
                (false, _) => stats.stopped_trackings += 1,
                (true, true) => stats.paused_trackings += 1,
                (true, false) => stats.active_trackings += 1,
            }
            stats.total_checks += t.check_count as u64;
            stats.total_alerts += t.alert_count as u64;
            users.push(t.user_id);
        }
        users.sort_unstable();
        users.dedup();
        stats.total_users = users.len() as u64;
        Ok(stats)
    }

    async fn record_analytics(&self, stats: &StoreStats) -> Result<()> {
        self.analytics.lock().unwrap().push(stats.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricetrack_core::types::{ProductSnapshot, StockStatus};

    fn tracking(user_id: i64, url: &str) -> Tracking {
        let snapshot = ProductSnapshot {
            name: Some("Widget".into()),
            price: Some(100.0),
            currency: Some("INR".into()),
            stock_status: StockStatus::InStock,
            discount: None,
            image_url: None,
            product_id: None,
        };
        Tracking::new(user_id, url, "amazon", &snapshot)
    }

    #[tokio::test]
    async fn test_due_never_checked_first() {
        let store = MemoryStore::new();
        let mut checked = tracking(1, "checked");
        checked.last_checked = Some(Utc::now() - Duration::hours(1));
        let fresh = tracking(1, "fresh");
        store.insert_tracking(&checked).await.unwrap();
        store.insert_tracking(&fresh).await.unwrap();

        let due = store.get_due_trackings(10).await.unwrap();
        assert_eq!(due[0].product_url, "fresh");
    }

    #[tokio::test]
    async fn test_stopped_never_due() {
        let store = MemoryStore::new();
        let t = tracking(1, "u");
        store.insert_tracking(&t).await.unwrap();
        store.set_stopped(&t.id).await.unwrap();
        assert!(store.get_due_trackings(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_tracking_is_not_found() {
        let store = MemoryStore::new();
        let err = store.set_paused("nope", true).await.unwrap_err();
        assert!(matches!(err, PriceTrackError::NotFound(_)));
    }
}
