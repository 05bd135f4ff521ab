//! SQLite tracking store.
//!
//! One row per tracking. Scalar fields the queries filter or sort on
//! are real columns; the alert policy and the price history are JSON
//! text columns. `record_price_update` runs in a transaction so the
//! price fields, history append and counters land as one unit.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, Row, params};

use pricetrack_core::error::{PriceTrackError, Result};
use pricetrack_core::traits::Store;
use pricetrack_core::types::{AlertConfig, PricePoint, StoreStats, Tracking};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

fn store_err(e: impl std::fmt::Display) -> PriceTrackError {
    PriceTrackError::Store(e.to_string())
}

impl SqliteStore {
    /// Open (or create) the database at `path`. Failing here is fatal:
    /// the process must not run without persistence.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(store_err)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS trackings (
                id TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL,
                product_url TEXT NOT NULL,
                platform TEXT NOT NULL,
                product_name TEXT,
                current_price REAL,
                currency TEXT NOT NULL DEFAULT 'INR',
                image_url TEXT,
                product_id TEXT,
                alert TEXT NOT NULL DEFAULT '{}',
                is_active INTEGER NOT NULL DEFAULT 1,
                is_paused INTEGER NOT NULL DEFAULT 0,
                price_history TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                last_checked TEXT,
                last_alert_sent TEXT,
                check_count INTEGER NOT NULL DEFAULT 0,
                alert_count INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_trackings_user ON trackings(user_id);
            CREATE INDEX IF NOT EXISTS idx_trackings_due
                ON trackings(is_active, is_paused, last_checked);
            CREATE TABLE IF NOT EXISTS analytics (
                recorded_at TEXT NOT NULL,
                stats TEXT NOT NULL
            );",
        )
        .map_err(store_err)?;

        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open under the PriceTrack home directory.
    pub fn open_default() -> Result<Self> {
        let path = pricetrack_core::config::PriceTrackConfig::home_dir().join("pricetrack.db");
        Self::open(&path)
    }

    fn row_to_tracking(row: &Row<'_>) -> rusqlite::Result<Tracking> {
        let alert_json: String = row.get("alert")?;
        let history_json: String = row.get("price_history")?;
        let alert: AlertConfig = serde_json::from_str(&alert_json).unwrap_or_default();
        let price_history: Vec<PricePoint> =
            serde_json::from_str(&history_json).unwrap_or_default();

        Ok(Tracking {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            product_url: row.get("product_url")?,
            platform: row.get("platform")?,
            product_name: row.get("product_name")?,
            current_price: row.get("current_price")?,
            currency: row.get("currency")?,
            image_url: row.get("image_url")?,
            product_id: row.get("product_id")?,
            alert,
            is_active: row.get::<_, i64>("is_active")? != 0,
            is_paused: row.get::<_, i64>("is_paused")? != 0,
            price_history,
            created_at: parse_ts(row, "created_at")?,
            updated_at: parse_ts(row, "updated_at")?,
            last_checked: parse_ts_opt(row, "last_checked")?,
            last_alert_sent: parse_ts_opt(row, "last_alert_sent")?,
            check_count: row.get::<_, i64>("check_count")? as u32,
            alert_count: row.get::<_, i64>("alert_count")? as u32,
        })
    }

    fn select_trackings(&self, where_clause: &str, p: &[&dyn rusqlite::ToSql]) -> Result<Vec<Tracking>> {
        let conn = self.conn.lock().map_err(store_err)?;
        let sql = format!("SELECT * FROM trackings {where_clause}");
        let mut stmt = conn.prepare(&sql).map_err(store_err)?;
        let rows = stmt
            .query_map(p, Self::row_to_tracking)
            .map_err(store_err)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(store_err)?);
        }
        Ok(out)
    }
}

fn parse_ts(row: &Row<'_>, col: &str) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(col)?;
    Ok(DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now()))
}

fn parse_ts_opt(row: &Row<'_>, col: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let s: Option<String> = row.get(col)?;
    Ok(s.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc)))
}

#[async_trait]
impl Store for SqliteStore {
    async fn get_due_trackings(&self, limit: usize) -> Result<Vec<Tracking>> {
        // NULL last_checked sorts first: never-checked trackings go to
        // the front of the queue.
        self.select_trackings(
            "WHERE is_active = 1 AND is_paused = 0
             ORDER BY last_checked ASC LIMIT ?1",
            &[&(limit as i64)],
        )
    }

    async fn get_tracking(&self, id: &str) -> Result<Option<Tracking>> {
        let mut rows = self.select_trackings("WHERE id = ?1", &[&id])?;
        Ok(rows.pop())
    }

    async fn insert_tracking(&self, t: &Tracking) -> Result<()> {
        let conn = self.conn.lock().map_err(store_err)?;
        let alert = serde_json::to_string(&t.alert).map_err(store_err)?;
        let history = serde_json::to_string(&t.price_history).map_err(store_err)?;
        conn.execute(
            "INSERT OR REPLACE INTO trackings
             (id, user_id, product_url, platform, product_name, current_price,
              currency, image_url, product_id, alert, is_active, is_paused,
              price_history, created_at, updated_at, last_checked,
              last_alert_sent, check_count, alert_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                     ?14, ?15, ?16, ?17, ?18, ?19)",
            params![
                t.id,
                t.user_id,
                t.product_url,
                t.platform,
                t.product_name,
                t.current_price,
                t.currency,
                t.image_url,
                t.product_id,
                alert,
                t.is_active as i64,
                t.is_paused as i64,
                history,
                t.created_at.to_rfc3339(),
                t.updated_at.to_rfc3339(),
                t.last_checked.map(|ts| ts.to_rfc3339()),
                t.last_alert_sent.map(|ts| ts.to_rfc3339()),
                t.check_count as i64,
                t.alert_count as i64,
            ],
        )
        .map_err(store_err)?;
        Ok(())
    }

    async fn record_price_update(&self, id: &str, point: &PricePoint) -> Result<()> {
        let mut conn = self.conn.lock().map_err(store_err)?;
        let tx = conn.transaction().map_err(store_err)?;

        let history_json: String = tx
            .query_row("SELECT price_history FROM trackings WHERE id = ?1", [id], |r| r.get(0))
            .map_err(|_| PriceTrackError::NotFound(id.to_string()))?;
        let mut history: Vec<PricePoint> =
            serde_json::from_str(&history_json).unwrap_or_default();
        history.push(point.clone());
        let history = serde_json::to_string(&history).map_err(store_err)?;

        let now = Utc::now().to_rfc3339();
        tx.execute(
            "UPDATE trackings SET current_price = ?1, price_history = ?2,
             check_count = check_count + 1, last_checked = ?3, updated_at = ?3
             WHERE id = ?4",
            params![point.price, history, now, id],
        )
        .map_err(store_err)?;
        tx.commit().map_err(store_err)?;
        Ok(())
    }

    async fn set_paused(&self, id: &str, paused: bool) -> Result<()> {
        let conn = self.conn.lock().map_err(store_err)?;
        let changed = conn
            .execute(
                "UPDATE trackings SET is_paused = ?1, updated_at = ?2 WHERE id = ?3",
                params![paused as i64, Utc::now().to_rfc3339(), id],
            )
            .map_err(store_err)?;
        if changed == 0 {
            return Err(PriceTrackError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn set_stopped(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().map_err(store_err)?;
        let changed = conn
            .execute(
                "UPDATE trackings SET is_active = 0, is_paused = 0, updated_at = ?1
                 WHERE id = ?2",
                params![Utc::now().to_rfc3339(), id],
            )
            .map_err(store_err)?;
        if changed == 0 {
            return Err(PriceTrackError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn record_alert_sent(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().map_err(store_err)?;
        conn.execute(
            "UPDATE trackings SET alert_count = alert_count + 1,
             last_alert_sent = ?1, updated_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), id],
        )
        .map_err(store_err)?;
        Ok(())
    }

    async fn get_trackings_by_owner(
        &self,
        user_id: i64,
        include_paused: bool,
    ) -> Result<Vec<Tracking>> {
        if include_paused {
            self.select_trackings(
                "WHERE user_id = ?1 AND is_active = 1 ORDER BY created_at ASC",
                &[&user_id],
            )
        } else {
            self.select_trackings(
                "WHERE user_id = ?1 AND is_active = 1 AND is_paused = 0
                 ORDER BY created_at ASC",
                &[&user_id],
            )
        }
    }

    async fn list_owner_ids(&self) -> Result<Vec<i64>> {
        let conn = self.conn.lock().map_err(store_err)?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT user_id FROM trackings WHERE is_active = 1")
            .map_err(store_err)?;
        let rows = stmt.query_map([], |r| r.get(0)).map_err(store_err)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(store_err)?);
        }
        Ok(out)
    }

    async fn cleanup_stopped(&self, retention_days: i64) -> Result<u64> {
        let cutoff = (Utc::now() - Duration::days(retention_days)).to_rfc3339();
        let conn = self.conn.lock().map_err(store_err)?;
        let removed = conn
            .execute(
                "DELETE FROM trackings WHERE is_active = 0 AND updated_at < ?1",
                params![cutoff],
            )
            .map_err(store_err)?;
        Ok(removed as u64)
    }

    async fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn.lock().map_err(store_err)?;
        let count = |sql: &str| -> Result<u64> {
            conn.query_row(sql, [], |r| r.get::<_, i64>(0))
                .map(|n| n as u64)
                .map_err(store_err)
        };
        Ok(StoreStats {
            total_trackings: count("SELECT COUNT(*) FROM trackings")?,
            active_trackings: count(
                "SELECT COUNT(*) FROM trackings WHERE is_active = 1 AND is_paused = 0",
            )?,
            paused_trackings: count(
                "SELECT COUNT(*) FROM trackings WHERE is_active = 1 AND is_paused = 1",
            )?,
            stopped_trackings: count("SELECT COUNT(*) FROM trackings WHERE is_active = 0")?,
            total_users: count("SELECT COUNT(DISTINCT user_id) FROM trackings")?,
            total_checks: count("SELECT COALESCE(SUM(check_count), 0) FROM trackings")?,
            total_alerts: count("SELECT COALESCE(SUM(alert_count), 0) FROM trackings")?,
        })
    }

    async fn record_analytics(&self, stats: &StoreStats) -> Result<()> {
        let conn = self.conn.lock().map_err(store_err)?;
        conn.execute(
            "INSERT INTO analytics (recorded_at, stats) VALUES (?1, ?2)",
            params![
                Utc::now().to_rfc3339(),
                serde_json::to_string(stats).map_err(store_err)?
            ],
        )
        .map_err(store_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricetrack_core::types::{ProductSnapshot, StockStatus};

    fn temp_store(name: &str) -> (SqliteStore, std::path::PathBuf) {
        let path = std::env::temp_dir()
            .join(format!("pricetrack-test-{name}-{}", uuid::Uuid::new_v4()))
            .join("store.db");
        (SqliteStore::open(&path).unwrap(), path)
    }

    fn snapshot(price: f64) -> ProductSnapshot {
        ProductSnapshot {
            name: Some("Widget".into()),
            price: Some(price),
            currency: Some("INR".into()),
            stock_status: StockStatus::InStock,
            discount: None,
            image_url: None,
            product_id: None,
        }
    }

    fn point(price: f64) -> PricePoint {
        PricePoint {
            price,
            currency: "INR".into(),
            timestamp: Utc::now(),
            stock_status: StockStatus::InStock,
            discount: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_roundtrip() {
        let (store, path) = temp_store("roundtrip");
        let t = Tracking::new(7, "https://example.com/p", "amazon", &snapshot(500.0));
        store.insert_tracking(&t).await.unwrap();

        let loaded = store.get_tracking(&t.id).await.unwrap().unwrap();
        assert_eq!(loaded.user_id, 7);
        assert_eq!(loaded.current_price, Some(500.0));
        assert_eq!(loaded.price_history.len(), 1);
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_due_excludes_paused_and_stopped() {
        let (store, path) = temp_store("due-filter");
        let active = Tracking::new(1, "u1", "amazon", &snapshot(10.0));
        let mut paused = Tracking::new(1, "u2", "amazon", &snapshot(10.0));
        paused.is_paused = true;
        let mut stopped = Tracking::new(1, "u3", "amazon", &snapshot(10.0));
        stopped.is_active = false;
        for t in [&active, &paused, &stopped] {
            store.insert_tracking(t).await.unwrap();
        }

        let due = store.get_due_trackings(10).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, active.id);
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_due_ordered_oldest_checked_first() {
        let (store, path) = temp_store("due-order");
        let mut old = Tracking::new(1, "old", "amazon", &snapshot(10.0));
        old.last_checked = Some(Utc::now() - Duration::hours(6));
        let mut recent = Tracking::new(1, "recent", "amazon", &snapshot(10.0));
        recent.last_checked = Some(Utc::now() - Duration::minutes(5));
        let never = Tracking::new(1, "never", "amazon", &snapshot(10.0));
        for t in [&recent, &old, &never] {
            store.insert_tracking(t).await.unwrap();
        }

        let due = store.get_due_trackings(10).await.unwrap();
        let urls: Vec<_> = due.iter().map(|t| t.product_url.as_str()).collect();
        assert_eq!(urls, vec!["never", "old", "recent"]);
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_record_price_update_is_atomic_unit() {
        let (store, path) = temp_store("price-update");
        let t = Tracking::new(1, "u", "amazon", &snapshot(100.0));
        store.insert_tracking(&t).await.unwrap();

        store.record_price_update(&t.id, &point(90.0)).await.unwrap();

        let loaded = store.get_tracking(&t.id).await.unwrap().unwrap();
        assert_eq!(loaded.current_price, Some(90.0));
        assert_eq!(loaded.price_history.len(), 2);
        assert_eq!(loaded.check_count, 1);
        assert!(loaded.last_checked.is_some());
        assert_eq!(loaded.previous_price(), Some(100.0));
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_record_alert_sent_bumps_counter() {
        let (store, path) = temp_store("alert-sent");
        let t = Tracking::new(1, "u", "amazon", &snapshot(100.0));
        store.insert_tracking(&t).await.unwrap();

        store.record_alert_sent(&t.id).await.unwrap();
        let loaded = store.get_tracking(&t.id).await.unwrap().unwrap();
        assert_eq!(loaded.alert_count, 1);
        assert!(loaded.last_alert_sent.is_some());
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_owner_listing_excludes_stopped_keeps_paused() {
        let (store, path) = temp_store("owner-list");
        let active = Tracking::new(5, "a", "amazon", &snapshot(10.0));
        let mut paused = Tracking::new(5, "p", "amazon", &snapshot(10.0));
        paused.is_paused = true;
        let mut stopped = Tracking::new(5, "s", "amazon", &snapshot(10.0));
        stopped.is_active = false;
        for t in [&active, &paused, &stopped] {
            store.insert_tracking(t).await.unwrap();
        }

        let all = store.get_trackings_by_owner(5, true).await.unwrap();
        assert_eq!(all.len(), 2);
        let unpaused = store.get_trackings_by_owner(5, false).await.unwrap();
        assert_eq!(unpaused.len(), 1);
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_cleanup_only_removes_old_stopped() {
        let (store, path) = temp_store("cleanup");
        let active = Tracking::new(1, "a", "amazon", &snapshot(10.0));
        let mut old_stopped = Tracking::new(1, "s", "amazon", &snapshot(10.0));
        old_stopped.is_active = false;
        old_stopped.updated_at = Utc::now() - Duration::days(120);
        store.insert_tracking(&active).await.unwrap();
        store.insert_tracking(&old_stopped).await.unwrap();

        let removed = store.cleanup_stopped(90).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.get_tracking(&active.id).await.unwrap().is_some());
        assert!(store.get_tracking(&old_stopped.id).await.unwrap().is_none());
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_stats_and_analytics() {
        let (store, path) = temp_store("stats");
        let t = Tracking::new(1, "a", "amazon", &snapshot(10.0));
        store.insert_tracking(&t).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_trackings, 1);
        assert_eq!(stats.active_trackings, 1);
        store.record_analytics(&stats).await.unwrap();
        std::fs::remove_file(&path).ok();
    }
}
