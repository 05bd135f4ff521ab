//! Maintenance jobs driven by the scheduler alongside the check cycle:
//! per-user trend summaries, old-data cleanup, and the daily analytics
//! snapshot. Each absorbs per-user failures the same way the cycle
//! absorbs per-tracking ones.

use std::sync::Arc;

use pricetrack_channels::format;
use pricetrack_core::error::Result;
use pricetrack_core::traits::{MessageSender, Store};

/// Send a summary to every owner whose trackings moved. Returns how
/// many summaries went out.
pub async fn send_summaries(
    store: Arc<dyn Store>,
    sender: Arc<dyn MessageSender>,
    title: &str,
    pacing_ms: u64,
) -> Result<usize> {
    let owners = store.list_owner_ids().await?;
    let mut sent = 0;

    for user_id in owners {
        let trackings = match store.get_trackings_by_owner(user_id, true).await {
            Ok(trackings) => trackings,
            Err(e) => {
                tracing::error!("Failed to load trackings for user {user_id}: {e}");
                continue;
            }
        };
        let Some(text) = format::summary(title, &trackings) else {
            continue; // nothing moved, stay quiet
        };
        match sender.send_message(user_id, &text).await {
            Ok(()) => sent += 1,
            Err(e) => tracing::error!("Failed to send summary to {user_id}: {e}"),
        }
        tokio::time::sleep(std::time::Duration::from_millis(pacing_ms)).await;
    }

    tracing::info!("{title} sent to {sent} users");
    Ok(sent)
}

/// Delete stopped trackings past the retention window.
pub async fn cleanup_old_data(store: Arc<dyn Store>, retention_days: i64) -> Result<u64> {
    let removed = store.cleanup_stopped(retention_days).await?;
    tracing::info!("Cleanup removed {removed} stopped trackings older than {retention_days} days");
    Ok(removed)
}

/// Persist a snapshot of the aggregate counters.
pub async fn record_analytics(store: Arc<dyn Store>) -> Result<()> {
    let stats = store.stats().await?;
    store.record_analytics(&stats).await?;
    tracing::info!(
        "Analytics recorded: {} trackings ({} active), {} users",
        stats.total_trackings,
        stats.active_trackings,
        stats.total_users
    );
    Ok(())
}
