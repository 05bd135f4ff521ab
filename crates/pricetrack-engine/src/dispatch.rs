//! Rate-limited notification fan-out.
//!
//! Events are partitioned into fixed-size batches. Inside a batch a
//! short delay separates sends; a longer delay separates batches. The
//! two tiers keep sustained throughput under the channel's hard limit
//! while still allowing short bursts. One failed delivery never stops
//! the rest — best-effort fan-out.

use std::sync::Arc;

use pricetrack_channels::format;
use pricetrack_core::config::DispatchConfig;
use pricetrack_core::traits::{MessageSender, Store};
use pricetrack_core::types::NotificationEvent;

pub struct RateLimitedDispatcher {
    sender: Arc<dyn MessageSender>,
    store: Arc<dyn Store>,
    config: DispatchConfig,
}

/// Outcome of one `deliver` call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
}

impl RateLimitedDispatcher {
    pub fn new(
        sender: Arc<dyn MessageSender>,
        store: Arc<dyn Store>,
        config: DispatchConfig,
    ) -> Self {
        Self { sender, store, config }
    }

    /// Deliver `events` in order. Ordering across trackings carries no
    /// guarantee; within one tracking's co-queued events the caller's
    /// order (price before stock) is preserved.
    pub async fn deliver(&self, events: Vec<NotificationEvent>) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        if events.is_empty() {
            return report;
        }

        let total = events.len();
        let batches = events.chunks(self.config.batch_size.max(1));
        let batch_count = batches.len();
        tracing::info!("Dispatching {total} notifications in {batch_count} batches");

        for (batch_index, batch) in batches.enumerate() {
            for (item_index, event) in batch.iter().enumerate() {
                match self.deliver_one(event).await {
                    Ok(()) => report.sent += 1,
                    Err(e) => {
                        // Isolated: log and move on to the next event.
                        tracing::error!(
                            "Failed to notify user {} for tracking {}: {e}",
                            event.user_id(),
                            event.tracking_id()
                        );
                        report.failed += 1;
                    }
                }

                let last_in_batch = item_index + 1 == batch.len();
                if !last_in_batch {
                    tokio::time::sleep(std::time::Duration::from_millis(
                        self.config.item_delay_ms,
                    ))
                    .await;
                }
            }

            if batch_index + 1 < batch_count {
                tokio::time::sleep(std::time::Duration::from_millis(self.config.batch_delay_ms))
                    .await;
            }
        }

        tracing::info!("Dispatch complete: {} sent, {} failed", report.sent, report.failed);
        report
    }

    async fn deliver_one(&self, event: &NotificationEvent) -> pricetrack_core::Result<()> {
        let text = format::render_event(event);
        self.sender.send_message(event.user_id(), &text).await?;

        // Only price alerts touch the alert counter; see DESIGN.md.
        if let NotificationEvent::PriceAlert { tracking, .. } = event {
            if let Err(e) = self.store.record_alert_sent(&tracking.id).await {
                tracing::warn!(
                    "Alert delivered but counter update failed for {}: {e}",
                    tracking.id
                );
            }
        }
        Ok(())
    }
}
