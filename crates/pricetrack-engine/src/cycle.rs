//! The scheduled batch price check.
//!
//! One run: pull a bounded batch of due trackings (oldest-checked
//! first), scrape each sequentially, persist every successful check
//! whether or not it alerts, evaluate the alert policy, and hand all
//! qualifying events to the dispatcher in a single call so pacing is
//! applied uniformly across the whole cycle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;

use pricetrack_core::error::Result;
use pricetrack_core::traits::{Scraper, Store};
use pricetrack_core::types::{NotificationEvent, PricePoint};

use crate::dispatch::RateLimitedDispatcher;
use crate::evaluator;

pub struct CheckCycle {
    store: Arc<dyn Store>,
    scraper: Arc<dyn Scraper>,
    dispatcher: Arc<RateLimitedDispatcher>,
    politeness_delay_ms: u64,
    /// Overlap guard: a trigger while the previous run is still active
    /// is a no-op, not a stacked second run.
    running: AtomicBool,
    /// Graceful shutdown: finish the current item, stop before the next.
    shutdown: Arc<AtomicBool>,
}

/// What one cycle run did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub checked: usize,
    pub scrape_failures: usize,
    pub events_queued: usize,
    pub events_sent: usize,
    /// True when this invocation was skipped because the previous run
    /// was still active.
    pub skipped_overlap: bool,
}

impl CheckCycle {
    pub fn new(
        store: Arc<dyn Store>,
        scraper: Arc<dyn Scraper>,
        dispatcher: Arc<RateLimitedDispatcher>,
        politeness_delay_ms: u64,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            store,
            scraper,
            dispatcher,
            politeness_delay_ms,
            running: AtomicBool::new(false),
            shutdown,
        }
    }

    /// Run one cycle over at most `batch_size` trackings.
    pub async fn run(&self, batch_size: usize) -> Result<CycleReport> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!("Price check still running, skipping this trigger");
            return Ok(CycleReport { skipped_overlap: true, ..Default::default() });
        }
        let report = self.run_inner(batch_size).await;
        self.running.store(false, Ordering::SeqCst);
        report
    }

    async fn run_inner(&self, batch_size: usize) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        let trackings = self.store.get_due_trackings(batch_size).await?;
        if trackings.is_empty() {
            tracing::info!("No trackings due for a check");
            return Ok(report);
        }
        tracing::info!("Starting price check for {} trackings", trackings.len());

        let mut events: Vec<NotificationEvent> = Vec::new();
        let total = trackings.len();

        for (index, tracking) in trackings.into_iter().enumerate() {
            if self.shutdown.load(Ordering::SeqCst) {
                tracing::info!("Shutdown requested, stopping cycle after {index} items");
                break;
            }

            match self
                .scraper
                .fetch_snapshot(&tracking.product_url, &tracking.platform)
                .await
            {
                Ok(snapshot) => {
                    let old_price = tracking.current_price;

                    // Persist the check before deciding on alerts:
                    // history feeds the trend summaries either way.
                    // last_checked only advances here, so a failed
                    // scrape keeps its place at the front of the queue.
                    if let Some(price) = snapshot.price {
                        let point = PricePoint {
                            price,
                            currency: snapshot
                                .currency
                                .clone()
                                .unwrap_or_else(|| tracking.currency.clone()),
                            timestamp: Utc::now(),
                            stock_status: snapshot.stock_status,
                            discount: snapshot.discount,
                        };
                        if let Err(e) = self.store.record_price_update(&tracking.id, &point).await {
                            tracing::error!("Failed to persist check for {}: {e}", tracking.id);
                            report.scrape_failures += 1;
                            continue;
                        }
                    }

                    events.extend(evaluator::evaluate(&tracking, old_price, &snapshot));
                    report.checked += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to scrape {}: {e}", tracking.product_url);
                    report.scrape_failures += 1;
                }
            }

            if index + 1 < total {
                tokio::time::sleep(std::time::Duration::from_millis(self.politeness_delay_ms))
                    .await;
            }
        }

        report.events_queued = events.len();
        if !events.is_empty() {
            let delivery = self.dispatcher.deliver(events).await;
            report.events_sent = delivery.sent;
        }

        tracing::info!(
            "Price check completed: {} checked, {} failed, {} alerts sent",
            report.checked,
            report.scrape_failures,
            report.events_sent
        );
        Ok(report)
    }
}
