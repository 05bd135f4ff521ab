//! Scraper seam implementation — HTTP client against the snapshot
//! service that owns the per-site parsing. Everything that can go
//! wrong here (HTTP error, bad payload, timeout) collapses into one
//! uniform `Scrape` error; the check cycle does not care which it was.

use async_trait::async_trait;
use serde::Deserialize;

use pricetrack_core::config::ScraperConfig;
use pricetrack_core::error::{PriceTrackError, Result};
use pricetrack_core::traits::Scraper;
use pricetrack_core::types::ProductSnapshot;

pub struct HttpScraper {
    config: ScraperConfig,
    client: reqwest::Client,
}

/// Snapshot service response envelope.
#[derive(Debug, Deserialize)]
struct SnapshotResponse {
    ok: bool,
    snapshot: Option<ProductSnapshot>,
    error: Option<String>,
}

impl HttpScraper {
    pub fn new(config: ScraperConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    fn snapshot_url(&self) -> String {
        format!("{}/snapshot", self.config.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl Scraper for HttpScraper {
    async fn fetch_snapshot(&self, url: &str, platform: &str) -> Result<ProductSnapshot> {
        let response = self
            .client
            .get(self.snapshot_url())
            .query(&[("url", url), ("platform", platform)])
            .send()
            .await
            .map_err(|e| PriceTrackError::Scrape(format!("snapshot request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(PriceTrackError::Scrape(format!(
                "snapshot service returned {}",
                response.status()
            )));
        }

        let body: SnapshotResponse = response
            .json()
            .await
            .map_err(|e| PriceTrackError::Scrape(format!("invalid snapshot payload: {e}")))?;

        if !body.ok {
            return Err(PriceTrackError::Scrape(
                body.error.unwrap_or_else(|| "unknown scrape failure".into()),
            ));
        }

        body.snapshot
            .ok_or_else(|| PriceTrackError::Scrape("snapshot missing from response".into()))
    }
}
