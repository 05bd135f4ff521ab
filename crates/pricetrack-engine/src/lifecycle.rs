//! Tracking lifecycle commands.
//!
//! States: active (default), paused, stopped. `stopped` is terminal —
//! no command ever leaves it. Commands from a caller who does not own
//! the tracking fail as authorization errors, not state errors.

use std::sync::Arc;

use pricetrack_core::error::{PriceTrackError, Result};
use pricetrack_core::traits::Store;
use pricetrack_core::types::{LifecycleState, Tracking};

pub struct TrackingLifecycle {
    store: Arc<dyn Store>,
}

impl TrackingLifecycle {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn owned_tracking(&self, tracking_id: &str, user_id: i64) -> Result<Tracking> {
        let tracking = self
            .store
            .get_tracking(tracking_id)
            .await?
            .ok_or_else(|| PriceTrackError::NotFound(tracking_id.to_string()))?;
        if tracking.user_id != user_id {
            return Err(PriceTrackError::Unauthorized(format!(
                "tracking {tracking_id} does not belong to user {user_id}"
            )));
        }
        Ok(tracking)
    }

    /// Pause checking. Idempotent for already-paused trackings.
    pub async fn pause(&self, tracking_id: &str, user_id: i64) -> Result<()> {
        let tracking = self.owned_tracking(tracking_id, user_id).await?;
        if tracking.state() == LifecycleState::Stopped {
            return Err(PriceTrackError::Lifecycle(format!(
                "tracking {tracking_id} is stopped"
            )));
        }
        self.store.set_paused(tracking_id, true).await
    }

    /// Resume checking. Idempotent for already-active trackings.
    pub async fn resume(&self, tracking_id: &str, user_id: i64) -> Result<()> {
        let tracking = self.owned_tracking(tracking_id, user_id).await?;
        if tracking.state() == LifecycleState::Stopped {
            return Err(PriceTrackError::Lifecycle(format!(
                "tracking {tracking_id} is stopped"
            )));
        }
        self.store.set_paused(tracking_id, false).await
    }

    /// Stop permanently. Valid from active or paused; the record stays
    /// around until the cleanup job's retention window expires.
    pub async fn stop(&self, tracking_id: &str, user_id: i64) -> Result<()> {
        let tracking = self.owned_tracking(tracking_id, user_id).await?;
        if tracking.state() == LifecycleState::Stopped {
            return Ok(()); // already terminal
        }
        self.store.set_stopped(tracking_id).await
    }

    /// A user's trackings. Stopped ones never appear; paused ones do
    /// when `include_paused` is set.
    pub async fn list(&self, user_id: i64, include_paused: bool) -> Result<Vec<Tracking>> {
        self.store.get_trackings_by_owner(user_id, include_paused).await
    }
}
