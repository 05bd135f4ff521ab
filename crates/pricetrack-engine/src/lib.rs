//! PriceTrack engine — the alert decision policy, the scheduled check
//! cycle, the rate-limited notification fan-out, the tracking
//! lifecycle, and the maintenance jobs. All collaborators arrive as
//! injected trait objects; nothing in here owns a global handle.

pub mod cycle;
pub mod dispatch;
pub mod evaluator;
pub mod lifecycle;
pub mod maintenance;

pub use cycle::{CheckCycle, CycleReport};
pub use dispatch::{DeliveryReport, RateLimitedDispatcher};
pub use lifecycle::TrackingLifecycle;
