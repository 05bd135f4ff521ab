//! Recurring job driver. Owns timing only — the actions it fires live
//! in the engine. Each job carries its own overlap guard: a trigger
//! while the previous run is still active is a skipped no-op.

pub mod cron;
pub mod jobs;

pub use jobs::{Job, JobRunner};
