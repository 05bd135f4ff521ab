//! PriceTrack error types.

use thiserror::Error;

/// All errors produced by PriceTrack crates.
#[derive(Error, Debug)]
pub enum PriceTrackError {
    #[error("Config error: {0}")]
    Config(String),

    /// Persistence failure. Fatal at startup, absorbed per-item elsewhere.
    #[error("Store error: {0}")]
    Store(String),

    /// Any scrape failure — HTTP error, bad payload, timeout. The check
    /// cycle treats all of these uniformly: log, skip, retry next cycle.
    #[error("Scrape failed: {0}")]
    Scrape(String),

    /// Delivery channel failure for a single message.
    #[error("Channel error: {0}")]
    Channel(String),

    /// Lifecycle command on a tracking the caller does not own.
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// Lifecycle transition that the state machine forbids.
    #[error("Invalid lifecycle transition: {0}")]
    Lifecycle(String),

    #[error("Tracking not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, PriceTrackError>;
