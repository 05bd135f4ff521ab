//! PriceTrack core — domain types, configuration, errors, and the trait
//! seams (Store, Scraper, MessageSender) every other crate builds on.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{PriceTrackError, Result};
