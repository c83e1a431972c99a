//! Forecast acquisition for Windguru spots.
//!
//! [`ScrapeOrchestrator`] is the entry point: hand it a spot URL and it
//! returns the parsed forecast table, served from a short-lived cache when
//! possible.

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod scraper;
pub mod utils;

pub use crate::cache::ForecastCache;
pub use crate::config::AppConfig;
pub use crate::error::{FailureReason, ScrapeError};
pub use crate::models::{CloudCover, ForecastPoint, ForecastResult, SpotId, WindDirection};
pub use crate::pipeline::{BatchOutcome, ScrapeOrchestrator};
