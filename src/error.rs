use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Stage of a fetch that can exceed its time bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    Http,
    BrowserLaunch,
    Navigation,
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FetchStage::Http => "http request",
            FetchStage::BrowserLaunch => "browser launch",
            FetchStage::Navigation => "page navigation",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("not a forecast spot URL: {0:?}")]
    MalformedUrl(String),

    #[error("{stage} timed out after {after:?}")]
    FetchTimeout { stage: FetchStage, after: Duration },

    #[error("fetch failed: {0}")]
    FetchNetwork(String),

    #[error("no forecast table found on page")]
    TableNotFound,

    #[error("forecast table contained no data")]
    EmptyForecast,

    #[error("scrape cancelled")]
    Cancelled,

    #[error("scrape task failed: {0}")]
    TaskFailed(String),
}

/// Coarse failure class shown to end users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    MalformedUrl,
    Timeout,
    Network,
    NoData,
    Cancelled,
    Internal,
}

impl FailureReason {
    pub fn message(&self) -> &'static str {
        match self {
            FailureReason::MalformedUrl => "This does not look like a Windguru spot link.",
            FailureReason::Timeout => "The forecast site took too long to respond.",
            FailureReason::Network => "The forecast site could not be reached.",
            FailureReason::NoData => "No forecast data was found for this spot.",
            FailureReason::Cancelled => "The request was cancelled.",
            FailureReason::Internal => "Something went wrong while reading the forecast.",
        }
    }
}

impl ScrapeError {
    pub fn reason(&self) -> FailureReason {
        match self {
            ScrapeError::MalformedUrl(_) => FailureReason::MalformedUrl,
            ScrapeError::FetchTimeout { .. } => FailureReason::Timeout,
            ScrapeError::FetchNetwork(_) => FailureReason::Network,
            ScrapeError::TableNotFound | ScrapeError::EmptyForecast => FailureReason::NoData,
            ScrapeError::Cancelled => FailureReason::Cancelled,
            ScrapeError::TaskFailed(_) => FailureReason::Internal,
        }
    }

    /// Whether the orchestrator should retry with the rendering strategy.
    pub fn triggers_fallback(&self) -> bool {
        matches!(
            self,
            ScrapeError::FetchTimeout { .. }
                | ScrapeError::FetchNetwork(_)
                | ScrapeError::TableNotFound
        )
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
