pub mod assembler;
pub mod browser;
pub mod chromium;
pub mod cleaner;
pub mod http_client;
pub mod parsers;
pub mod spot_url;

#[cfg(test)]
pub(crate) mod fixtures;

use crate::error::Result;
use async_trait::async_trait;
use scraper::Html;

pub use self::browser::RenderingFetcher;
pub use self::chromium::ChromiumDriver;
pub use self::http_client::HttpFetcher;

// ── Fetch strategy trait ──────────────────────────────────────────────────────

/// One way of turning a spot URL into page markup.
///
/// There are exactly two: [`HttpFetcher`] and [`RenderingFetcher`].
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    async fn fetch(&self, url: &str) -> Result<RawDocument>;
}

/// Fetched page markup. Parsing is deferred because `scraper::Html` is not
/// `Send` and must not live across an await point.
#[derive(Debug, Clone)]
pub struct RawDocument {
    url: String,
    html: String,
}

impl RawDocument {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn parse(&self) -> Html {
        Html::parse_document(&self.html)
    }
}
