//! Rendering strategy: load the spot page in a real browser.
//!
//! ## Steps
//!
//! 1. Launch an isolated session with a desktop user agent and viewport.
//! 2. Navigate, bounded by the navigation timeout.
//! 3. Try to dismiss a consent overlay (best effort, see [`CONSENT_MATCHERS`]).
//! 4. Sleep the settle period so late scripts can draw the table.
//! 5. Poll for any known table selector until the table wait runs out.
//! 6. Return whatever markup the page has.
//!
//! The session is closed on every path out of [`RenderingFetcher::fetch`];
//! if the fetch future is dropped mid-way, or the close itself stalls past
//! its bound, the session's own `Drop` releases it.

use crate::config::{BrowserConfig, ScraperConfig};
use crate::error::{FetchStage, Result, ScrapeError};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, warn};

use super::parsers::FORECAST_TABLE_SELECTORS;
use super::{PageFetcher, RawDocument};

const TABLE_POLL_INTERVAL: Duration = Duration::from_millis(250);

// ── Browser seam ──────────────────────────────────────────────────────────────

/// Identity the browser presents to the site.
#[derive(Debug, Clone)]
pub struct BrowserProfile {
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub headless: bool,
    pub executable: Option<String>,
}

#[async_trait]
pub trait BrowserDriver: Send + Sync {
    type Session: BrowserSession;

    async fn launch(&self, profile: &BrowserProfile) -> Result<Self::Session>;
}

/// One live browser with a single page.
///
/// Implementations must release the browser on `close` and on `Drop`.
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigate and wait for the page load.
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Click the first element matching `selector`. `Ok(false)` if none.
    async fn click_selector(&mut self, selector: &str) -> Result<bool>;

    /// Click the first button whose visible label equals `label`
    /// (case-insensitive). `Ok(false)` if none.
    async fn click_button_labelled(&mut self, label: &str) -> Result<bool>;

    async fn has_element(&mut self, selector: &str) -> Result<bool>;

    async fn content(&mut self) -> Result<String>;

    async fn close(self) -> Result<()>;
}

// ── Consent overlay ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentMatcher {
    Selector(&'static str),
    ButtonLabel(&'static str),
}

/// Known consent-dialog buttons, tried in order. New providers' dialogs go
/// at the end of the list.
pub const CONSENT_MATCHERS: &[ConsentMatcher] = &[
    ConsentMatcher::Selector("#onetrust-accept-btn-handler"),
    ConsentMatcher::Selector("button.fc-cta-consent"),
    ConsentMatcher::Selector("#didomi-notice-agree-button"),
    ConsentMatcher::Selector(".qc-cmp2-summary-buttons button[mode='primary']"),
    ConsentMatcher::Selector("button[aria-label='Consent']"),
    ConsentMatcher::ButtonLabel("Accept all"),
    ConsentMatcher::ButtonLabel("Accept"),
    ConsentMatcher::ButtonLabel("I agree"),
    ConsentMatcher::ButtonLabel("Agree"),
    ConsentMatcher::ButtonLabel("Consent"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsentOutcome {
    /// No overlay matched; nothing to do.
    NotFound,
    Dismissed(ConsentMatcher),
    /// A matcher was tried and errored or ran out of time.
    Failed {
        matcher: ConsentMatcher,
        reason: String,
    },
}

/// Probe each consent matcher in order; the first hit wins.
pub async fn dismiss_consent<S: BrowserSession>(session: &mut S, probe: Duration) -> ConsentOutcome {
    for matcher in CONSENT_MATCHERS {
        let attempt = match matcher {
            ConsentMatcher::Selector(sel) => timeout(probe, session.click_selector(sel)).await,
            ConsentMatcher::ButtonLabel(label) => {
                timeout(probe, session.click_button_labelled(label)).await
            }
        };

        match attempt {
            Ok(Ok(true)) => return ConsentOutcome::Dismissed(*matcher),
            Ok(Ok(false)) => continue,
            Ok(Err(e)) => {
                return ConsentOutcome::Failed {
                    matcher: *matcher,
                    reason: e.to_string(),
                };
            }
            Err(_) => {
                return ConsentOutcome::Failed {
                    matcher: *matcher,
                    reason: format!("no response within {:?}", probe),
                };
            }
        }
    }
    ConsentOutcome::NotFound
}

// ── Rendering fetcher ─────────────────────────────────────────────────────────

pub struct RenderingFetcher<D: BrowserDriver> {
    driver: D,
    profile: BrowserProfile,
    navigation_timeout: Duration,
    consent_probe: Duration,
    settle: Duration,
    table_wait: Duration,
    close_timeout: Duration,
}

impl<D: BrowserDriver> RenderingFetcher<D> {
    pub fn new(driver: D, scraper: &ScraperConfig, browser: &BrowserConfig) -> Self {
        Self {
            driver,
            profile: BrowserProfile {
                user_agent: scraper.user_agent.clone(),
                viewport_width: browser.viewport_width,
                viewport_height: browser.viewport_height,
                headless: browser.headless,
                executable: browser.executable.clone(),
            },
            navigation_timeout: browser.navigation_timeout(),
            consent_probe: browser.consent_probe(),
            settle: browser.settle(),
            table_wait: browser.table_wait(),
            close_timeout: browser.close_timeout(),
        }
    }

    async fn render(&self, session: &mut D::Session, url: &str) -> Result<String> {
        timeout(self.navigation_timeout, session.navigate(url))
            .await
            .map_err(|_| ScrapeError::FetchTimeout {
                stage: FetchStage::Navigation,
                after: self.navigation_timeout,
            })??;

        match dismiss_consent(session, self.consent_probe).await {
            ConsentOutcome::NotFound => debug!("No consent overlay on {}", url),
            ConsentOutcome::Dismissed(m) => debug!("Consent overlay dismissed via {:?}", m),
            ConsentOutcome::Failed { matcher, reason } => {
                warn!("Consent dismissal via {:?} failed: {}", matcher, reason)
            }
        }

        sleep(self.settle).await;

        if !self.wait_for_table(session).await {
            debug!(
                "No forecast table selector after {:?}; returning page as-is",
                self.table_wait
            );
        }

        session.content().await
    }

    async fn wait_for_table(&self, session: &mut D::Session) -> bool {
        let deadline = Instant::now() + self.table_wait;
        loop {
            for sel in FORECAST_TABLE_SELECTORS {
                match session.has_element(sel).await {
                    Ok(true) => return true,
                    Ok(false) => {}
                    Err(e) => debug!("Probe {} failed: {}", sel, e),
                }
            }
            if Instant::now() + TABLE_POLL_INTERVAL > deadline {
                return false;
            }
            sleep(TABLE_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl<D: BrowserDriver> PageFetcher for RenderingFetcher<D> {
    fn name(&self) -> &'static str {
        "browser"
    }

    async fn fetch(&self, url: &str) -> Result<RawDocument> {
        debug!("Rendering {}", url);

        let mut session = timeout(self.navigation_timeout, self.driver.launch(&self.profile))
            .await
            .map_err(|_| ScrapeError::FetchTimeout {
                stage: FetchStage::BrowserLaunch,
                after: self.navigation_timeout,
            })??;

        let rendered = self.render(&mut session, url).await;

        // On expiry the close future, and with it the session, is dropped.
        match timeout(self.close_timeout, session.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Browser session for {} did not close cleanly: {}", url, e),
            Err(_) => warn!(
                "Browser session for {} did not close within {:?}; killing it",
                url, self.close_timeout
            ),
        }

        let html = rendered?;
        debug!("Rendered {} → {} bytes", url, html.len());
        Ok(RawDocument::new(url, html))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
