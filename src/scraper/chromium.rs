//! Chromium over the DevTools protocol, one browser process per session.

use crate::error::{Result, ScrapeError};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use futures::StreamExt;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::debug;

use super::browser::{BrowserDriver, BrowserProfile, BrowserSession};

fn cdp_error(e: CdpError) -> ScrapeError {
    ScrapeError::FetchNetwork(format!("browser: {}", e))
}

/// Scratch profile for one browser process, removed when dropped.
fn profile_dir() -> Result<TempDir> {
    tempfile::Builder::new()
        .prefix("forecast-chromium-")
        .tempdir()
        .map_err(|e| ScrapeError::FetchNetwork(format!("browser profile dir: {}", e)))
}

/// Launches a fresh Chromium with its own profile for every session;
/// nothing is shared.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromiumDriver;

pub struct ChromiumSession {
    browser: Option<Browser>,
    page: Option<Page>,
    events: JoinHandle<()>,
    // Declared last: the process must be gone before its profile is deleted.
    profile_dir: Option<TempDir>,
}

impl ChromiumSession {
    fn page(&self) -> Result<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| ScrapeError::FetchNetwork("browser: no open page".into()))
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    type Session = ChromiumSession;

    async fn launch(&self, profile: &BrowserProfile) -> Result<ChromiumSession> {
        let dir = profile_dir()?;
        let mut builder = CdpConfig::builder()
            .user_data_dir(dir.path())
            .window_size(profile.viewport_width, profile.viewport_height)
            .viewport(Viewport {
                width: profile.viewport_width,
                height: profile.viewport_height,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: true,
                has_touch: false,
            })
            .arg(format!("--user-agent={}", profile.user_agent))
            .arg("--disable-blink-features=AutomationControlled");
        if !profile.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &profile.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| ScrapeError::FetchNetwork(format!("browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(cdp_error)?;
        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        // From here on an early return drops the session, which kills the process.
        let mut session = ChromiumSession {
            browser: Some(browser),
            page: None,
            events,
            profile_dir: Some(dir),
        };

        let page = match session.browser.as_ref() {
            Some(browser) => browser.new_page("about:blank").await.map_err(cdp_error)?,
            None => return Err(ScrapeError::FetchNetwork("browser: not running".into())),
        };
        page.set_user_agent(SetUserAgentOverrideParams::new(profile.user_agent.clone()))
            .await
            .map_err(cdp_error)?;
        session.page = Some(page);

        debug!(
            "Chromium session started in {:?}",
            session.profile_dir.as_ref().map(TempDir::path)
        );
        Ok(session)
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.page()?.goto(url).await.map_err(cdp_error)?;
        Ok(())
    }

    async fn click_selector(&mut self, selector: &str) -> Result<bool> {
        let page = self.page()?;
        let Ok(element) = page.find_element(selector).await else {
            return Ok(false);
        };
        element.click().await.map_err(cdp_error)?;
        Ok(true)
    }

    async fn click_button_labelled(&mut self, label: &str) -> Result<bool> {
        let wanted = serde_json::to_string(&label.to_lowercase())
            .map_err(|e| ScrapeError::FetchNetwork(e.to_string()))?;
        let script = format!(
            r#"(() => {{
                const wanted = {};
                const el = [...document.querySelectorAll("button, [role='button'], a")]
                    .find(e => (e.innerText || "").trim().toLowerCase() === wanted);
                if (!el) return false;
                el.click();
                return true;
            }})()"#,
            wanted
        );
        self.page()?
            .evaluate(script)
            .await
            .map_err(cdp_error)?
            .into_value::<bool>()
            .map_err(|e| ScrapeError::FetchNetwork(format!("browser: {}", e)))
    }

    async fn has_element(&mut self, selector: &str) -> Result<bool> {
        Ok(self.page()?.find_element(selector).await.is_ok())
    }

    async fn content(&mut self) -> Result<String> {
        self.page()?.content().await.map_err(cdp_error)
    }

    async fn close(mut self) -> Result<()> {
        self.page = None;
        if let Some(mut browser) = self.browser.take() {
            browser.close().await.map_err(cdp_error)?;
            browser.wait().await.map_err(|e| ScrapeError::FetchNetwork(e.to_string()))?;
        }
        if let Some(dir) = self.profile_dir.take() {
            if let Err(e) = dir.close() {
                debug!("Could not remove browser profile: {}", e);
            }
        }
        debug!("Chromium session closed");
        Ok(())
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        // A Browser dropped without close() kills its child process itself.
        self.events.abort();
    }
}
