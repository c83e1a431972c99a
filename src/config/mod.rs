use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

/// Lightweight HTTP fetch configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

/// Rendering (headless browser) fetch configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowserConfig {
    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,

    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,

    #[serde(default = "default_consent_probe_ms")]
    pub consent_probe_ms: u64,

    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    #[serde(default = "default_table_wait_secs")]
    pub table_wait_secs: u64,

    /// How long a session gets to shut down before it is killed.
    #[serde(default = "default_close_timeout_secs")]
    pub close_timeout_secs: u64,

    /// Explicit Chromium binary; autodetected when unset.
    #[serde(default)]
    pub executable: Option<String>,
}

/// Forecast cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

/// Multi-spot batch configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string()
}
fn default_http_timeout_secs() -> u64 {
    10
}
fn default_true() -> bool {
    true
}
fn default_viewport_width() -> u32 {
    1920
}
fn default_viewport_height() -> u32 {
    1080
}
fn default_navigation_timeout_secs() -> u64 {
    30
}
fn default_consent_probe_ms() -> u64 {
    2000
}
fn default_settle_ms() -> u64 {
    1500
}
fn default_table_wait_secs() -> u64 {
    5
}
fn default_close_timeout_secs() -> u64 {
    5
}

fn default_ttl_secs() -> u64 {
    300
}
fn default_concurrency() -> usize {
    4
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            navigation_timeout_secs: default_navigation_timeout_secs(),
            consent_probe_ms: default_consent_probe_ms(),
            settle_ms: default_settle_ms(),
            table_wait_secs: default_table_wait_secs(),
            close_timeout_secs: default_close_timeout_secs(),
            executable: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

impl ScraperConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

impl BrowserConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn consent_probe(&self) -> Duration {
        Duration::from_millis(self.consent_probe_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn table_wait(&self) -> Duration {
        Duration::from_secs(self.table_wait_secs)
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_secs(self.close_timeout_secs)
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("FORECAST").separator("__"))
            .build()
            .context("Failed to read configuration sources")?;

        cfg.try_deserialize()
            .context("Invalid configuration")
    }
}
