//! Scrape orchestrator: URL → cache → fetch (with fallback) → parse → cache.
//!
//! ## Flow
//!
//! 1. Identify the spot from the URL; malformed URLs fail before any I/O.
//! 2. Serve a fresh cache entry if there is one.
//! 3. Otherwise fetch with the primary (HTTP) strategy, parse and assemble.
//!    A fetch failure or a missing table retries once with the fallback
//!    (browser) strategy. Anything else, or a second failure, is final.
//! 4. Cache the new result and return it. Failures are never cached.
//!
//! Overlapping scrapes of the same spot queue on a per-spot lock and the
//! later one is served from the cache the first one filled.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cache::ForecastCache;
use crate::config::AppConfig;
use crate::error::{Result, ScrapeError};
use crate::models::{ForecastResult, SpotId, SOURCE_TAG};
use crate::scraper::{
    assembler, parsers, spot_url, ChromiumDriver, HttpFetcher, PageFetcher, RawDocument,
    RenderingFetcher,
};
use crate::utils::{Clock, SystemClock};

/// Result of one spot in a [`ScrapeOrchestrator::scrape_batch`] call.
pub struct BatchOutcome {
    pub url: String,
    pub result: Result<Arc<ForecastResult>>,
}

type SpotLocks = Mutex<HashMap<SpotId, Arc<tokio::sync::Mutex<()>>>>;

pub struct ScrapeOrchestrator {
    primary: Arc<dyn PageFetcher>,
    fallback: Arc<dyn PageFetcher>,
    cache: Arc<ForecastCache>,
    clock: Arc<dyn Clock>,
    in_flight: SpotLocks,
    batch_concurrency: usize,
}

/// A handle on one spot's lock. Dropping the last handle removes the
/// spot from the in-flight map, whether the scrape finished or was abandoned.
struct SpotSlot<'a> {
    locks: &'a SpotLocks,
    spot: SpotId,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for SpotSlot<'_> {
    fn drop(&mut self) {
        let mut map = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // the map's handle and this one: nobody else is waiting on this spot
        if map.get(&self.spot).is_some_and(|l| Arc::strong_count(l) == 2) {
            map.remove(&self.spot);
        }
    }
}

impl ScrapeOrchestrator {
    /// Production wiring: HTTP first, headless Chromium as fallback.
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let primary = Arc::new(HttpFetcher::new(&config.scraper)?);
        let fallback = Arc::new(RenderingFetcher::new(
            ChromiumDriver,
            &config.scraper,
            &config.browser,
        ));
        let cache = Arc::new(ForecastCache::new(config.cache.ttl(), clock.clone()));

        Ok(Self::from_parts(
            primary,
            fallback,
            cache,
            clock,
            config.batch.concurrency,
        ))
    }

    pub fn from_parts(
        primary: Arc<dyn PageFetcher>,
        fallback: Arc<dyn PageFetcher>,
        cache: Arc<ForecastCache>,
        clock: Arc<dyn Clock>,
        batch_concurrency: usize,
    ) -> Self {
        Self {
            primary,
            fallback,
            cache,
            clock,
            in_flight: Mutex::new(HashMap::new()),
            batch_concurrency: batch_concurrency.max(1),
        }
    }

    // ── Collaborator API ──────────────────────────────────────────────────────

    pub async fn scrape(&self, url: &str) -> Result<Arc<ForecastResult>> {
        let spot = spot_url::identify(url)?;

        if let Some(hit) = self.cache.get(&spot) {
            debug!("{}: cache hit (scraped {})", spot, hit.scraped_at);
            return Ok(hit);
        }

        let slot = self.spot_slot(&spot);
        let _guard = slot.lock.lock().await;
        // a concurrent scrape of this spot may have just filled the cache
        match self.cache.get(&spot) {
            Some(hit) => Ok(hit),
            None => self.scrape_fresh(&spot).await,
        }
    }

    /// `scrape`, abandoned as soon as `cancel` fires. Abandoning drops any
    /// open browser session.
    pub async fn scrape_with_cancel(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Arc<ForecastResult>> {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Scrape of {} cancelled", url);
                Err(ScrapeError::Cancelled)
            }
            outcome = self.scrape(url) => outcome,
        }
    }

    /// Whether the URL scrapes successfully. Used to vet a spot URL before
    /// it is saved.
    pub async fn test_url(&self, url: &str) -> bool {
        match self.scrape(url).await {
            Ok(_) => true,
            Err(e) => {
                info!("URL check failed for {}: {}", url, e);
                false
            }
        }
    }

    pub fn clear_cache(&self, spot: Option<&SpotId>) {
        match spot {
            Some(spot) => info!("{}: cache cleared", spot),
            None => info!("Forecast cache cleared"),
        }
        self.cache.clear(spot);
    }

    /// Scrape many spots at once. One outcome per URL, in input order; one
    /// spot failing does not affect the others.
    pub async fn scrape_batch(self: &Arc<Self>, urls: Vec<String>) -> Vec<BatchOutcome> {
        let sem = Arc::new(Semaphore::new(self.batch_concurrency));
        let mut handles = Vec::with_capacity(urls.len());

        for url in urls {
            let this = Arc::clone(self);
            let sem = Arc::clone(&sem);
            let task_url = url.clone();

            let handle = tokio::spawn(async move {
                let _permit = sem
                    .acquire()
                    .await
                    .map_err(|e| ScrapeError::TaskFailed(e.to_string()))?;
                this.scrape(&task_url).await
            });

            handles.push((url, handle));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        let mut errors = 0usize;

        for (url, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    error!("Task panic for {}: {}", url, e);
                    Err(ScrapeError::TaskFailed(e.to_string()))
                }
            };
            if let Err(e) = &result {
                warn!("{}: {}", url, e);
                errors += 1;
            }
            outcomes.push(BatchOutcome { url, result });
        }

        info!(
            "Batch done: {} spots, {} ok, {} failed",
            outcomes.len(),
            outcomes.len() - errors,
            errors
        );
        outcomes
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn spot_slot(&self, spot: &SpotId) -> SpotSlot<'_> {
        let mut map = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        let lock = map.entry(spot.clone()).or_default().clone();
        SpotSlot {
            locks: &self.in_flight,
            spot: spot.clone(),
            lock,
        }
    }

    async fn scrape_fresh(&self, spot: &SpotId) -> Result<Arc<ForecastResult>> {
        let url = spot.canonical_url();

        let result = match self.attempt(self.primary.as_ref(), spot, &url).await {
            Ok(result) => result,
            Err(e) if e.triggers_fallback() => {
                warn!(
                    "{}: {} strategy failed ({}), retrying with {}",
                    spot,
                    self.primary.name(),
                    e,
                    self.fallback.name()
                );
                self.attempt(self.fallback.as_ref(), spot, &url).await?
            }
            Err(e) => return Err(e),
        };

        let result = Arc::new(result);
        self.cache.put(spot.clone(), result.clone());
        info!(
            "{}: {} forecast points from {}",
            spot,
            result.forecasts.len(),
            result.spot_name
        );
        Ok(result)
    }

    async fn attempt(
        &self,
        fetcher: &dyn PageFetcher,
        spot: &SpotId,
        url: &str,
    ) -> Result<ForecastResult> {
        let doc = fetcher.fetch(url).await?;
        self.build_result(spot, &doc, self.clock.now())
    }

    fn build_result(
        &self,
        spot: &SpotId,
        doc: &RawDocument,
        scraped_at: DateTime<Utc>,
    ) -> Result<ForecastResult> {
        let html = doc.parse();
        let rows = parsers::locate(&html)?;
        let forecasts = assembler::assemble(&rows, scraped_at)?;

        Ok(ForecastResult {
            spot_id: spot.clone(),
            spot_name: parsers::spot_name(&html, spot),
            source_url: doc.url().to_string(),
            forecasts,
            scraped_at,
            source_tag: SOURCE_TAG,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
