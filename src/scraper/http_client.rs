use crate::config::ScraperConfig;
use crate::error::{FetchStage, Result, ScrapeError};
use anyhow::Context;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::{PageFetcher, RawDocument};

/// Lightweight strategy: one GET, no JavaScript.
pub struct HttpFetcher {
    inner: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(config: &ScraperConfig) -> anyhow::Result<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.http_timeout())
            .gzip(true)
            // Accept cookies so consent redirects settle
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            inner,
            timeout: config.http_timeout(),
        })
    }

    fn map_error(&self, e: reqwest::Error) -> ScrapeError {
        if e.is_timeout() {
            ScrapeError::FetchTimeout {
                stage: FetchStage::Http,
                after: self.timeout,
            }
        } else {
            ScrapeError::FetchNetwork(e.to_string())
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch(&self, url: &str) -> Result<RawDocument> {
        debug!("GET {}", url);

        let resp = self
            .inner
            .get(url)
            .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml")
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ScrapeError::FetchNetwork(format!("HTTP {} for {}", status, url)));
        }

        let html = resp.text().await.map_err(|e| self.map_error(e))?;
        debug!("GET {} → {} bytes", url, html.len());

        Ok(RawDocument::new(url, html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a local port.
    async fn serve_once(status_line: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = sock.read(&mut buf).await;
            let resp = format!(
                "{}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            let _ = sock.write_all(resp.as_bytes()).await;
        });
        format!("http://{}/500760", addr)
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let url = serve_once("HTTP/1.1 200 OK", "<html><body>ok</body></html>".into()).await;
        let fetcher = HttpFetcher::new(&ScraperConfig::default()).unwrap();

        let doc = fetcher.fetch(&url).await.unwrap();
        assert!(doc.html().contains("ok"));
        assert_eq!(doc.url(), url);
    }

    #[tokio::test]
    async fn test_non_success_status_is_network_error() {
        let url = serve_once("HTTP/1.1 403 Forbidden", "blocked".into()).await;
        let fetcher = HttpFetcher::new(&ScraperConfig::default()).unwrap();

        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(matches!(err, ScrapeError::FetchNetwork(ref m) if m.contains("403")));
        assert!(err.triggers_fallback());
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_sock, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let config = ScraperConfig {
            http_timeout_secs: 1,
            ..ScraperConfig::default()
        };
        let fetcher = HttpFetcher::new(&config).unwrap();
        let err = fetcher.fetch(&format!("http://{}/1", addr)).await.unwrap_err();
        assert!(matches!(err, ScrapeError::FetchTimeout { stage: FetchStage::Http, .. }));
    }
}
