//! Rate-limited page fetching
//!
//! This module owns the browser-like HTTP session used against the
//! source archive:
//! - One shared monotonic timer per session enforces the minimum
//!   spacing between consecutive fetches (sequential, not per-URL)
//! - HTTP-level failures are classified into a typed error taxonomy
//! - A successful fetch waits briefly for client-side rendering to
//!   settle before returning the body
//!
//! The session is a scoped resource: building it opens the client,
//! dropping it tears the connection pool down on every exit path.

use crate::config::ScraperConfig;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Typed fetch failures
///
/// 403 and 429 are transient-blocked conditions worth retrying at the
/// operation level; 404 is terminal and never retried.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request blocked for {url} (HTTP 403, likely bot detection)")]
    Forbidden { url: String },

    #[error("rate limited by the archive for {url} (HTTP 429)")]
    RateLimited { url: String },

    #[error("page not found: {url}")]
    NotFound { url: String },

    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    #[error("network error for {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build HTTP session: {0}")]
    Session(#[source] reqwest::Error),
}

/// A rate-limited fetch session against one archive
pub struct Session {
    client: Client,
    rate_limit: f64,
    settle: Duration,
    last_request: Option<Instant>,
}

impl Session {
    /// Opens a new session
    ///
    /// # Arguments
    ///
    /// * `config` - Scraper configuration (rate limit, timeouts, user agent)
    ///
    /// # Returns
    ///
    /// * `Ok(Session)` - Ready-to-use session
    /// * `Err(FetchError)` - Failed to build the HTTP client
    pub fn open(config: &ScraperConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(FetchError::Session)?;

        Ok(Self {
            client,
            rate_limit: config.rate_limit,
            settle: Duration::from_millis(config.settle_ms),
            last_request: None,
        })
    }

    /// Fetches a document, respecting the session rate limit
    ///
    /// Blocks until at least `1 / rate_limit` seconds have elapsed since
    /// the previous fetch issued by this session, then classifies the
    /// response status.
    pub async fn fetch(&mut self, url: &str) -> Result<String, FetchError> {
        self.wait_for_rate_limit().await;

        tracing::debug!(%url, "fetching");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Network {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(classify_status(url, status));
        }

        let body = response
            .text()
            .await
            .map_err(|source| FetchError::Network {
                url: url.to_string(),
                source,
            })?;

        // Give client-side rendering a moment before the caller parses
        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }

        Ok(body)
    }

    async fn wait_for_rate_limit(&mut self) {
        if self.rate_limit > 0.0 {
            let min_interval = Duration::from_secs_f64(1.0 / self.rate_limit);
            if let Some(last) = self.last_request {
                let elapsed = last.elapsed();
                if elapsed < min_interval {
                    tokio::time::sleep(min_interval - elapsed).await;
                }
            }
        }
        self.last_request = Some(Instant::now());
    }
}

fn classify_status(url: &str, status: StatusCode) -> FetchError {
    match status {
        StatusCode::FORBIDDEN => FetchError::Forbidden {
            url: url.to_string(),
        },
        StatusCode::TOO_MANY_REQUESTS => FetchError::RateLimited {
            url: url.to_string(),
        },
        StatusCode::NOT_FOUND => FetchError::NotFound {
            url: url.to_string(),
        },
        _ => FetchError::Http {
            url: url.to_string(),
            status: status.as_u16(),
        },
    }
}
