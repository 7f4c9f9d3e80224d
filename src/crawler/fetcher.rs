//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with a browser identity and a shared cookie jar
//! - GET requests to fetch page content
//! - Retry logic with a fixed pre-request delay and post-failure backoff
//! - Error classification

use crate::config::{CrawlerConfig, SiteConfig};
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{redirect::Policy, Client};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,
    /// Page body content
    pub body: String,
}

/// Why a single fetch attempt failed
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP {status_code}")]
    Status { status_code: u16 },

    #[error("network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_connect() {
            FetchError::Connect(e.to_string())
        } else if let Some(status) = e.status() {
            FetchError::Status {
                status_code: status.as_u16(),
            }
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

/// Attempt count and pacing for one URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per URL (at least 1)
    pub max_attempts: u32,
    /// Sleep before every attempt, successful or not
    pub request_delay: Duration,
    /// Extra sleep between a failed attempt and the next one
    pub retry_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&CrawlerConfig::default())
    }
}

impl From<&CrawlerConfig> for RetryPolicy {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            request_delay: config.request_delay(),
            retry_backoff: config.retry_backoff(),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// The client presents itself as a desktop browser, stores cookies in `jar`
/// and applies the configured per-request timeout.
///
/// # Arguments
///
/// * `site` - Browser identity (user agent, accepted languages)
/// * `crawler` - Request timeout
/// * `jar` - Cookie jar shared by every client of one session
/// * `redirect` - Redirect policy; cookie verification needs to see redirects
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    site: &SiteConfig,
    crawler: &CrawlerConfig,
    jar: Arc<Jar>,
    redirect: Policy,
) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    match HeaderValue::from_str(&site.accept_language) {
        Ok(value) => {
            headers.insert(ACCEPT_LANGUAGE, value);
        }
        Err(_) => tracing::warn!(
            "Ignoring invalid accept-language '{}'",
            site.accept_language
        ),
    }

    Client::builder()
        .user_agent(site.user_agent.as_str())
        .default_headers(headers)
        .cookie_provider(jar)
        .timeout(crawler.request_timeout())
        .connect_timeout(Duration::from_secs(10))
        .redirect(redirect)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Performs one GET request
///
/// Any non-2xx status is an error.
pub async fn fetch_page(client: &Client, url: &Url) -> Result<FetchedPage, FetchError> {
    let response = client.get(url.clone()).send().await?;
    let status = response.status();

    if !status.is_success() {
        return Err(FetchError::Status {
            status_code: status.as_u16(),
        });
    }

    let final_url = response.url().clone();
    let body = response.text().await?;

    Ok(FetchedPage {
        final_url,
        body,
    })
}

/// Fetches a URL with retry logic
///
/// # Retry Logic
///
/// | Step | Action |
/// |------|--------|
/// | Before every attempt | Sleep `request_delay` |
/// | Transport error, timeout, non-2xx | Sleep `retry_backoff`, try again |
/// | Attempts exhausted | Log URL and last error, return `None` |
///
/// # Returns
///
/// The fetched page, or `None` when every attempt failed. Failure never
/// propagates as an error: callers treat it as the end of what can be fetched.
pub async fn fetch_with_retry(
    client: &Client,
    url: &Url,
    policy: &RetryPolicy,
) -> Option<FetchedPage> {
    retry_with_policy(url, policy, || fetch_page(client, url)).await
}

/// The retry loop of [`fetch_with_retry`], over any single-attempt future
async fn retry_with_policy<F, Fut>(
    url: &Url,
    policy: &RetryPolicy,
    mut attempt_fetch: F,
) -> Option<FetchedPage>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<FetchedPage, FetchError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        tokio::time::sleep(policy.request_delay).await;

        match attempt_fetch().await {
            Ok(page) => return Some(page),
            Err(e) => {
                tracing::debug!("Attempt {}/{} for {} failed: {}", attempt, attempts, url, e);
                last_error = Some(e);
            }
        }

        if attempt < attempts {
            tokio::time::sleep(policy.retry_backoff).await;
        }
    }

    if let Some(e) = last_error {
        tracing::error!("Request failed after {} attempts: {}, error: {}", attempts, url, e);
    }
    None
}
