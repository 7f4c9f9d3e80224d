//! Cookie persistence and browser cookie import
//!
//! Cookies are stored as one flat JSON object mapping cookie name to value,
//! read and written whole.

use crate::auth::session::cookie_jar;
use crate::auth::AuthError;
use crate::config::{CrawlerConfig, SiteConfig};
use crate::crawler::build_http_client;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use std::collections::BTreeMap;
use std::path::Path;
use url::Url;

/// Cookie name to value
pub type CookieMap = BTreeMap<String, String>;

/// Parses a `Cookie` request header as copied from browser dev tools
///
/// Pairs are separated by `;` and split at the first `=`. Fragments without
/// `=` are ignored.
///
/// # Example
///
/// ```
/// use douban_backup::auth::parse_cookie_header;
///
/// let cookies = parse_cookie_header("bid=abc; ck=x=y; junk");
/// assert_eq!(cookies["bid"], "abc");
/// assert_eq!(cookies["ck"], "x=y");
/// assert_eq!(cookies.len(), 2);
/// ```
pub fn parse_cookie_header(header: &str) -> CookieMap {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Reads a saved cookie file
///
/// # Returns
///
/// * `Ok(Some(CookieMap))` - File exists and parsed
/// * `Ok(None)` - No cookie file saved yet
/// * `Err(AuthError)` - File unreadable or not a flat JSON object
pub fn load_cookie_file(path: &Path) -> Result<Option<CookieMap>, AuthError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path).map_err(|source| AuthError::File {
        path: path.display().to_string(),
        source,
    })?;
    let cookies = serde_json::from_str(&content).map_err(|source| AuthError::Json {
        path: path.display().to_string(),
        source,
    })?;

    Ok(Some(cookies))
}

/// Writes `cookies` to `path`, creating the parent directory when needed
pub fn save_cookie_file(path: &Path, cookies: &CookieMap) -> Result<(), AuthError> {
    let file_error = |source| AuthError::File {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(file_error)?;
    }

    let json = serde_json::to_string(cookies).map_err(|source| AuthError::Json {
        path: path.display().to_string(),
        source,
    })?;
    std::fs::write(path, json).map_err(file_error)?;

    tracing::info!("Saved {} cookies to {}", cookies.len(), path.display());
    Ok(())
}

/// Checks whether imported cookies grant access to the account
///
/// Requests the "my profile" page without following redirects: a 200, or a
/// redirect anywhere except the login page, means the cookies are live.
/// Network errors count as invalid.
pub async fn verify_cookies(site: &SiteConfig, crawler: &CrawlerConfig, cookies: &CookieMap) -> bool {
    let (jar, mine) = match cookie_jar(site, cookies)
        .and_then(|jar| Ok((jar, Url::parse(site.www())?.join("/mine/")?)))
    {
        Ok(parts) => parts,
        Err(e) => {
            tracing::error!("Invalid site URL: {}", e);
            return false;
        }
    };

    let client = match build_http_client(site, crawler, jar, Policy::none()) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Cannot build HTTP client: {}", e);
            return false;
        }
    };

    let response = match client.get(mine).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Cookie verification request failed: {}", e);
            return false;
        }
    };

    match response.status() {
        StatusCode::OK => true,
        StatusCode::FOUND => {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            !location.contains("accounts/login")
        }
        status => {
            tracing::debug!("Cookie verification got HTTP {}", status);
            false
        }
    }
}
