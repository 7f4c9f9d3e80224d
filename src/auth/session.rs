use crate::auth::cookies::{parse_cookie_header, CookieMap};
use crate::config::{CrawlerConfig, SiteConfig};
use crate::crawler::build_http_client;
use crate::model::MediaType;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::redirect::Policy;
use reqwest::Client;
use std::sync::Arc;
use url::Url;

/// One authenticated HTTP session
///
/// Owns the client used for every request of a run together with its cookie
/// jar. Only the session provider writes cookies; the crawl engine borrows
/// the client read-only.
pub struct Session {
    client: Client,
    jar: Arc<Jar>,
    www: Url,
    cookie_urls: Vec<Url>,
}

impl Session {
    /// Creates an unauthenticated session following redirects
    pub fn new(site: &SiteConfig, crawler: &CrawlerConfig) -> Result<Self, crate::AuthError> {
        let jar = Arc::new(Jar::default());
        let client = build_http_client(site, crawler, jar.clone(), Policy::default())?;
        let cookie_urls = cookie_urls(site)?;

        Ok(Self {
            client,
            jar,
            www: cookie_urls[0].clone(),
            cookie_urls,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Main site URL with `path` appended
    pub fn www_url(&self, path: &str) -> Result<Url, url::ParseError> {
        self.www.join(path)
    }

    /// Adds name/value cookies as host cookies of every configured site host
    pub fn load_cookies(&self, cookies: &CookieMap) {
        add_host_cookies(&self.jar, &self.cookie_urls, cookies);
    }

    /// Cookies the jar would send to the main site, as a flat map
    pub fn cookies(&self) -> CookieMap {
        self.jar
            .cookies(&self.www)
            .and_then(|header| header.to_str().ok().map(parse_cookie_header))
            .unwrap_or_default()
    }
}

/// A standalone jar holding `cookies` for every configured site host
///
/// For clients that need the cookies but not a [`Session`], such as the
/// no-redirect client that verifies imported cookies.
pub fn cookie_jar(
    site: &SiteConfig,
    cookies: &CookieMap,
) -> Result<Arc<Jar>, url::ParseError> {
    let jar = Arc::new(Jar::default());
    add_host_cookies(&jar, &cookie_urls(site)?, cookies);
    Ok(jar)
}

/// Main site first, then every other host the backup talks to
fn cookie_urls(site: &SiteConfig) -> Result<Vec<Url>, url::ParseError> {
    let mut urls = vec![Url::parse(site.www())?];
    for media_type in MediaType::ALL {
        let url = Url::parse(site.host_for(media_type))?;
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    Ok(urls)
}

fn add_host_cookies(jar: &Jar, urls: &[Url], cookies: &CookieMap) {
    for url in urls {
        for (name, value) in cookies {
            jar.add_cookie_str(&format!("{}={}; Path=/", name, value), url);
        }
    }
}

/// True when `url` is one of the site's login pages
pub fn is_login_url(url: &Url) -> bool {
    let path = url.path();
    path.starts_with("/accounts/login") || path.starts_with("/passport/login")
}
