//! Session provider - signs in and hands over the authenticated session

use crate::auth::cookies::{load_cookie_file, save_cookie_file};
use crate::auth::session::{is_login_url, Session};
use crate::auth::user_info::{
    load_user_info, parse_user_id, parse_user_name, save_user_info, UserInfo,
};
use crate::auth::AuthError;
use crate::config::Config;
use serde::Deserialize;
use std::path::PathBuf;
use url::Url;

#[derive(Debug, Deserialize)]
struct CaptchaId {
    id: Option<String>,
}

/// Produces the authenticated session used by the crawl
///
/// Cookies and user info are persisted under the configured data directory
/// so later runs can skip the form login.
pub struct SessionProvider {
    session: Session,
    cookies_path: PathBuf,
    user_info_path: PathBuf,
}

impl SessionProvider {
    pub fn new(config: &Config) -> Result<Self, AuthError> {
        Ok(Self {
            session: Session::new(&config.site, &config.crawler)?,
            cookies_path: config.output.cookies_path(),
            user_info_path: config.output.user_info_path(),
        })
    }

    /// Signs in with the saved cookie file
    ///
    /// # Returns
    ///
    /// * `Ok(Some(UserInfo))` - Cookies are live and the account is known
    /// * `Ok(None)` - No cookie file, or the cookies no longer sign in
    /// * `Err(AuthError)` - Cookie file unreadable, or the user id is unknown
    pub async fn login_with_cookies(&self) -> Result<Option<UserInfo>, AuthError> {
        let Some(cookies) = load_cookie_file(&self.cookies_path)? else {
            tracing::info!("No saved cookies at {}", self.cookies_path.display());
            return Ok(None);
        };
        self.session.load_cookies(&cookies);

        let response = match self
            .session
            .client()
            .get(self.session.www_url("/people/")?)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Cookie login check failed: {}", e);
                return Ok(None);
            }
        };

        if is_login_url(response.url()) {
            tracing::warn!("Saved cookies have expired");
            return Ok(None);
        }

        tracing::info!("Signed in with saved cookies");
        self.refresh_user_info().await.map(Some)
    }

    /// Signs in by posting the login form
    ///
    /// Fails with [`AuthError::LoginRejected`] when the site answers with a
    /// captcha challenge or any page other than the home page or a profile.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserInfo, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        let client = self.session.client();

        // Primes bid and ll cookies
        client
            .get(self.session.www_url("/people/")?)
            .send()
            .await?;

        let captcha_id = self.fetch_captcha_id().await;
        let redir = self.session.www_url("/")?.to_string();

        let mut form = vec![
            ("ck", String::new()),
            ("remember", "on".to_string()),
            ("redir", redir),
            ("form_email", email.to_string()),
            ("form_password", password.to_string()),
        ];
        if let Some(id) = captcha_id {
            form.push(("captcha_id", id));
        }

        let response = client
            .post(self.session.www_url("/accounts/login")?)
            .form(&form)
            .send()
            .await?;

        let final_url = response.url().clone();
        if !is_signed_in_url(&final_url) {
            tracing::warn!("Login ended at {}", final_url);
            return Err(AuthError::LoginRejected {
                final_url: final_url.to_string(),
            });
        }

        tracing::info!("Login succeeded");
        save_cookie_file(&self.cookies_path, &self.session.cookies())?;
        self.refresh_user_info().await
    }

    /// Looks up the signed-in account through the "my profile" redirect
    ///
    /// Falls back to the saved user info file when the redirect does not
    /// reveal an id.
    pub async fn refresh_user_info(&self) -> Result<UserInfo, AuthError> {
        let response = self
            .session
            .client()
            .get(self.session.www_url("/mine/")?)
            .send()
            .await?;
        let final_url = response.url().clone();

        let Some(id) = parse_user_id(&final_url) else {
            tracing::warn!("Profile redirect ended at {} without a user id", final_url);
            return match load_user_info(&self.user_info_path)? {
                Some(info) => {
                    tracing::info!("Using saved user info for {}", info.id);
                    Ok(info)
                }
                None => Err(AuthError::NoUserId),
            };
        };

        let body = response.text().await?;
        let info = UserInfo {
            id,
            name: parse_user_name(&body),
        };

        tracing::info!(
            "Signed in as {} ({})",
            info.name.as_deref().unwrap_or("unnamed"),
            info.id
        );
        save_user_info(&self.user_info_path, &info)?;
        Ok(info)
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    async fn fetch_captcha_id(&self) -> Option<String> {
        let url = self.session.www_url("/misc/id?type=login").ok()?;
        let result = async {
            self.session
                .client()
                .get(url)
                .send()
                .await?
                .json::<CaptchaId>()
                .await
        }
        .await;

        match result {
            Ok(captcha) => captcha.id,
            Err(e) => {
                tracing::debug!("No captcha id: {}", e);
                None
            }
        }
    }
}

/// Form login lands on the home page or a profile page when it succeeds
fn is_signed_in_url(url: &Url) -> bool {
    url.path() == "/" || url.path().contains("/people")
}
