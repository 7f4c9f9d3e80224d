//! Authentication and session handoff
//!
//! This module produces the one authenticated HTTP session a run uses:
//! - `Session`: HTTP client plus the cookie jar it reads and writes
//! - `SessionProvider`: signs in from saved cookies or a login form post
//! - cookie file import/export and browser cookie-header parsing
//! - user id/name discovery through the "my profile" redirect
//!
//! Captchas are not solved. The form login forwards a captcha id when the
//! site hands one out and fails whenever an interactive captcha is required;
//! importing browser cookies is the dependable path.

mod cookies;
mod provider;
mod session;
mod user_info;

pub use cookies::{
    load_cookie_file, parse_cookie_header, save_cookie_file, verify_cookies, CookieMap,
};
pub use provider::SessionProvider;
pub use session::{cookie_jar, is_login_url, Session};
pub use user_info::{load_user_info, parse_user_id, parse_user_name, save_user_info, UserInfo};

use thiserror::Error;

/// Authentication-specific errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("email and password are both required")]
    MissingCredentials,

    #[error("login was not accepted (ended at {final_url})")]
    LoginRejected { final_url: String },

    #[error("signed in, but the user id could not be determined")]
    NoUserId,

    #[error("HTTP error during sign-in: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid site URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("failed to read or write {path}: {source}")]
    File {
        path: String,
        source: std::io::Error,
    },

    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}
