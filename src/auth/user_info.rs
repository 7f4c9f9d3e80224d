use crate::auth::AuthError;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use url::Url;

/// The signed-in account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Profile slug or numeric id, as used in `/people/<id>/` URLs
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

static PEOPLE_RE: OnceLock<Regex> = OnceLock::new();

/// Extracts the user id from a profile URL such as `/people/alice/`
///
/// # Example
///
/// ```
/// use douban_backup::auth::parse_user_id;
/// use url::Url;
///
/// let url = Url::parse("https://www.douban.com/people/alice/").unwrap();
/// assert_eq!(parse_user_id(&url).as_deref(), Some("alice"));
/// ```
pub fn parse_user_id(url: &Url) -> Option<String> {
    let re = PEOPLE_RE.get_or_init(|| Regex::new(r"people/([^/]+)/").unwrap());
    re.captures(url.as_str())
        .map(|caps| caps[1].to_string())
}

/// Display name on a profile page: `div.info h1`, else the first `span.pl`
pub fn parse_user_name(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    ["div.info h1", "span.pl"].iter().find_map(|css| {
        let selector = Selector::parse(css).ok()?;
        let element = document.select(&selector).next()?;
        let name = element
            .text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        (!name.is_empty()).then_some(name)
    })
}

pub fn load_user_info(path: &Path) -> Result<Option<UserInfo>, AuthError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path).map_err(|source| AuthError::File {
        path: path.display().to_string(),
        source,
    })?;
    let info = serde_json::from_str(&content).map_err(|source| AuthError::Json {
        path: path.display().to_string(),
        source,
    })?;

    Ok(Some(info))
}

pub fn save_user_info(path: &Path, info: &UserInfo) -> Result<(), AuthError> {
    let file_error = |source| AuthError::File {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(file_error)?;
    }

    let json = serde_json::to_string_pretty(info).map_err(|source| AuthError::Json {
        path: path.display().to_string(),
        source,
    })?;
    std::fs::write(path, json).map_err(file_error)
}
