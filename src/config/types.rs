use crate::model::MediaType;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Douban-Backup
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub site: SiteConfig,
    pub output: OutputConfig,
    pub backup: BackupSelection,
}

/// Request pacing and retry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Sleep before every request attempt (milliseconds)
    #[serde(rename = "request-delay-ms")]
    pub request_delay_ms: u64,

    /// Additional sleep after a failed attempt (milliseconds)
    #[serde(rename = "retry-backoff-ms")]
    pub retry_backoff_ms: u64,

    /// Maximum number of attempts per URL
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: 2000,
            retry_backoff_ms: 2000,
            max_retries: 3,
            request_timeout_secs: 30,
        }
    }
}

impl CrawlerConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Site endpoints and the browser identity sent with every request
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Main site, hosting accounts, profiles and game collections
    #[serde(rename = "www-url")]
    pub www_url: String,

    #[serde(rename = "movie-url")]
    pub movie_url: String,

    #[serde(rename = "book-url")]
    pub book_url: String,

    #[serde(rename = "music-url")]
    pub music_url: String,

    #[serde(rename = "user-agent")]
    pub user_agent: String,

    #[serde(rename = "accept-language")]
    pub accept_language: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            www_url: "https://www.douban.com".to_string(),
            movie_url: "https://movie.douban.com".to_string(),
            book_url: "https://book.douban.com".to_string(),
            music_url: "https://music.douban.com".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            accept_language: "zh-CN,zh;q=0.9,en;q=0.8".to_string(),
        }
    }
}

impl SiteConfig {
    /// Returns the configured base URL for the host that serves `media_type`
    /// collections. Games live on the main site.
    pub fn host_for(&self, media_type: MediaType) -> &str {
        let host = match media_type {
            MediaType::Movie => &self.movie_url,
            MediaType::Book => &self.book_url,
            MediaType::Music => &self.music_url,
            MediaType::Game => &self.www_url,
        };
        host.trim_end_matches('/')
    }

    /// Main site base URL without a trailing slash
    pub fn www(&self) -> &str {
        self.www_url.trim_end_matches('/')
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory holding cookies, user info and the `backup/` exports
    #[serde(rename = "data-dir")]
    pub data_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn cookies_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("cookies.json")
    }

    pub fn user_info_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("user_info.json")
    }

    pub fn backup_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("backup")
    }
}

/// Which media types a full backup covers
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackupSelection {
    pub movies: bool,
    pub books: bool,
    pub music: bool,
    pub games: bool,
}

impl Default for BackupSelection {
    fn default() -> Self {
        Self {
            movies: true,
            books: true,
            music: true,
            games: true,
        }
    }
}

impl BackupSelection {
    /// Enabled media types in backup order
    pub fn media_types(&self) -> Vec<MediaType> {
        MediaType::ALL
            .into_iter()
            .filter(|media_type| match media_type {
                MediaType::Movie => self.movies,
                MediaType::Book => self.books,
                MediaType::Music => self.music,
                MediaType::Game => self.games,
            })
            .collect()
    }
}
