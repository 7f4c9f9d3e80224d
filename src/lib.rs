//! Douban-Backup: a personal export tool for Douban collections
//!
//! This crate signs in as a Douban user, walks that user's paginated
//! movie, book, music and game collections bucket by bucket, extracts one
//! record per tracked item and writes the result as JSON and CSV exports.

pub mod auth;
pub mod config;
pub mod crawler;
pub mod extract;
pub mod model;
pub mod output;

use thiserror::Error;

pub use auth::AuthError;
pub use output::StorageError;

/// Main error type for Douban-Backup operations
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Douban-Backup operations
pub type Result<T> = std::result::Result<T, BackupError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlEngine, Orchestrator};
pub use extract::ExtractionStrategy;
pub use model::{BackupData, Bucket, BucketMap, MediaType, Record};
