//! Configuration module for Douban-Backup
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; missing keys fall back to the defaults the tool
//! was tuned with (2s between requests, 3 attempts, 30s request timeout).
//!
//! # Example
//!
//! ```no_run
//! use douban_backup::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("douban-backup.toml")).unwrap();
//! println!("Requests are spaced by {}ms", config.crawler.request_delay_ms);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{BackupSelection, Config, CrawlerConfig, OutputConfig, SiteConfig};

// Re-export parser functions
pub use parser::{load_config, load_config_or_default};
pub use validation::validate;
