//! Crawler module for collection fetching and pagination
//!
//! This module contains the core crawling logic, including:
//! - HTTP client construction and fetching with retry/backoff
//! - The generic fetch-extract-paginate loop shared by every media type
//! - Per-media-type orchestration across status buckets
//!
//! Everything here is strictly sequential: one request in flight, a fixed
//! delay before each attempt, and a fixed backoff after each failed one.

mod engine;
mod fetcher;
mod orchestrator;

pub use engine::{process_page, CrawlEnd, CrawlEngine, CrawlReport, PageResult};
pub use fetcher::{
    build_http_client, fetch_page, fetch_with_retry, FetchError, FetchedPage, RetryPolicy,
};
pub use orchestrator::{backup_public, start_url, Orchestrator};
