//! Collection orchestrator - one crawl per status bucket
//!
//! For a media type, builds the start URL of each of its three buckets,
//! runs the crawl engine with the type's extraction strategy, and files the
//! records under the bucket code. Buckets and media types are processed one
//! after another, never concurrently.

use crate::auth::Session;
use crate::config::{Config, SiteConfig};
use crate::crawler::engine::CrawlEngine;
use crate::crawler::fetcher::RetryPolicy;
use crate::extract::{strategy_for, ExtractionStrategy};
use crate::model::{count_records, BackupData, Bucket, BucketMap, MediaType};
use crate::Result;
use url::Url;

/// Builds the first collection page URL of `bucket`
///
/// # Templates
///
/// | Media | URL |
/// |-------|-----|
/// | movie | `{movie}/people/{user}/{bucket}` |
/// | book  | `{book}/people/{user}/{bucket}?start=0&type=book` |
/// | music | `{music}/people/{user}/{bucket}` |
/// | game  | `{www}/people/{user}/games?action={bucket}` |
pub fn start_url(
    site: &SiteConfig,
    media_type: MediaType,
    user_id: &str,
    bucket: Bucket,
) -> std::result::Result<Url, url::ParseError> {
    let host = site.host_for(media_type);
    let raw = match media_type {
        MediaType::Movie | MediaType::Music => {
            format!("{}/people/{}/{}", host, user_id, bucket.code)
        }
        MediaType::Book => format!(
            "{}/people/{}/{}?start=0&type=book",
            host, user_id, bucket.code
        ),
        MediaType::Game => format!("{}/people/{}/games?action={}", host, user_id, bucket.code),
    };
    Url::parse(&raw)
}

/// Runs bucket crawls for whole media types
pub struct Orchestrator<'a> {
    engine: CrawlEngine<'a>,
    site: &'a SiteConfig,
}

impl<'a> Orchestrator<'a> {
    pub fn new(engine: CrawlEngine<'a>, site: &'a SiteConfig) -> Self {
        Self { engine, site }
    }

    /// Crawls the three buckets of `media_type` for `user_id`
    ///
    /// # Returns
    ///
    /// * `Ok(BucketMap)` - One entry per bucket; empty buckets map to empty lists
    /// * `Err(BackupError)` - A start URL could not be built from the site config
    pub async fn crawl_all(&self, media_type: MediaType, user_id: &str) -> Result<BucketMap> {
        let mut buckets = BucketMap::new();
        self.crawl_all_into(media_type, user_id, &mut buckets)
            .await?;
        Ok(buckets)
    }

    /// Same as [`crawl_all`](Self::crawl_all), appending into `out` as pages
    /// come in
    pub async fn crawl_all_into(
        &self,
        media_type: MediaType,
        user_id: &str,
        out: &mut BucketMap,
    ) -> Result<()> {
        let strategy = strategy_for(media_type, self.site, user_id)?;
        self.crawl_buckets(strategy.as_ref(), user_id, out).await
    }

    async fn crawl_buckets(
        &self,
        strategy: &dyn ExtractionStrategy,
        user_id: &str,
        out: &mut BucketMap,
    ) -> Result<()> {
        let media_type = strategy.media_type();

        for bucket in media_type.buckets() {
            let url = start_url(self.site, media_type, user_id, *bucket)?;
            tracing::info!("Crawling {} '{}' ({})", media_type, bucket.code, bucket.label);

            let records = out.entry(bucket.code.to_string()).or_default();
            let report = self
                .engine
                .crawl_into(url, strategy, *bucket, records)
                .await;

            if report.is_complete() {
                tracing::info!(
                    "{} '{}': {} records from {} pages",
                    media_type,
                    bucket.code,
                    report.records,
                    report.pages
                );
            } else {
                tracing::warn!(
                    "{} '{}' incomplete ({:?}): {} records from {} pages",
                    media_type,
                    bucket.code,
                    report.end,
                    report.records,
                    report.pages
                );
            }
        }

        Ok(())
    }

    /// Crawls every media type in `media_types` into `data`, keyed by export key
    ///
    /// Records land in `data` as soon as each page is extracted, which is what
    /// lets an interrupted run save partial results.
    pub async fn backup(
        &self,
        media_types: &[MediaType],
        user_id: &str,
        data: &mut BackupData,
    ) -> Result<()> {
        for (index, media_type) in media_types.iter().enumerate() {
            tracing::info!(
                "[{}/{}] Backing up {}",
                index + 1,
                media_types.len(),
                media_type.export_key()
            );

            let buckets = data.entry(media_type.export_key().to_string()).or_default();
            self.crawl_all_into(*media_type, user_id, buckets).await?;

            tracing::info!(
                "Finished {}: {} records",
                media_type.export_key(),
                count_records(buckets)
            );
        }

        Ok(())
    }
}

/// Backs up another user's public collections without signing in
///
/// Runs every media type enabled in `config` over a fresh cookie-less
/// session. Like [`Orchestrator::backup`], records land in `data` page by
/// page.
pub async fn backup_public(
    config: &Config,
    user_id: &str,
    data: &mut BackupData,
) -> Result<()> {
    let session = Session::new(&config.site, &config.crawler)?;
    let engine = CrawlEngine::new(session.client(), RetryPolicy::from(&config.crawler));
    let orchestrator = Orchestrator::new(engine, &config.site);

    tracing::info!("Backing up public collections of {}", user_id);
    orchestrator
        .backup(&config.backup.media_types(), user_id, data)
        .await
}
