//! Crawl engine - the generic fetch, extract, paginate loop
//!
//! The engine knows nothing about markup. It fetches a page, hands the
//! parsed document to an [`ExtractionStrategy`] for records and the next
//! page link, and repeats until the strategy reports no next page or a
//! fetch fails for good.

use crate::auth::is_login_url;
use crate::crawler::fetcher::{fetch_with_retry, RetryPolicy};
use crate::extract::ExtractionStrategy;
use crate::model::{Bucket, Record};
use reqwest::Client;
use scraper::Html;
use std::collections::HashSet;
use url::Url;

/// Records and pagination link extracted from one page
#[derive(Debug, Clone, Default)]
pub struct PageResult {
    pub records: Vec<Record>,
    pub next_url: Option<Url>,
}

/// Why a crawl stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlEnd {
    /// The last page had no next link
    Exhausted,

    /// A page could not be fetched within the retry budget
    FetchFailed { url: Url },

    /// The next link pointed back at a page already visited in this crawl
    Revisited { url: Url },

    /// A collection page redirected to the login page; the session is no
    /// longer signed in
    LoginRedirect { url: Url },
}

/// Outcome of one crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    /// Pages fetched and extracted
    pub pages: usize,
    /// Records appended by this crawl
    pub records: usize,
    pub end: CrawlEnd,
}

impl CrawlReport {
    /// True when every page of the collection was visited
    pub fn is_complete(&self) -> bool {
        matches!(self.end, CrawlEnd::Exhausted)
    }
}

/// Parses a page body and runs the strategy over it
///
/// The parsed document never outlives this call.
pub fn process_page(body: &str, strategy: &dyn ExtractionStrategy, bucket: Bucket) -> PageResult {
    let document = Html::parse_document(body);
    PageResult {
        records: strategy.extract_records(&document, bucket),
        next_url: strategy.next_page_url(&document),
    }
}

/// Sequential collection crawler over one HTTP session
pub struct CrawlEngine<'a> {
    client: &'a Client,
    policy: RetryPolicy,
}

impl<'a> CrawlEngine<'a> {
    pub fn new(client: &'a Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Crawls every page reachable from `start_url` and returns the records
    /// in page-visit order
    ///
    /// A fetch that fails after all retries ends the crawl early; whatever was
    /// collected up to that point is returned.
    pub async fn crawl(
        &self,
        start_url: Url,
        strategy: &dyn ExtractionStrategy,
        bucket: Bucket,
    ) -> Vec<Record> {
        let mut records = Vec::new();
        self.crawl_into(start_url, strategy, bucket, &mut records)
            .await;
        records
    }

    /// Same as [`crawl`](Self::crawl) but appends into `out` page by page, so
    /// records already collected stay with the caller even if this future is
    /// dropped mid-crawl
    ///
    /// # Loop
    ///
    /// 1. Fetch `current_url` with retry; on final failure stop
    /// 2. Stop if the fetch was redirected to the login page
    /// 3. Extract records, append them to `out`
    /// 4. Ask the strategy for the next page; stop when there is none
    /// 5. Stop if that page was already visited, else continue with it
    pub async fn crawl_into(
        &self,
        start_url: Url,
        strategy: &dyn ExtractionStrategy,
        bucket: Bucket,
        out: &mut Vec<Record>,
    ) -> CrawlReport {
        let mut visited: HashSet<Url> = HashSet::new();
        let mut current_url = start_url;
        let mut pages = 0;
        let mut records = 0;

        let end = loop {
            tracing::info!("Fetching {}", current_url);
            visited.insert(current_url.clone());

            let Some(fetched) = fetch_with_retry(self.client, &current_url, &self.policy).await
            else {
                tracing::warn!(
                    "Stopping {} '{}' early, keeping {} records",
                    strategy.media_type(),
                    bucket.code,
                    records
                );
                break CrawlEnd::FetchFailed { url: current_url };
            };

            if is_login_url(&fetched.final_url) {
                tracing::warn!(
                    "{} redirected to the login page {}, keeping {} records",
                    current_url,
                    fetched.final_url,
                    records
                );
                break CrawlEnd::LoginRedirect {
                    url: fetched.final_url,
                };
            }

            let page = process_page(&fetched.body, strategy, bucket);
            pages += 1;
            records += page.records.len();
            tracing::info!("  got {} records", page.records.len());
            out.extend(page.records);

            match page.next_url {
                None => break CrawlEnd::Exhausted,
                Some(next) if visited.contains(&next) => {
                    tracing::warn!("Next page {} was already visited, stopping", next);
                    break CrawlEnd::Revisited { url: next };
                }
                Some(next) => current_url = next,
            }
        };

        CrawlReport {
            pages,
            records,
            end,
        }
    }
}
