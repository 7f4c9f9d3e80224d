//! Data model for exported collections
//!
//! # Components
//!
//! - `MediaType`: the four collection kinds (movie, book, music, game)
//! - `Bucket`: a status bucket within a media type (wish / collect / in progress)
//! - `Record`: one tracked item as extracted from a collection page

mod media;
mod record;

use indexmap::IndexMap;

// Re-export main types
pub use media::{Bucket, MediaType};
pub use record::Record;

/// Records of one media type, keyed by bucket code in crawl order
/// (`wish`, `collect`, then the in-progress bucket)
pub type BucketMap = IndexMap<String, Vec<Record>>;

/// A whole backup, keyed by media export key in backup order
/// (`movies`, `books`, `music`, `games`)
pub type BackupData = IndexMap<String, BucketMap>;

/// Total number of records across every bucket of `buckets`
pub fn count_records(buckets: &BucketMap) -> usize {
    buckets.values().map(Vec::len).sum()
}
