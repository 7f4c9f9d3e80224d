//! Record counts of a finished backup
//!
//! This module counts records per media type and bucket and prints the
//! summary shown at the end of a run.

use crate::model::{count_records, BackupData, MediaType};
use std::path::Path;

/// Counts for one media type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSummary {
    /// Export key, e.g. `movies`
    pub key: String,

    /// Records across all buckets
    pub total: usize,

    /// `(bucket code, count)` in crawl order
    pub buckets: Vec<(String, usize)>,
}

/// Counts for a whole backup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupSummary {
    pub media: Vec<MediaSummary>,
    pub total: usize,
}

impl BackupSummary {
    pub fn from_data(data: &BackupData) -> Self {
        let media: Vec<MediaSummary> = data
            .iter()
            .map(|(key, buckets)| MediaSummary {
                key: key.clone(),
                total: count_records(buckets),
                buckets: buckets
                    .iter()
                    .map(|(code, records)| (code.clone(), records.len()))
                    .collect(),
            })
            .collect();
        let total = media.iter().map(|m| m.total).sum();

        Self { media, total }
    }
}

/// Prints per media type record counts and where the files went
///
/// # Arguments
///
/// * `data` - The collected backup
/// * `backup_dir` - Directory the exports were written to
pub fn print_summary(data: &BackupData, backup_dir: &Path) {
    let summary = BackupSummary::from_data(data);

    println!("=== Backup Summary ===\n");

    for media in &summary.media {
        let media_type = MediaType::from_export_key(&media.key);
        println!("{}: {}", media.key, media.total);

        for (code, count) in &media.buckets {
            let label = media_type
                .and_then(|m| m.bucket(code))
                .map(|b| b.label)
                .unwrap_or(code.as_str());
            println!("  {} ({}): {}", label, code, count);
        }
    }
    println!();

    println!("Total records: {}", summary.total);
    println!("Files saved to {}", backup_dir.display());
}
