//! Flat one-row-per-record export
//!
//! Rows carry the media export key as `category` and the bucket code as
//! `collection`. Type-specific columns are only written when at least one
//! row has a value for them.

use crate::model::{BackupData, Record};
use crate::output::StorageResult;
use std::io::Write;

/// Every column in output order
pub const TABULAR_COLUMNS: [&str; 13] = [
    "category",
    "collection",
    "type",
    "title",
    "douban_id",
    "rating",
    "comment",
    "author",
    "artist",
    "date",
    "cover",
    "info",
    "tags",
];

const OPTIONAL_COLUMNS: [&str; 4] = ["author", "artist", "info", "tags"];

struct Row<'a> {
    category: &'a str,
    bucket_code: &'a str,
    record: &'a Record,
}

impl Row<'_> {
    fn cell(&self, column: &str) -> &str {
        let record = self.record;
        match column {
            "category" => self.category,
            "collection" => self.bucket_code,
            "type" => record.media_type.as_str(),
            "title" => &record.title,
            "douban_id" => &record.external_id,
            "rating" => &record.rating,
            "comment" => &record.comment,
            "author" => record.author.as_deref().unwrap_or_default(),
            "artist" => record.artist.as_deref().unwrap_or_default(),
            "date" => &record.date,
            "cover" => &record.cover_url,
            "info" => record.info.as_deref().unwrap_or_default(),
            "tags" => record.tags.as_deref().unwrap_or_default(),
            _ => "",
        }
    }

    fn has(&self, column: &str) -> bool {
        let record = self.record;
        match column {
            "author" => record.author.is_some(),
            "artist" => record.artist.is_some(),
            "info" => record.info.is_some(),
            "tags" => record.tags.is_some(),
            _ => true,
        }
    }
}

fn rows(data: &BackupData) -> Vec<Row<'_>> {
    data.iter()
        .flat_map(|(category, buckets)| {
            buckets.iter().flat_map(move |(code, records)| {
                records.iter().map(move |record| Row {
                    category,
                    bucket_code: code,
                    record,
                })
            })
        })
        .collect()
}

/// Columns written for `data`: the fixed order minus optional columns no
/// record fills
pub fn columns_for(data: &BackupData) -> Vec<&'static str> {
    let rows = rows(data);
    TABULAR_COLUMNS
        .into_iter()
        .filter(|column| {
            !OPTIONAL_COLUMNS.contains(column) || rows.iter().any(|row| row.has(column))
        })
        .collect()
}

/// Writes `data` as CSV to `writer`
///
/// # Returns
///
/// * `Ok(usize)` - Number of rows written; nothing is written for zero rows
/// * `Err(StorageError)` - Encoding or IO failure
pub fn write_csv<W: Write>(data: &BackupData, writer: W) -> StorageResult<usize> {
    let rows = rows(data);
    if rows.is_empty() {
        return Ok(0);
    }

    let columns = columns_for(data);
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(&columns)?;
    for row in &rows {
        csv.write_record(columns.iter().map(|column| row.cell(column)))?;
    }
    csv.flush().map_err(csv::Error::from)?;

    Ok(rows.len())
}
