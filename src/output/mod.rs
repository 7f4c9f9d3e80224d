//! Output module for writing backups and reporting on them
//!
//! This module handles:
//! - Writing backups as JSON and CSV under the backup directory
//! - Listing earlier backup files
//! - Printing per media type record counts after a run

mod storage;
pub mod stats;
mod tabular;

pub use stats::{print_summary, BackupSummary, MediaSummary};
pub use storage::{backup_stem, BackupFile, BackupStorage, SavedBackup};
pub use tabular::{columns_for, write_csv, TABULAR_COLUMNS};

use thiserror::Error;

/// Errors that can occur while writing or listing backups
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
}

impl StorageError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
