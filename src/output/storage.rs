use crate::model::{BackupData, BucketMap, MediaType};
use crate::output::tabular::write_csv;
use crate::output::{StorageError, StorageResult};
use chrono::{DateTime, Local};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Files written for one backup
#[derive(Debug, Clone)]
pub struct SavedBackup {
    pub json: PathBuf,
    /// `None` when there were no records to tabulate
    pub csv: Option<PathBuf>,
}

/// An existing file in the backup directory
#[derive(Debug, Clone)]
pub struct BackupFile {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified: DateTime<Local>,
}

/// File stem of a full backup taken at `at`
///
/// # Example
///
/// ```
/// use chrono::{Local, TimeZone};
/// use douban_backup::output::backup_stem;
///
/// let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 0).unwrap();
/// assert_eq!(backup_stem(&at, false), "douban_backup_20240309_070500");
/// assert_eq!(backup_stem(&at, true), "douban_backup_interrupted_20240309_070500");
/// ```
pub fn backup_stem(at: &DateTime<Local>, interrupted: bool) -> String {
    let timestamp = at.format("%Y%m%d_%H%M%S");
    if interrupted {
        format!("douban_backup_interrupted_{}", timestamp)
    } else {
        format!("douban_backup_{}", timestamp)
    }
}

/// The backup directory and everything written into it
pub struct BackupStorage {
    dir: PathBuf,
}

impl BackupStorage {
    /// Opens `dir`, creating it when missing
    pub fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `data` as pretty-printed UTF-8 JSON to `<stem>.json`
    pub fn save_json<T: serde::Serialize + ?Sized>(
        &self,
        data: &T,
        stem: &str,
    ) -> StorageResult<PathBuf> {
        let path = self.dir.join(format!("{}.json", stem));
        let file = File::create(&path).map_err(|e| StorageError::io(&path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, data)?;
        writer.flush().map_err(|e| StorageError::io(&path, e))?;

        tracing::info!("Saved {}", path.display());
        Ok(path)
    }

    /// Writes `data` as one CSV row per record to `<stem>.csv`
    ///
    /// # Returns
    ///
    /// * `Ok(Some(path))` - File written
    /// * `Ok(None)` - No records, no file
    /// * `Err(StorageError)` - Write failure
    pub fn save_tabular(&self, data: &BackupData, stem: &str) -> StorageResult<Option<PathBuf>> {
        let mut buffer = Vec::new();
        let rows = write_csv(data, &mut buffer)?;
        if rows == 0 {
            tracing::info!("No records to tabulate, skipping {}.csv", stem);
            return Ok(None);
        }

        let path = self.dir.join(format!("{}.csv", stem));
        std::fs::write(&path, buffer).map_err(|e| StorageError::io(&path, e))?;

        tracing::info!("Saved {} rows to {}", rows, path.display());
        Ok(Some(path))
    }

    /// Saves a complete backup under a timestamped name
    pub fn save_all(&self, data: &BackupData) -> StorageResult<SavedBackup> {
        self.save_both(data, &backup_stem(&Local::now(), false))
    }

    /// Saves whatever was collected before the run was interrupted
    pub fn save_interrupted(&self, data: &BackupData) -> StorageResult<SavedBackup> {
        self.save_both(data, &backup_stem(&Local::now(), true))
    }

    /// Saves a single media type to `<key>.json` and `<key>.csv`
    pub fn save_media(
        &self,
        media_type: MediaType,
        buckets: &BucketMap,
    ) -> StorageResult<SavedBackup> {
        let key = media_type.export_key();
        let json = self.save_json(buckets, key)?;

        let mut data = BackupData::new();
        data.insert(key.to_string(), buckets.clone());
        let csv = self.save_tabular(&data, key)?;

        Ok(SavedBackup { json, csv })
    }

    /// Backup files in the directory, newest first
    pub fn list_backups(&self) -> StorageResult<Vec<BackupFile>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| StorageError::io(&self.dir, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(&self.dir, e))?;
            let path = entry.path();

            let is_export = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map_or(false, |ext| ext == "json" || ext == "csv");
            if !is_export {
                continue;
            }

            let metadata = entry.metadata().map_err(|e| StorageError::io(&path, e))?;
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata
                .modified()
                .map_err(|e| StorageError::io(&path, e))?;

            files.push(BackupFile {
                name: entry.file_name().to_string_lossy().into_owned(),
                path,
                size: metadata.len(),
                modified: DateTime::<Local>::from(modified),
            });
        }

        files.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));
        Ok(files)
    }

    fn save_both(&self, data: &BackupData, stem: &str) -> StorageResult<SavedBackup> {
        let json = self.save_json(data, stem)?;
        let csv = self.save_tabular(data, stem)?;
        Ok(SavedBackup { json, csv })
    }
}
