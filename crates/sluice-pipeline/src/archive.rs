//! Date-partitioned JSON snapshots of raw and cleaned records.
//!
//! Layout under the data directory:
//!
//! ```text
//! raw/2026-03-01/users.json
//! processed/2026-03-01/users.json
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("archive JSON error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid archive label {0:?}")]
    InvalidLabel(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveArea {
    Raw,
    Processed,
}

impl ArchiveArea {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ArchiveArea::Raw => "raw",
            ArchiveArea::Processed => "processed",
        }
    }
}

impl fmt::Display for ArchiveArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct FileArchive {
    data_dir: PathBuf,
}

impl FileArchive {
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Write `records` as pretty JSON to `raw/<date>/<label>.json`, replacing any
    /// earlier snapshot for the same day.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if the label is unsafe, serialization fails,
    /// or the file cannot be written.
    pub async fn save_raw<T>(
        &self,
        records: &T,
        label: &str,
        date: NaiveDate,
    ) -> Result<PathBuf, ArchiveError>
    where
        T: Serialize + ?Sized,
    {
        self.save(ArchiveArea::Raw, records, label, date).await
    }

    /// Write `records` as pretty JSON to `processed/<date>/<label>.json`.
    ///
    /// # Errors
    ///
    /// See [`FileArchive::save_raw`].
    pub async fn save_processed<T>(
        &self,
        records: &T,
        label: &str,
        date: NaiveDate,
    ) -> Result<PathBuf, ArchiveError>
    where
        T: Serialize + ?Sized,
    {
        self.save(ArchiveArea::Processed, records, label, date).await
    }

    /// Read back a raw snapshot. `Ok(None)` when no snapshot exists for that
    /// label and day.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if the file exists but cannot be read or
    /// parsed.
    pub async fn load_raw(
        &self,
        label: &str,
        date: NaiveDate,
    ) -> Result<Option<serde_json::Value>, ArchiveError> {
        let path = self.file_path(ArchiveArea::Raw, label, date)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(ArchiveError::Io { path, source }),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| ArchiveError::Json { path, source })
    }

    /// File names under `area`, or under one of its date partitions, sorted.
    /// A missing directory lists as empty.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Io`] if the directory cannot be read.
    pub async fn list_files(
        &self,
        area: ArchiveArea,
        date: Option<NaiveDate>,
    ) -> Result<Vec<String>, ArchiveError> {
        let mut dir = self.data_dir.join(area.as_str());
        if let Some(date) = date {
            dir.push(partition(date));
        }

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(ArchiveError::Io { path: dir, source }),
        };

        let mut names = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(source) => return Err(ArchiveError::Io { path: dir, source }),
            };
            let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
            if is_file {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn save<T>(
        &self,
        area: ArchiveArea,
        records: &T,
        label: &str,
        date: NaiveDate,
    ) -> Result<PathBuf, ArchiveError>
    where
        T: Serialize + ?Sized,
    {
        let path = self.file_path(area, label, date)?;
        let body = serde_json::to_vec_pretty(records).map_err(|source| ArchiveError::Json {
            path: path.clone(),
            source,
        })?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ArchiveError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(&path, body)
            .await
            .map_err(|source| ArchiveError::Io {
                path: path.clone(),
                source,
            })?;

        tracing::info!(area = %area, label, path = %path.display(), "archived snapshot");
        Ok(path)
    }

    fn file_path(
        &self,
        area: ArchiveArea,
        label: &str,
        date: NaiveDate,
    ) -> Result<PathBuf, ArchiveError> {
        if !is_safe_label(label) {
            return Err(ArchiveError::InvalidLabel(label.to_owned()));
        }
        Ok(self
            .data_dir
            .join(area.as_str())
            .join(partition(date))
            .join(format!("{label}.json")))
    }
}

fn partition(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn is_safe_label(label: &str) -> bool {
    !label.is_empty()
        && label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
}
