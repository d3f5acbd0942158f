//! Rendering analytics reports to files, and managing the files afterwards.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sluice_core::AnalyticsReport;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

const FILE_PREFIX: &str = "analytics";
const SUMMARY_HEADER: [&str; 6] = [
    "generated_at",
    "total_users",
    "total_posts",
    "total_comments",
    "average_posts_per_user",
    "most_active_user",
];
const ENGAGEMENT_HEADER: [&str; 3] = ["title", "comment_count", "author"];

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("report JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("report CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("unsupported report format {0:?}; expected json or csv")]
    UnsupportedFormat(String),

    #[error("invalid report file name {0:?}")]
    InvalidFilename(String),

    #[error("report not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Json,
    Csv,
}

impl ReportFormat {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Csv => "csv",
        }
    }

    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            ReportFormat::Json => "application/json",
            ReportFormat::Csv => "text/csv",
        }
    }

    fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        ext.parse().ok()
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ReportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "csv" => Ok(ReportFormat::Csv),
            _ => Err(ReportError::UnsupportedFormat(s.to_owned())),
        }
    }
}

/// A rendered report file as listed by [`ReportRenderer::list_reports`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportFile {
    pub filename: String,
    pub format: ReportFormat,
    pub size_bytes: u64,
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct ReportRenderer {
    reports_dir: PathBuf,
}

impl ReportRenderer {
    #[must_use]
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
        }
    }

    #[must_use]
    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    /// Write `report` to `analytics_<YYYY-MM-DD_HH-MM-SS-mmm>.<ext>`, stamped
    /// with the report's `generated_at`. An existing file is never replaced:
    /// a clashing name gets a `_1`, `_2`, ... suffix. Returns the written path.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] if encoding or writing fails.
    pub async fn render(
        &self,
        report: &AnalyticsReport,
        format: ReportFormat,
    ) -> Result<PathBuf, ReportError> {
        let body = match format {
            ReportFormat::Json => serde_json::to_vec_pretty(report)?,
            ReportFormat::Csv => render_csv(report)?,
        };

        tokio::fs::create_dir_all(&self.reports_dir)
            .await
            .map_err(|source| ReportError::Io {
                path: self.reports_dir.clone(),
                source,
            })?;

        let stamp = report
            .generated_at
            .format("%Y-%m-%d_%H-%M-%S-%3f")
            .to_string();
        let mut attempt = 0u32;
        let path = loop {
            let filename = if attempt == 0 {
                format!("{FILE_PREFIX}_{stamp}.{}", format.extension())
            } else {
                format!("{FILE_PREFIX}_{stamp}_{attempt}.{}", format.extension())
            };
            let path = self.reports_dir.join(filename);
            match write_new(&path, &body).await {
                Ok(()) => break path,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
                Err(source) => return Err(ReportError::Io { path, source }),
            }
        };

        tracing::info!(%format, path = %path.display(), "rendered analytics report");
        Ok(path)
    }

    /// Rendered reports, newest first. A missing directory lists as empty.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Io`] if the directory cannot be read.
    pub async fn list_reports(&self) -> Result<Vec<ReportFile>, ReportError> {
        let io_err = |source| ReportError::Io {
            path: self.reports_dir.clone(),
            source,
        };

        let mut entries = match tokio::fs::read_dir(&self.reports_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_err(e)),
        };

        let mut reports = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let filename = entry.file_name().to_string_lossy().into_owned();
            let Some(format) = ReportFormat::from_filename(&filename) else {
                continue;
            };
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            reports.push(ReportFile {
                filename,
                format,
                size_bytes: metadata.len(),
                modified_at: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }

        // Timestamped names sort chronologically.
        reports.sort_by(|a, b| b.filename.cmp(&a.filename));
        Ok(reports)
    }

    /// Contents and format of one rendered report.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::InvalidFilename`] for names that could escape
    /// the reports directory, or [`ReportError::NotFound`] if it does not
    /// exist.
    pub async fn read_report(
        &self,
        filename: &str,
    ) -> Result<(ReportFormat, Vec<u8>), ReportError> {
        let (path, format) = self.resolve(filename)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok((format, bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ReportError::NotFound(filename.to_owned()))
            }
            Err(source) => Err(ReportError::Io { path, source }),
        }
    }

    /// Remove one rendered report. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::InvalidFilename`] for unsafe names, or
    /// [`ReportError::Io`] if removal fails.
    pub async fn delete_report(&self, filename: &str) -> Result<bool, ReportError> {
        let (path, _) = self.resolve(filename)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(filename, "deleted report");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(ReportError::Io { path, source }),
        }
    }

    fn resolve(&self, filename: &str) -> Result<(PathBuf, ReportFormat), ReportError> {
        let invalid = || ReportError::InvalidFilename(filename.to_owned());
        if filename.is_empty()
            || filename.contains("..")
            || filename.contains('/')
            || filename.contains('\\')
        {
            return Err(invalid());
        }
        let format = ReportFormat::from_filename(filename).ok_or_else(invalid)?;
        Ok((self.reports_dir.join(filename), format))
    }
}

async fn write_new(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(body).await?;
    file.flush().await
}

/// Two CSV sections, each preceded by a `#` title line: a one-row summary and
/// the engagement ranking.
fn render_csv(report: &AnalyticsReport) -> Result<Vec<u8>, ReportError> {
    let mut out = Vec::new();

    out.extend_from_slice(b"# Analytics Report Summary\n");
    {
        let mut writer = csv::Writer::from_writer(&mut out);
        writer.write_record(SUMMARY_HEADER)?;
        writer.write_record([
            report
                .generated_at
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            report.total_users.to_string(),
            report.total_posts.to_string(),
            report.total_comments.to_string(),
            report.average_posts_per_user.to_string(),
            report.most_active_user.clone().unwrap_or_default(),
        ])?;
        writer.flush().map_err(csv::Error::from)?;
    }

    out.extend_from_slice(b"\n# Top Posts by Engagement\n");
    {
        let mut writer = csv::Writer::from_writer(&mut out);
        writer.write_record(ENGAGEMENT_HEADER)?;
        for metric in &report.engagement_metrics {
            writer.write_record([
                metric.title.as_str(),
                &metric.comment_count.to_string(),
                metric.author.as_deref().unwrap_or(""),
            ])?;
        }
        writer.flush().map_err(csv::Error::from)?;
    }

    Ok(out)
}
