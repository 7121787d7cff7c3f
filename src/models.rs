use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// One filing to process, as listed by the upstream manifest stage.
///
/// Manifest rows are read-only input: the pipeline never writes them back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub company_id: String,
    pub report_id: String,
    pub period: String,
    pub source_url: String,
    pub target_path: String,
}

impl ManifestEntry {
    pub fn identity(&self) -> EntryId {
        EntryId {
            company_id: self.company_id.clone(),
            report_id: self.report_id.clone(),
        }
    }

    /// Where the downloaded document lives under the content root.
    pub fn local_path(&self, content_dir: &Path) -> PathBuf {
        content_dir.join(&self.target_path)
    }
}

/// (company_id, report_id) key shared by the manifest, the ledger, and the
/// count output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId {
    pub company_id: String,
    pub report_id: String,
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.company_id, self.report_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    Success,
    Failed,
}

impl DownloadStatus {
    pub fn as_str(&self) -> &str {
        match self {
            DownloadStatus::Success => "success",
            DownloadStatus::Failed => "failed",
        }
    }
}

/// Current download outcome for one manifest entry.
///
/// At most one record exists per identity; a re-attempt replaces the prior
/// record rather than appending history.
#[derive(Debug, Clone)]
pub struct DownloadRecord {
    pub company_id: String,
    pub report_id: String,
    pub status: DownloadStatus,
    /// Local file path on success, failure reason otherwise.
    pub path_or_reason: String,
    /// HTTP status of the last attempt, where one was received.
    pub http_status: Option<u16>,
    pub file_size: Option<u64>,
    pub updated_at: DateTime<Utc>,
}

impl DownloadRecord {
    pub fn success(entry: &ManifestEntry, path: &Path, file_size: u64, http_status: u16) -> Self {
        DownloadRecord {
            company_id: entry.company_id.clone(),
            report_id: entry.report_id.clone(),
            status: DownloadStatus::Success,
            path_or_reason: path.to_string_lossy().to_string(),
            http_status: Some(http_status),
            file_size: Some(file_size),
            updated_at: Utc::now(),
        }
    }

    pub fn failure(entry: &ManifestEntry, reason: String, http_status: Option<u16>) -> Self {
        DownloadRecord {
            company_id: entry.company_id.clone(),
            report_id: entry.report_id.clone(),
            status: DownloadStatus::Failed,
            path_or_reason: reason,
            http_status,
            file_size: None,
            updated_at: Utc::now(),
        }
    }

    pub fn identity(&self) -> EntryId {
        EntryId {
            company_id: self.company_id.clone(),
            report_id: self.report_id.clone(),
        }
    }

    /// Path of the stored document, for success records.
    pub fn local_path(&self) -> Option<&Path> {
        match self.status {
            DownloadStatus::Success => Some(Path::new(&self.path_or_reason)),
            DownloadStatus::Failed => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadMode {
    /// Attempt everything not already downloaded.
    All,
    /// Attempt only entries currently recorded as failed.
    OnlyFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Keep existing output rows and add the missing ones.
    Append,
    /// Discard the output table and recompute from scratch.
    Overwrite,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountSummary {
    pub newly_processed: usize,
    pub skipped_done: usize,
    pub skipped_failed_download: usize,
    pub skipped_failed_extraction: usize,
}
