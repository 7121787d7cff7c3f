//! Error taxonomy for the pipeline stages.
//!
//! Per-entry failures (`FetchError`, `ExtractionError`) are recorded and never
//! abort a batch. `ConfigError` and I/O errors on the content store or ledger
//! are fatal and stop the stage before or during processing.

use thiserror::Error;

use crate::models::EntryId;

/// Why a fetch for a single manifest entry failed.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid source URL '{0}'")]
    InvalidUrl(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("response is not a PDF payload")]
    NotPdf,
}

impl FetchError {
    /// Whether another immediate attempt is worthwhile.
    ///
    /// Transport errors and rate-limit/server statuses are transient; a
    /// malformed URL or a definitive client error will fail the same way
    /// every time.
    pub fn is_retriable(&self) -> bool {
        match self {
            FetchError::Status(code) => matches!(*code, 403 | 429) || (500..=599).contains(code),
            FetchError::Request(_) => true,
            FetchError::NotPdf => true,
            FetchError::InvalidUrl(_) => false,
        }
    }

    /// HTTP status of the failed attempt, where one was received.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            FetchError::Status(code) => Some(*code),
            FetchError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Why text extraction failed for a downloaded document.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("failed to parse PDF: {0}")]
    Corrupt(String),

    #[error("document is encrypted")]
    Encrypted,

    #[error("unsupported document format '{0}'")]
    Unsupported(String),

    #[error("no extractable text")]
    Empty,
}

/// Malformed input that makes a whole stage invalid before any entry is
/// processed.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("manifest schema error: {0}")]
    Manifest(String),

    #[error("duplicate manifest entry {0}")]
    DuplicateEntry(EntryId),

    #[error("keyword configuration error: {0}")]
    Keywords(String),

    #[error("output schema mismatch: {0}")]
    OutputSchema(String),
}
