//! Centralized configuration management for filingfreq

use std::path::PathBuf;
use std::time::Duration;
use anyhow::{Result, Context};

use crate::downloader::retry::RetryPolicy;

/// Application configuration
///
/// Paths that name a specific artifact (manifest, database, keyword config,
/// output table) come in through the CLI; everything here is ambient
/// behavior, loaded from environment variables with defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory for downloaded documents
    pub content_dir: PathBuf,
    /// Bounded fetch concurrency for the download stage
    pub download_workers: usize,
    /// Retry schedule for transient fetch failures
    pub retry: RetryPolicy,
    /// HTTP client configuration
    pub http: HttpConfig,
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string
    pub user_agent: String,
    /// Referer header, when the disclosure site requires one
    pub referer: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            user_agent: "filingfreq/0.1.0".to_string(),
            referer: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables and defaults
    pub fn from_env() -> Result<Self> {
        let content_dir = std::env::var("FILINGFREQ_CONTENT_DIR")
            .unwrap_or_else(|_| "./filings".to_string())
            .into();

        let download_workers = parse_env_var("FILINGFREQ_DOWNLOAD_WORKERS")?.unwrap_or(4);

        let retry = RetryPolicy {
            max_attempts: parse_env_var("FILINGFREQ_MAX_ATTEMPTS")?.unwrap_or(3),
            base_delay_ms: parse_env_var("FILINGFREQ_RETRY_BASE_DELAY_MS")?.unwrap_or(1_000),
            max_delay_ms: parse_env_var("FILINGFREQ_RETRY_MAX_DELAY_MS")?.unwrap_or(30_000),
        };

        let http = HttpConfig {
            timeout_seconds: parse_env_var("FILINGFREQ_HTTP_TIMEOUT_SECONDS")?.unwrap_or(30),
            user_agent: std::env::var("FILINGFREQ_USER_AGENT")
                .unwrap_or_else(|_| "filingfreq/0.1.0".to_string()),
            referer: std::env::var("FILINGFREQ_REFERER").ok(),
        };

        Ok(Config {
            content_dir,
            download_workers,
            retry,
            http,
        })
    }

    /// Get content directory as string
    pub fn content_dir_str(&self) -> &str {
        self.content_dir.to_str().unwrap_or("./filings")
    }

    /// Get HTTP timeout as Duration
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_seconds)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.download_workers == 0 {
            return Err(anyhow::anyhow!("download worker count must be at least 1"));
        }

        if self.retry.max_attempts == 0 {
            return Err(anyhow::anyhow!("retry attempt count must be at least 1"));
        }

        // Check if content directory can be created
        std::fs::create_dir_all(&self.content_dir)
            .with_context(|| format!("Cannot create content directory: {}", self.content_dir.display()))?;

        Ok(())
    }
}

/// Helper function to parse environment variable as a specific type
fn parse_env_var<T>(var_name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display + Send + Sync + std::error::Error + 'static,
{
    match std::env::var(var_name) {
        Ok(val) => val.parse().map(Some).with_context(|| {
            format!("Failed to parse environment variable {} = '{}'", var_name, val)
        }),
        Err(_) => Ok(None),
    }
}
