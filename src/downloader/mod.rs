//! Download stage: fetch every planned manifest entry, store the document
//! bytes under the content root, and record the outcome in the ledger.
//!
//! Fetches run on a bounded worker pool; every ledger write happens in the
//! single consumer loop, after each entry, so a crash loses at most the
//! in-flight entries' outcomes.

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use reqwest::{Client, Url};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::Config;
use crate::errors::FetchError;
use crate::models::{
    DownloadMode, DownloadRecord, DownloadStatus, DownloadSummary, EntryId, ManifestEntry,
};
use crate::storage::Ledger;

pub mod retry;

use retry::RetryPolicy;

enum Outcome {
    Success {
        path: PathBuf,
        file_size: u64,
        http_status: u16,
    },
    Failed(FetchError),
}

/// Download every planned entry and record each outcome.
///
/// Per-entry fetch failures are recorded and never abort the batch; I/O
/// errors on the content root or the ledger are fatal, since every
/// subsequent entry would hit the same wall.
pub async fn download(
    entries: &[ManifestEntry],
    mode: DownloadMode,
    ledger: &Ledger,
    config: &Config,
) -> Result<DownloadSummary> {
    let mut headers = reqwest::header::HeaderMap::new();
    if let Some(referer) = &config.http.referer {
        headers.insert(reqwest::header::REFERER, referer.parse()?);
    }
    let client = Client::builder()
        .user_agent(&config.http.user_agent)
        .timeout(config.http_timeout())
        .default_headers(headers)
        .build()?;

    std::fs::create_dir_all(&config.content_dir)
        .with_context(|| format!("cannot create content directory {}", config.content_dir.display()))?;

    let records = ledger.scan().await?;
    let planned = plan_attempts(entries, &records, mode, &config.content_dir);

    let mut summary = DownloadSummary {
        skipped: entries.len() - planned.len(),
        ..Default::default()
    };

    info!(
        "{} of {} manifest entries need a download",
        planned.len(),
        entries.len()
    );

    let mut outcomes = stream::iter(planned.into_iter().map(|entry| {
        let client = client.clone();
        let policy = config.retry.clone();
        let target = entry.local_path(&config.content_dir);
        async move {
            let outcome = attempt_entry(&client, entry, &target, &policy).await;
            (entry, outcome)
        }
    }))
    .buffer_unordered(config.download_workers.max(1));

    while let Some((entry, outcome)) = outcomes.next().await {
        match outcome? {
            Outcome::Success {
                path,
                file_size,
                http_status,
            } => {
                ledger
                    .upsert(&DownloadRecord::success(entry, &path, file_size, http_status))
                    .await?;
                summary.succeeded += 1;
                info!("Downloaded {} -> {}", entry.identity(), path.display());
            }
            Outcome::Failed(error) => {
                ledger
                    .upsert(&DownloadRecord::failure(
                        entry,
                        error.to_string(),
                        error.http_status(),
                    ))
                    .await?;
                summary.failed += 1;
                warn!("Failed to download {}: {}", entry.identity(), error);
            }
        }
    }

    println!(
        "Download complete: {} succeeded, {} failed, {} skipped",
        summary.succeeded, summary.failed, summary.skipped
    );
    Ok(summary)
}

/// Which entries this run should attempt.
///
/// In `All` mode an entry is skipped only when its ledger row says success
/// AND the stored file is still on disk; deleting the file is the documented
/// way to force a re-download. `OnlyFailed` restricts the run to entries
/// currently recorded as failed.
fn plan_attempts<'a>(
    entries: &'a [ManifestEntry],
    records: &HashMap<EntryId, DownloadRecord>,
    mode: DownloadMode,
    content_dir: &Path,
) -> Vec<&'a ManifestEntry> {
    entries
        .iter()
        .filter(|entry| {
            let record = records.get(&entry.identity());
            match mode {
                DownloadMode::All => match record {
                    Some(r) if r.status == DownloadStatus::Success => {
                        !entry.local_path(content_dir).exists()
                    }
                    _ => true,
                },
                DownloadMode::OnlyFailed => {
                    matches!(record, Some(r) if r.status == DownloadStatus::Failed)
                }
            }
        })
        .collect()
}

/// Fetch one entry and persist its bytes.
///
/// Returns `Outcome::Failed` for anything worth recording against the entry;
/// returns `Err` only for fatal storage problems.
async fn attempt_entry(
    client: &Client,
    entry: &ManifestEntry,
    target: &Path,
    policy: &RetryPolicy,
) -> Result<Outcome> {
    let (bytes, http_status) = match fetch_with_retry(client, &entry.source_url, policy).await {
        Ok(fetched) => fetched,
        Err(error) => return Ok(Outcome::Failed(error)),
    };

    write_atomic(target, &bytes)
        .with_context(|| format!("cannot write {}", target.display()))?;

    Ok(Outcome::Success {
        path: target.to_path_buf(),
        file_size: bytes.len() as u64,
        http_status,
    })
}

async fn fetch_with_retry(
    client: &Client,
    url: &str,
    policy: &RetryPolicy,
) -> Result<(Vec<u8>, u16), FetchError> {
    let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;

    let mut attempt = 1u32;
    loop {
        match fetch_once(client, parsed.clone()).await {
            Ok(fetched) => return Ok(fetched),
            Err(error) => {
                if !policy.should_retry(attempt, &error) {
                    return Err(error);
                }
                let delay = policy.backoff(attempt);
                warn!(
                    "attempt {}/{} for {} failed ({}), retrying in {:?}",
                    attempt, policy.max_attempts, url, error, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

async fn fetch_once(client: &Client, url: Url) -> Result<(Vec<u8>, u16), FetchError> {
    let response = client.get(url).send().await?;
    let status = response.status();

    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }

    let bytes = response.bytes().await?.to_vec();

    // Disclosure sites often answer 200 with an HTML error page
    if !bytes.starts_with(b"%PDF") {
        return Err(FetchError::NotPdf);
    }

    Ok((bytes, status.as_u16()))
}

/// Write to a temporary sibling, then rename, so a crash mid-write never
/// leaves a partial file at the target path.
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut temp_name = path.as_os_str().to_os_string();
    temp_name.push(".part");
    let temp_path = PathBuf::from(temp_name);

    std::fs::write(&temp_path, bytes)?;
    std::fs::rename(&temp_path, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(company_id: &str, report_id: &str) -> ManifestEntry {
        ManifestEntry {
            company_id: company_id.to_string(),
            report_id: report_id.to_string(),
            period: "2021".to_string(),
            source_url: "https://example.com/a.pdf".to_string(),
            target_path: format!("{}_{}.pdf", company_id, report_id),
        }
    }

    fn success_record(entry: &ManifestEntry, content_dir: &Path) -> DownloadRecord {
        DownloadRecord::success(entry, &entry.local_path(content_dir), 1024, 200)
    }

    #[test]
    fn test_plan_skips_completed_entries() {
        let dir = TempDir::new().unwrap();
        let entries = vec![entry("600001", "r2021"), entry("600002", "r2021")];

        std::fs::write(entries[0].local_path(dir.path()), b"%PDF").unwrap();
        let mut records = HashMap::new();
        records.insert(
            entries[0].identity(),
            success_record(&entries[0], dir.path()),
        );

        let planned = plan_attempts(&entries, &records, DownloadMode::All, dir.path());
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].company_id, "600002");
    }

    #[test]
    fn test_plan_rerun_with_no_changes_attempts_nothing() {
        let dir = TempDir::new().unwrap();
        let entries = vec![entry("600001", "r2021")];

        std::fs::write(entries[0].local_path(dir.path()), b"%PDF").unwrap();
        let mut records = HashMap::new();
        records.insert(
            entries[0].identity(),
            success_record(&entries[0], dir.path()),
        );

        let planned = plan_attempts(&entries, &records, DownloadMode::All, dir.path());
        assert!(planned.is_empty());
    }

    #[test]
    fn test_plan_reattempts_success_with_deleted_file() {
        let dir = TempDir::new().unwrap();
        let entries = vec![entry("600001", "r2021")];

        let mut records = HashMap::new();
        records.insert(
            entries[0].identity(),
            success_record(&entries[0], dir.path()),
        );

        // Ledger says success, but the file was removed by the user
        let planned = plan_attempts(&entries, &records, DownloadMode::All, dir.path());
        assert_eq!(planned.len(), 1);
    }

    #[test]
    fn test_plan_only_failed_ignores_new_entries() {
        let dir = TempDir::new().unwrap();
        let entries = vec![entry("600001", "r2021"), entry("600002", "r2021")];

        let mut records = HashMap::new();
        records.insert(
            entries[0].identity(),
            DownloadRecord::failure(&entries[0], "HTTP status 404".to_string(), Some(404)),
        );

        let planned = plan_attempts(&entries, &records, DownloadMode::OnlyFailed, dir.path());
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].company_id, "600001");
    }

    #[test]
    fn test_plan_resumes_partial_batch() {
        let dir = TempDir::new().unwrap();
        let entries: Vec<ManifestEntry> = (1..=5)
            .map(|i| entry(&format!("60000{}", i), "r2021"))
            .collect();

        let mut records = HashMap::new();
        for done in &entries[..2] {
            std::fs::write(done.local_path(dir.path()), b"%PDF").unwrap();
            records.insert(done.identity(), success_record(done, dir.path()));
        }

        let planned = plan_attempts(&entries, &records, DownloadMode::All, dir.path());
        assert_eq!(planned.len(), 3);
        assert!(planned
            .iter()
            .all(|e| e.company_id != "600001" && e.company_id != "600002"));
    }

    #[test]
    fn test_write_atomic_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested").join("report.pdf");

        write_atomic(&target, b"%PDF-1.5 contents").unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"%PDF-1.5 contents");
        let leftovers: Vec<_> = std::fs::read_dir(target.parent().unwrap())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().map(|x| x == "part").unwrap_or(false))
            .collect();
        assert!(leftovers.is_empty());
    }
}
