//! Count stage: extract text for every successfully downloaded entry, count
//! keyword occurrences, and merge the rows into the output table.
//!
//! The output is a CSV keyed by (company_id, report_id) with one integer
//! column per keyword group. Rows are flushed one at a time, so an
//! interrupted run resumes by appending only the missing entries.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::{info, warn};

use crate::errors::ConfigError;
use crate::extractor;
use crate::keywords::KeywordGroups;
use crate::models::{CountSummary, DownloadStatus, EntryId, ManifestEntry, WriteMode};
use crate::storage::Ledger;

/// Identity and context columns preceding the per-group count columns.
pub const FIXED_COLUMNS: [&str; 4] = ["company_id", "report_id", "period", "text_len"];

/// Compute keyword counts for every usable manifest entry.
///
/// `Append` keeps existing rows and refuses to run against an output table
/// whose group columns do not match the current configuration; changing the
/// keyword groups requires `Overwrite`, which discards the table and
/// recomputes from scratch.
pub async fn process(
    entries: &[ManifestEntry],
    ledger: &Ledger,
    groups: &KeywordGroups,
    mode: WriteMode,
    output_path: &Path,
) -> Result<CountSummary> {
    let records = ledger.scan().await?;

    if mode == WriteMode::Overwrite && output_path.exists() {
        std::fs::remove_file(output_path)
            .with_context(|| format!("cannot remove {}", output_path.display()))?;
        info!("Discarded existing output {}", output_path.display());
    }

    let done = load_done_set(output_path, groups)?;

    let is_new = !output_path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(output_path)
        .with_context(|| format!("cannot open {}", output_path.display()))?;
    let mut writer = csv::Writer::from_writer(file);

    if is_new {
        let mut header: Vec<&str> = FIXED_COLUMNS.to_vec();
        header.extend(groups.names());
        writer.write_record(&header)?;
        writer.flush()?;
    }

    let mut summary = CountSummary::default();

    for entry in entries {
        let record = match records.get(&entry.identity()) {
            Some(r) if r.status == DownloadStatus::Success => r,
            _ => {
                summary.skipped_failed_download += 1;
                continue;
            }
        };

        if done.contains(&entry.identity()) {
            summary.skipped_done += 1;
            continue;
        }

        let path = record.local_path().unwrap_or_else(|| Path::new(""));
        let text = match extractor::extract(path) {
            Ok(text) => text,
            Err(error) => {
                warn!("Skipping {} for counting: {}", entry.identity(), error);
                summary.skipped_failed_extraction += 1;
                continue;
            }
        };

        let counts = groups.count(&text);
        let mut row = vec![
            entry.company_id.clone(),
            entry.report_id.clone(),
            entry.period.clone(),
            text.chars().count().to_string(),
        ];
        row.extend(counts.values().map(u64::to_string));

        writer.write_record(&row)?;
        writer.flush()?;
        summary.newly_processed += 1;
    }

    println!(
        "Count complete: {} newly processed, {} already done, {} failed downloads skipped, {} extraction failures",
        summary.newly_processed,
        summary.skipped_done,
        summary.skipped_failed_download,
        summary.skipped_failed_extraction
    );
    Ok(summary)
}

/// Identities already present in the output table.
///
/// Validates the existing header against the current keyword groups first;
/// a mismatched group-column set means the table was produced under a
/// different configuration and must be rebuilt with overwrite mode. Rows
/// shorter than the header (a torn trailing row from a crash) are ignored,
/// so their entries are recomputed on resume.
fn load_done_set(output_path: &Path, groups: &KeywordGroups) -> Result<HashSet<EntryId>> {
    let mut done = HashSet::new();
    if !output_path.exists() {
        return Ok(done);
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(output_path)
        .with_context(|| format!("cannot open {}", output_path.display()))?;

    let headers = reader.headers()?.clone();
    let actual: Vec<&str> = headers.iter().skip(FIXED_COLUMNS.len()).collect();
    let expected: Vec<&str> = groups.names().collect();
    let fixed: Vec<&str> = headers.iter().take(FIXED_COLUMNS.len()).collect();

    if fixed != FIXED_COLUMNS || actual != expected {
        return Err(ConfigError::OutputSchema(format!(
            "{} has columns [{}] but the configuration defines [{}]; re-run with --overwrite to rebuild it",
            output_path.display(),
            actual.join(", "),
            expected.join(", ")
        ))
        .into());
    }

    let width = headers.len();
    for result in reader.records() {
        let record = result?;
        if record.len() < width {
            continue;
        }
        done.insert(EntryId {
            company_id: record[0].to_string(),
            report_id: record[1].to_string(),
        });
    }

    Ok(done)
}
