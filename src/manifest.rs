//! Read-only access to the manifest produced by the upstream listing stage.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use crate::errors::ConfigError;
use crate::models::ManifestEntry;

/// Columns the manifest artifact must carry. Extra columns are ignored.
pub const MANIFEST_COLUMNS: [&str; 5] = [
    "company_id",
    "report_id",
    "period",
    "source_url",
    "target_path",
];

/// Load and validate the manifest CSV.
///
/// Fails before returning any entries when the header is missing a required
/// column or when two rows share the same (company_id, report_id) identity.
pub fn load(path: &Path) -> Result<Vec<ManifestEntry>> {
    if !path.exists() {
        anyhow::bail!(
            "manifest not found: {} (produce it with the upstream manifest stage first)",
            path.display()
        );
    }

    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("cannot open manifest {}", path.display()))?;

    let headers = reader.headers()?.clone();
    for column in MANIFEST_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(ConfigError::Manifest(format!(
                "missing required column '{}' in {}",
                column,
                path.display()
            ))
            .into());
        }
    }

    let mut entries = Vec::new();
    let mut seen = HashSet::new();
    for (index, result) in reader.deserialize::<ManifestEntry>().enumerate() {
        let entry = result.map_err(|e| {
            ConfigError::Manifest(format!("row {}: {}", index + 2, e))
        })?;
        if !seen.insert(entry.identity()) {
            return Err(ConfigError::DuplicateEntry(entry.identity()).into());
        }
        entries.push(entry);
    }

    info!("Loaded {} manifest entries from {}", entries.len(), path.display());
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_manifest(dir: &TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("manifest.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_valid_manifest() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(
            &dir,
            "company_id,report_id,period,source_url,target_path\n\
             600001,r2021,2021,https://example.com/a.pdf,600001_2021.pdf\n\
             600002,r2021,2021,https://example.com/b.pdf,600002_2021.pdf\n",
        );

        let entries = load(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].company_id, "600001");
        assert_eq!(entries[0].target_path, "600001_2021.pdf");
    }

    #[test]
    fn test_extra_columns_are_ignored() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(
            &dir,
            "company_id,report_id,period,source_url,target_path,company_name\n\
             600001,r2021,2021,https://example.com/a.pdf,600001_2021.pdf,Acme Manufacturing\n",
        );

        let entries = load(&path).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(
            &dir,
            "company_id,report_id,period,source_url\n600001,r2021,2021,https://example.com/a.pdf\n",
        );

        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("target_path"));
    }

    #[test]
    fn test_duplicate_identity_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(
            &dir,
            "company_id,report_id,period,source_url,target_path\n\
             600001,r2021,2021,https://example.com/a.pdf,a.pdf\n\
             600001,r2021,2021,https://example.com/b.pdf,b.pdf\n",
        );

        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("duplicate manifest entry"));
    }

    #[test]
    fn test_missing_manifest_is_fatal() {
        let dir = TempDir::new().unwrap();
        assert!(load(&dir.path().join("nope.csv")).is_err());
    }
}
