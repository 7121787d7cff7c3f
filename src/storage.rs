//! Persisted download ledger.
//!
//! SQLite-backed tabular store with upsert/scan semantics. The
//! (company_id, report_id) primary key plus `INSERT OR REPLACE` keeps the
//! at-most-one-current-record invariant: retrying an entry replaces its row
//! atomically instead of appending history.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::models::{DownloadRecord, DownloadStatus, EntryId};

pub struct Ledger {
    pool: SqlitePool,
}

impl Ledger {
    pub async fn open(database_path: &str) -> Result<Self> {
        // Create database if it doesn't exist
        if !Path::new(database_path).exists() {
            std::fs::File::create(database_path)?;
        }

        let database_url = format!("sqlite://{}", database_path);
        let pool = SqlitePool::connect(&database_url).await?;

        // Initialize schema
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS downloads (
                company_id TEXT NOT NULL,
                report_id TEXT NOT NULL,
                status TEXT NOT NULL,
                path_or_reason TEXT NOT NULL,
                http_status INTEGER,
                file_size INTEGER,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (company_id, report_id)
            );

            CREATE INDEX IF NOT EXISTS idx_downloads_status ON downloads(status);
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Ledger { pool })
    }

    /// Insert or replace the current record for the entry's identity.
    pub async fn upsert(&self, record: &DownloadRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO downloads
            (company_id, report_id, status, path_or_reason, http_status, file_size, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.company_id)
        .bind(&record.report_id)
        .bind(record.status.as_str())
        .bind(&record.path_or_reason)
        .bind(record.http_status.map(|s| s as i64))
        .bind(record.file_size.map(|s| s as i64))
        .bind(record.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All current records, keyed by entry identity.
    pub async fn scan(&self) -> Result<HashMap<EntryId, DownloadRecord>> {
        let rows = sqlx::query("SELECT * FROM downloads")
            .fetch_all(&self.pool)
            .await?;

        let mut records = HashMap::new();
        for row in rows {
            let status_str: String = row.get("status");
            let status = match status_str.as_str() {
                "success" => DownloadStatus::Success,
                _ => DownloadStatus::Failed,
            };

            let updated_at_str: String = row.get("updated_at");
            let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)?.with_timezone(&Utc);

            let record = DownloadRecord {
                company_id: row.get("company_id"),
                report_id: row.get("report_id"),
                status,
                path_or_reason: row.get("path_or_reason"),
                http_status: row.get::<Option<i64>, _>("http_status").map(|s| s as u16),
                file_size: row.get::<Option<i64>, _>("file_size").map(|s| s as u64),
                updated_at,
            };
            records.insert(record.identity(), record);
        }

        Ok(records)
    }

    /// Row counts per status, for the status command and stage summaries.
    pub async fn status_counts(&self) -> Result<BTreeMap<String, i64>> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS n FROM downloads GROUP BY status")
            .fetch_all(&self.pool)
            .await?;

        let mut counts = BTreeMap::new();
        for row in rows {
            counts.insert(row.get::<String, _>("status"), row.get::<i64, _>("n"));
        }

        Ok(counts)
    }
}
