//! SQLite seen-set storage.
//!
//! One row per (recipient, identity key). Timestamps are stored as
//! fixed-width RFC 3339 UTC text, so lexical order is time order.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use tracing::debug;

use crate::error::{DedupResult, DedupStateError};
use crate::traits::seen_store::SeenStore;
use crate::types::job::IdentityKey;
use crate::types::seen::{RecipientId, SeenEntry, SeenSet};

/// SQLite-backed seen-set store.
pub struct SqliteSeenStore {
    pool: SqlitePool,
}

impl SqliteSeenStore {
    /// Open (and migrate) a store.
    ///
    /// # Example URLs
    /// - `sqlite::memory:` - In-memory database (ephemeral)
    /// - `sqlite://./jobsprint.db?mode=rwc` - File-based, created if missing
    pub async fn new(database_url: &str) -> DedupResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    ///
    /// Pinned to a single connection that never expires, since every
    /// SQLite connection gets its own in-memory database.
    pub async fn in_memory() -> DedupResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> DedupResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS seen_jobs (
                recipient TEXT NOT NULL,
                identity_key TEXT NOT NULL,
                seen_at TEXT NOT NULL,
                PRIMARY KEY (recipient, identity_key)
            );

            CREATE INDEX IF NOT EXISTS idx_seen_jobs_seen_at ON seen_jobs(recipient, seen_at);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[derive(Debug, FromRow)]
struct SeenRow {
    identity_key: String,
    seen_at: String,
}

impl SeenRow {
    fn into_entry(self) -> DedupResult<SeenEntry> {
        let seen_at = DateTime::parse_from_rfc3339(&self.seen_at)
            .map_err(|e| DedupStateError::Corrupt(format!("{}: {}", self.identity_key, e)))?
            .with_timezone(&Utc);

        Ok(SeenEntry {
            key: IdentityKey::from_stored(self.identity_key),
            seen_at,
        })
    }
}

#[async_trait]
impl SeenStore for SqliteSeenStore {
    async fn load(&self, recipient: &RecipientId) -> DedupResult<SeenSet> {
        let rows: Vec<SeenRow> =
            sqlx::query_as("SELECT identity_key, seen_at FROM seen_jobs WHERE recipient = ?")
                .bind(recipient.as_str())
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(SeenRow::into_entry).collect()
    }

    async fn record(&self, recipient: &RecipientId, entries: &[SeenEntry]) -> DedupResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for entry in entries {
            sqlx::query(
                "INSERT OR IGNORE INTO seen_jobs (recipient, identity_key, seen_at) VALUES (?, ?, ?)",
            )
            .bind(recipient.as_str())
            .bind(entry.key.as_str())
            .bind(format_timestamp(entry.seen_at))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        debug!(recipient = %recipient, count = entries.len(), "Recorded seen entries");
        Ok(())
    }

    async fn prune(&self, recipient: &RecipientId, cutoff: DateTime<Utc>) -> DedupResult<usize> {
        let result = sqlx::query("DELETE FROM seen_jobs WHERE recipient = ? AND seen_at < ?")
            .bind(recipient.as_str())
            .bind(format_timestamp(cutoff))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() as usize)
    }
}
