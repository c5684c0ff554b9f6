//! # Sync Scalar State
//!
//! Persisted key/value state the sync engine resumes from: per-category
//! last-synced timestamps, per-category "fully synced" flags, and the
//! backfill cursor.
//!
//! This is deliberately NOT ledger data - it is external scalar state keyed
//! by well-known strings, so a half-finished backfill can pick up exactly
//! where it stopped even across process restarts.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use medistock_core::SyncCategory;

// =============================================================================
// Sync Cursor
// =============================================================================

/// Resume point of the historical movement backfill.
///
/// `chunk_index` is the next monthly chunk to fetch (0-based, newest month
/// first); `last_end` is the end boundary of the month that chunk covers.
/// Persisted after every successful chunk and again on failure, so a retry
/// resumes at the failed chunk instead of refetching completed months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCursor {
    pub chunk_index: u32,
    pub last_end: NaiveDate,
}

// =============================================================================
// Keys
// =============================================================================

fn last_synced_key(category: SyncCategory) -> String {
    format!("last_synced:{}", category.as_str())
}

fn fully_synced_key(category: SyncCategory) -> String {
    format!("fully_synced:{}", category.as_str())
}

const BACKFILL_CURSOR_KEY: &str = "backfill_cursor:stock_movements";

// =============================================================================
// Repository
// =============================================================================

/// Repository for persisted sync scalars.
#[derive(Debug, Clone)]
pub struct SyncStateRepository {
    pool: SqlitePool,
}

impl SyncStateRepository {
    /// Creates a new SyncStateRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SyncStateRepository { pool }
    }

    // =========================================================================
    // Raw KV
    // =========================================================================

    /// Reads a raw value.
    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM sync_state WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(value)
    }

    /// Writes a raw value (upsert).
    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        debug!(key = %key, "Writing sync state");

        sqlx::query(
            "INSERT INTO sync_state (key, value) VALUES (?1, ?2) \
             ON CONFLICT (key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deletes a key (absent keys are ignored).
    pub async fn delete(&self, key: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM sync_state WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // =========================================================================
    // Typed Accessors
    // =========================================================================

    /// When the category last synced successfully, if ever.
    pub async fn last_synced(&self, category: SyncCategory) -> DbResult<Option<DateTime<Utc>>> {
        let raw = self.get(&last_synced_key(category)).await?;

        raw.map(|value| {
            value
                .parse::<DateTime<Utc>>()
                .map_err(|e| DbError::Internal(format!("Corrupt last_synced value: {e}")))
        })
        .transpose()
    }

    /// Stamps the category's last successful sync time.
    pub async fn set_last_synced(
        &self,
        category: SyncCategory,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        self.set(&last_synced_key(category), &at.to_rfc3339()).await
    }

    /// Whether the category completed its one-time full sync.
    pub async fn fully_synced(&self, category: SyncCategory) -> DbResult<bool> {
        Ok(self
            .get(&fully_synced_key(category))
            .await?
            .as_deref()
            == Some("true"))
    }

    /// Sets the category's one-time full sync flag.
    pub async fn set_fully_synced(&self, category: SyncCategory, done: bool) -> DbResult<()> {
        self.set(&fully_synced_key(category), if done { "true" } else { "false" })
            .await
    }

    /// Reads the backfill cursor, if a backfill is in progress.
    pub async fn backfill_cursor(&self) -> DbResult<Option<SyncCursor>> {
        let raw = self.get(BACKFILL_CURSOR_KEY).await?;

        raw.map(|value| {
            serde_json::from_str(&value)
                .map_err(|e| DbError::Internal(format!("Corrupt backfill cursor: {e}")))
        })
        .transpose()
    }

    /// Persists the backfill cursor.
    pub async fn set_backfill_cursor(&self, cursor: SyncCursor) -> DbResult<()> {
        let value = serde_json::to_string(&cursor)
            .map_err(|e| DbError::Internal(format!("Cannot serialize cursor: {e}")))?;
        self.set(BACKFILL_CURSOR_KEY, &value).await
    }

    /// Removes the backfill cursor (backfill finished).
    pub async fn clear_backfill_cursor(&self) -> DbResult<()> {
        self.delete(BACKFILL_CURSOR_KEY).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_raw_kv_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.sync_state();

        assert_eq!(repo.get("missing").await.unwrap(), None);

        repo.set("k", "v1").await.unwrap();
        repo.set("k", "v2").await.unwrap();
        assert_eq!(repo.get("k").await.unwrap(), Some("v2".to_string()));

        repo.delete("k").await.unwrap();
        assert_eq!(repo.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_cursor_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.sync_state();

        assert_eq!(repo.backfill_cursor().await.unwrap(), None);

        let cursor = SyncCursor {
            chunk_index: 7,
            last_end: NaiveDate::from_ymd_opt(2023, 8, 20).unwrap(),
        };
        repo.set_backfill_cursor(cursor).await.unwrap();
        assert_eq!(repo.backfill_cursor().await.unwrap(), Some(cursor));

        repo.clear_backfill_cursor().await.unwrap();
        assert_eq!(repo.backfill_cursor().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_flags_and_timestamps() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.sync_state();

        assert!(!repo.fully_synced(SyncCategory::StockMovements).await.unwrap());
        repo.set_fully_synced(SyncCategory::StockMovements, true)
            .await
            .unwrap();
        assert!(repo.fully_synced(SyncCategory::StockMovements).await.unwrap());

        assert_eq!(repo.last_synced(SyncCategory::Products).await.unwrap(), None);
        let now = Utc::now();
        repo.set_last_synced(SyncCategory::Products, now).await.unwrap();

        let stored = repo.last_synced(SyncCategory::Products).await.unwrap().unwrap();
        assert_eq!(stored.timestamp(), now.timestamp());
    }
}
