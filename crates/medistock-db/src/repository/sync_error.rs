//! # Sync Error Ledger
//!
//! The latest sync failure per (category, object) pair.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Error Ledger Contract                             │
//! │                                                                         │
//! │  record(category, object, message)  ← overwrite: last failure wins     │
//! │  clear(category, object)            ← called once, right after the     │
//! │                                       object syncs successfully        │
//! │  latest_for(category, object)       ← the ONLY read contract; the      │
//! │                                       presentation layer uses it to    │
//! │                                       badge list rows                  │
//! │                                                                         │
//! │  Nothing here retries anything. Retry is an explicit user or           │
//! │  scheduler trigger on the sync engine.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use medistock_core::SyncCategory;

/// Repository for the sync error ledger.
#[derive(Debug, Clone)]
pub struct SyncErrorRepository {
    pool: SqlitePool,
}

impl SyncErrorRepository {
    /// Creates a new SyncErrorRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SyncErrorRepository { pool }
    }

    /// Records a sync failure, replacing any prior entry for the same key.
    pub async fn record(
        &self,
        category: SyncCategory,
        object_id: &str,
        message: &str,
    ) -> DbResult<()> {
        debug!(
            category = %category,
            object_id = %object_id,
            "Recording sync error"
        );

        sqlx::query(
            r#"
            INSERT INTO sync_errors (category, object_id, message, occurred_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (category, object_id) DO UPDATE SET
                message = excluded.message,
                occurred_at = excluded.occurred_at
            "#,
        )
        .bind(category.as_str())
        .bind(object_id)
        .bind(message)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Clears the entry for an object after a successful sync.
    ///
    /// Clearing an absent entry is a no-op.
    pub async fn clear(&self, category: SyncCategory, object_id: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM sync_errors WHERE category = ?1 AND object_id = ?2")
            .bind(category.as_str())
            .bind(object_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// The latest failure message for an object, if any.
    pub async fn latest_for(
        &self,
        category: SyncCategory,
        object_id: &str,
    ) -> DbResult<Option<String>> {
        let message: Option<String> = sqlx::query_scalar(
            "SELECT message FROM sync_errors WHERE category = ?1 AND object_id = ?2",
        )
        .bind(category.as_str())
        .bind(object_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(message)
    }

    /// Counts recorded errors in a category (for the sync status snapshot).
    pub async fn count_for_category(&self, category: SyncCategory) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sync_errors WHERE category = ?1")
                .bind(category.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
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
    async fn test_last_failure_wins() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.sync_errors();

        repo.record(SyncCategory::Requisitions, "form-1", "connection refused")
            .await
            .unwrap();
        repo.record(SyncCategory::Requisitions, "form-1", "timeout")
            .await
            .unwrap();

        assert_eq!(
            repo.latest_for(SyncCategory::Requisitions, "form-1")
                .await
                .unwrap(),
            Some("timeout".to_string())
        );
        assert_eq!(
            repo.count_for_category(SyncCategory::Requisitions)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_clear_removes_entry() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.sync_errors();

        repo.record(SyncCategory::StockMovements, "facility-1", "HTTP 502")
            .await
            .unwrap();
        repo.clear(SyncCategory::StockMovements, "facility-1")
            .await
            .unwrap();

        assert_eq!(
            repo.latest_for(SyncCategory::StockMovements, "facility-1")
                .await
                .unwrap(),
            None
        );

        // Clearing again is harmless
        assert!(repo
            .clear(SyncCategory::StockMovements, "facility-1")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_categories_are_namespaced() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.sync_errors();

        repo.record(SyncCategory::Products, "obj", "a").await.unwrap();
        repo.record(SyncCategory::Requisitions, "obj", "b")
            .await
            .unwrap();

        assert_eq!(
            repo.latest_for(SyncCategory::Products, "obj").await.unwrap(),
            Some("a".to_string())
        );
        assert_eq!(
            repo.latest_for(SyncCategory::Requisitions, "obj")
                .await
                .unwrap(),
            Some("b".to_string())
        );
    }
}
