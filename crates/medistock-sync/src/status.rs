//! # Sync Status Snapshot
//!
//! A read-only summary of sync health for the presentation layer: pending
//! counts, per-category last-synced timestamps, and error-ledger tallies.
//! Produced by [`crate::engine::SyncEngine::status`].

use chrono::{DateTime, Utc};

/// Current sync status for external queries.
#[derive(Debug, Clone, Default)]
pub struct SyncStatus {
    /// Unsynced stock movements waiting for the next batch push.
    pub movements_pending: usize,

    /// AUTHORIZED forms waiting in the push queue.
    pub requisitions_pending: usize,

    /// Last successful product catalog pull.
    pub last_synced_products: Option<DateTime<Utc>>,

    /// Last successful requisition push/pull.
    pub last_synced_requisitions: Option<DateTime<Utc>>,

    /// Last successful movement push.
    pub last_synced_movements: Option<DateTime<Utc>>,

    /// Whether the one-time historical backfill has completed.
    pub backfill_complete: bool,

    /// Recorded sync errors per category.
    pub product_errors: i64,
    pub requisition_errors: i64,
    pub movement_errors: i64,
}

impl SyncStatus {
    /// True when nothing is waiting and nothing is failing.
    pub fn is_clean(&self) -> bool {
        self.movements_pending == 0
            && self.requisitions_pending == 0
            && self.product_errors == 0
            && self.requisition_errors == 0
            && self.movement_errors == 0
    }
}
