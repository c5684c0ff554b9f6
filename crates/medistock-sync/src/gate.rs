//! # Sync Category Gates
//!
//! Per-category mutual exclusion for sync pipelines.
//!
//! ## Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Gate Semantics                                      │
//! │                                                                         │
//! │  Periodic trigger ──┐                                                   │
//! │                     ├──► try_acquire(Requisitions)                      │
//! │  "Sync now" tap  ───┘         │                                         │
//! │                               ├── free → guard, pipeline runs           │
//! │                               └── held → None, caller does NOTHING      │
//! │                                                                         │
//! │  • At most one pipeline in flight per category                         │
//! │  • Reject-if-held: no queuing, no error, no waiting                    │
//! │  • The guard is held across the WHOLE run (network + storage) and      │
//! │    released on drop, success or failure alike                          │
//! │  • Different categories never block each other, and no gate ever       │
//! │    blocks a user writing to the ledger                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tokio::sync::{Mutex, MutexGuard};

use medistock_core::SyncCategory;

/// One mutual-exclusion gate per sync category.
#[derive(Debug, Default)]
pub struct CategoryGates {
    products: Mutex<()>,
    requisitions: Mutex<()>,
    stock_movements: Mutex<()>,
}

/// RAII guard for a held gate; dropping it releases the category.
pub type GateGuard<'a> = MutexGuard<'a, ()>;

impl CategoryGates {
    /// Creates gates with all categories free.
    pub fn new() -> Self {
        CategoryGates::default()
    }

    /// Tries to take a category's gate without waiting.
    ///
    /// Returns `None` when a pipeline for that category is already in
    /// flight; callers must then skip the run entirely.
    pub fn try_acquire(&self, category: SyncCategory) -> Option<GateGuard<'_>> {
        let gate = match category {
            SyncCategory::Products => &self.products,
            SyncCategory::Requisitions => &self.requisitions,
            SyncCategory::StockMovements => &self.stock_movements,
        };

        gate.try_lock().ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reject_while_held() {
        let gates = CategoryGates::new();

        let guard = gates.try_acquire(SyncCategory::Requisitions);
        assert!(guard.is_some());

        // Second acquisition of the same category is rejected, not queued
        assert!(gates.try_acquire(SyncCategory::Requisitions).is_none());

        // Other categories are unaffected
        assert!(gates.try_acquire(SyncCategory::Products).is_some());
        assert!(gates.try_acquire(SyncCategory::StockMovements).is_some());
    }

    #[test]
    fn test_released_on_drop() {
        let gates = CategoryGates::new();

        {
            let _guard = gates.try_acquire(SyncCategory::StockMovements).unwrap();
            assert!(gates.try_acquire(SyncCategory::StockMovements).is_none());
        }

        assert!(gates.try_acquire(SyncCategory::StockMovements).is_some());
    }
}
