//! # medistock-db: SQLite Persistence for Medistock
//!
//! All database access for the stock ledger, requisitions, the sync error
//! ledger, and persisted sync scalar state.
//!
//! ## Layering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        medistock-db Layout                              │
//! │                                                                         │
//! │  Database (pool.rs)                                                    │
//! │  ├── stock_cards()   → StockCardRepository    (Ledger Store)           │
//! │  ├── requisitions()  → RequisitionRepository  (R&R forms)              │
//! │  ├── sync_errors()   → SyncErrorRepository    (Error Ledger)           │
//! │  └── sync_state()    → SyncStateRepository    (cursors, flags)         │
//! │                                                                         │
//! │  Writes that must be atomic (movement append, form generation) run     │
//! │  inside a single SQLite transaction; transactions are the only         │
//! │  mutual-exclusion mechanism for ledger invariants.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::requisition::RequisitionRepository;
pub use repository::stock_card::{MovementExport, StockCardRepository};
pub use repository::sync_error::SyncErrorRepository;
pub use repository::sync_state::{SyncCursor, SyncStateRepository};
