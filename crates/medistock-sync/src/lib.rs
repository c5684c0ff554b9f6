//! # medistock-sync: Synchronization Engine for Medistock
//!
//! Push/pull reconciliation between the local SQLite ledger and the
//! authoritative server, built for intermittent connectivity.
//!
//! ## The Three Pipelines
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Sync Pipelines                                  │
//! │                                                                         │
//! │  REQUISITIONS (per-record)                                             │
//! │    AUTHORIZED unsynced forms → submit one by one → mark each synced    │
//! │    A failed form is recorded in the error ledger; the rest continue.   │
//! │                                                                         │
//! │  STOCK MOVEMENTS (all-or-nothing batch)                                │
//! │    All unsynced movements → ONE facility-keyed call → all marked or    │
//! │    none, with a single batch-level error record.                       │
//! │                                                                         │
//! │  PULL + BACKFILL                                                       │
//! │    Product catalog / server forms applied locally; history fetched     │
//! │    one month at a time behind a persisted resume cursor.               │
//! │                                                                         │
//! │  Each category is guarded by its own gate: a sync attempt while one    │
//! │  is already in flight is a silent no-op, never a queue entry.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod gate;
pub mod status;
pub mod transport;

pub use config::{FacilityConfig, SyncConfig, SyncSettings};
pub use engine::{BackfillReport, PullReport, PushReport, SyncContext, SyncEngine, SyncRun};
pub use error::{SyncError, SyncResult};
pub use gate::CategoryGates;
pub use status::SyncStatus;
pub use transport::{
    ProductDto, RemoteTransport, RequisitionDto, RequisitionItemDto, StockMovementDto,
    TransportError, TransportResult, BOUNDARY_DATE_FORMAT,
};
