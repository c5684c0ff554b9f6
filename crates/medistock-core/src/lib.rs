//! # medistock-core: Pure Business Logic for Medistock
//!
//! This crate is the **heart** of Medistock, a field inventory and
//! replenishment client for medical-supply facilities. It contains all
//! business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Medistock Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               Presentation (external collaborator)              │   │
//! │  │     Stock card list ──► Movement entry ──► R&R form editor      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                medistock-sync (Sync Engine)                     │   │
//! │  │     push requisitions / push movements / pull / backfill        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                medistock-db (Ledger Store)                      │   │
//! │  │     SQLite repositories, atomic append, embedded migrations     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ medistock-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌─────────────┐  ┌──────────┐  │   │
//! │  │   │   types   │  │  period   │  │ requisition │  │  ledger  │  │   │
//! │  │   │ StockCard │  │  Period   │  │ ItemColumns │  │ balance  │  │   │
//! │  │   │ Movement  │  │ cutoff=20 │  │ status rules│  │  checks  │  │   │
//! │  │   └───────────┘  └───────────┘  └─────────────┘  └──────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (StockCard, StockMovement, RnrForm, etc.)
//! - [`period`] - Fiscal period arithmetic (fixed cutoff day 20)
//! - [`ledger`] - Ledger balance invariant checks
//! - [`requisition`] - R&R item column computation and status machine
//! - [`validation`] - Boundary validation of user-entered input
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Signed Integer Quantities**: Ledger math is exact, never floating point
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod period;
pub mod requisition;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use medistock_core::Period` instead of
// `use medistock_core::period::Period`

pub use error::{CoreError, LedgerError, ValidationError};
pub use period::{Period, REPORT_CUTOFF_DAY};
pub use requisition::ItemColumns;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity accepted for a single movement or requisition amount.
///
/// ## Business Reason
/// Prevents accidental over-entry (e.g., a scanned barcode landing in the
/// quantity field). Field facilities never move a million units in one entry.
pub const MAX_ENTRY_QUANTITY: i64 = 999_999;
