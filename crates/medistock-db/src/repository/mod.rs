//! # Repository Modules
//!
//! Data access repositories, one per aggregate:
//!
//! - [`stock_card`] - the Ledger Store: cards, movements, lots
//! - [`requisition`] - R&R forms, items, signatures
//! - [`sync_error`] - the sync error ledger
//! - [`sync_state`] - persisted sync scalars (cursors, flags, timestamps)

pub mod requisition;
pub mod stock_card;
pub mod sync_error;
pub mod sync_state;
