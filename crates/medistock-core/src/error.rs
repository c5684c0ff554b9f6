//! # Error Types
//!
//! Domain-specific error types for medistock-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  medistock-core errors (this file)                                     │
//! │  ├── CoreError        - Business rule violations                       │
//! │  ├── LedgerError      - Ledger/lot invariant violations                │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  medistock-db errors (separate crate)                                  │
//! │  └── DbError          - Storage failures, duplicate period             │
//! │                                                                         │
//! │  medistock-sync errors (separate crate)                                │
//! │  └── SyncError        - Transport and pipeline failures                │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → SyncError               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product code, balances, status)
//! 3. Errors are enum variants, never String
//! 4. Invariant violations are distinct from user-input errors

use thiserror::Error;

use crate::types::RnrFormStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations. Invariant violations
/// ([`CoreError::Ledger`], [`CoreError::InvalidStatusTransition`]) are
/// programming/data-integrity errors and must abort the enclosing operation;
/// they are never silently corrected.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A ledger or lot invariant was violated.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Requisition status moved out of order.
    ///
    /// ## When This Occurs
    /// - Authorizing a form that is still DRAFT
    /// - Submitting an already SUBMITTED form
    /// - Any transition other than DRAFT → SUBMITTED → AUTHORIZED
    ///
    /// This is a programming error in the caller, not a user-input problem.
    #[error("Requisition cannot move from {from:?} to {to:?}")]
    InvalidStatusTransition {
        from: RnrFormStatus,
        to: RnrFormStatus,
    },

    /// The authorizing signer already signed as submitter.
    ///
    /// Authorization requires a second signature from a different signer.
    #[error("Signer '{signer}' cannot both submit and authorize the same requisition")]
    SameSignerAuthorization { signer: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Ledger Error
// =============================================================================

/// Ledger invariant violations.
///
/// Raised by [`crate::ledger::validate_movement`] before a movement is
/// persisted. A violation means the caller constructed an inconsistent entry;
/// the atomic append must abort and leave no partial ledger state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// The declared resulting balance does not match the running balance.
    #[error("Balance mismatch: ledger expects {expected}, movement declares {declared}")]
    BalanceMismatch { expected: i64, declared: i64 },

    /// The movement would drive the stock on hand below zero.
    #[error("Movement would leave negative stock on hand ({balance})")]
    NegativeBalance { balance: i64 },

    /// Quantity sign contradicts the movement type.
    ///
    /// RECEIVE / POSITIVE_ADJUST carry non-negative deltas, ISSUE /
    /// NEGATIVE_ADJUST non-positive ones. PHYSICAL_INVENTORY may carry either.
    #[error("Movement type {movement_type} cannot carry quantity {quantity}")]
    SignMismatch {
        movement_type: String,
        quantity: i64,
    },

    /// Lot quantities do not add up to the movement quantity.
    #[error("Lot fan-out mismatch: movement quantity {movement_quantity}, lot total {lot_total}")]
    LotFanoutMismatch {
        movement_quantity: i64,
        lot_total: i64,
    },

    /// A lot-tracked card received a movement without lot entries.
    #[error("Card is lot-tracked but movement carries no lot entries")]
    LotsRequired,

    /// Lot entries were supplied for a card without lot tracking.
    #[error("Card does not track lots but movement carries lot entries")]
    LotsNotTracked,

    /// A lot balance would go negative.
    #[error("Lot '{lot_number}' would go negative ({balance})")]
    NegativeLotBalance { lot_number: String, balance: i64 },
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements. The ledger
/// and requisition layers assume validated numeric input; these checks run at
/// the boundary before business logic does.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., non-numeric quantity, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_error_messages() {
        let err = LedgerError::BalanceMismatch {
            expected: 80,
            declared: 75,
        };
        assert_eq!(
            err.to_string(),
            "Balance mismatch: ledger expects 80, movement declares 75"
        );
    }

    #[test]
    fn test_status_transition_message() {
        let err = CoreError::InvalidStatusTransition {
            from: RnrFormStatus::Draft,
            to: RnrFormStatus::Authorized,
        };
        assert!(err.to_string().contains("Draft"));
        assert!(err.to_string().contains("Authorized"));
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
