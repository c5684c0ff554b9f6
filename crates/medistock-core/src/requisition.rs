//! # Requisition Math and Workflow Rules
//!
//! Pure computation of R&R line-item columns from a ledger window, plus the
//! form status machine. Persistence lives in the db crate; everything here is
//! deterministic and I/O-free.
//!
//! ## Item Column Derivation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │            From Ledger Window to R&R Line Item                          │
//! │                                                                         │
//! │  Window movements (ordered by movement_date, then created_time):       │
//! │                                                                         │
//! │    RECEIVE  +30  soh=80      initial_amount = 80 - (+30) = 50          │
//! │    ISSUE    -20  soh=60      received   = 30                           │
//! │    NEG.ADJ   -5  soh=55      issued     = 20   (reported positive)     │
//! │                              adjustment = -5   (net, signed)           │
//! │                              inventory  = 55   (last snapshot)         │
//! │                                                                         │
//! │  Empty window: initial_amount = inventory = card's current balance.    │
//! │                                                                         │
//! │  Because `quantity` is the signed delta for EVERY movement type, the   │
//! │  initial_amount formula holds even when the first entry in the window  │
//! │  is a physical-inventory reset.                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult};
use crate::types::{MovementType, RnrFormStatus, RnrSignature, SignatureRole, StockMovement};

// =============================================================================
// Item Columns
// =============================================================================

/// Ledger-derived columns of one R&R line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemColumns {
    /// Balance immediately before the window.
    pub initial_amount: i64,
    /// Total received inside the window.
    pub received: i64,
    /// Total issued inside the window, as a positive number.
    pub issued: i64,
    /// Net adjustment inside the window (adjustments + count corrections).
    pub adjustment: i64,
    /// Closing balance.
    pub inventory: i64,
}

/// Computes the line-item columns for one stock card over a period window.
///
/// `window` must be the card's movements inside the period, ordered by
/// movement date then creation time (the order the ledger store returns).
/// `current_balance` is the card's cached balance, used when the window is
/// empty.
pub fn compute_item_columns(current_balance: i64, window: &[StockMovement]) -> ItemColumns {
    let (Some(first), Some(last)) = (window.first(), window.last()) else {
        return ItemColumns {
            initial_amount: current_balance,
            received: 0,
            issued: 0,
            adjustment: 0,
            inventory: current_balance,
        };
    };

    let mut received = 0;
    let mut issued = 0;
    let mut adjustment = 0;

    for movement in window {
        match movement.movement_type {
            MovementType::Receive => received += movement.quantity,
            MovementType::Issue => issued += -movement.quantity,
            MovementType::PositiveAdjust
            | MovementType::NegativeAdjust
            | MovementType::PhysicalInventory => adjustment += movement.quantity,
        }
    }

    ItemColumns {
        initial_amount: first.stock_on_hand - first.quantity,
        received,
        issued,
        adjustment,
        inventory: last.stock_on_hand,
    }
}

// =============================================================================
// Status Machine
// =============================================================================

/// Validates a requisition status transition.
///
/// The only legal path is DRAFT → SUBMITTED → AUTHORIZED. Anything else is a
/// programming error in the caller and is rejected with
/// [`CoreError::InvalidStatusTransition`], never silently corrected.
pub fn validate_transition(from: RnrFormStatus, to: RnrFormStatus) -> CoreResult<()> {
    let legal = matches!(
        (from, to),
        (RnrFormStatus::Draft, RnrFormStatus::Submitted)
            | (RnrFormStatus::Submitted, RnrFormStatus::Authorized)
    );

    if legal {
        Ok(())
    } else {
        Err(CoreError::InvalidStatusTransition { from, to })
    }
}

/// Validates the authorizing signature against the form's existing ones.
///
/// Authorization requires a second signature from a different signer than the
/// submitter; the same person cannot fill both roles on one form.
pub fn validate_authorizer(existing: &[RnrSignature], approver: &str) -> CoreResult<()> {
    let approver = approver.trim();

    let same_signer = existing
        .iter()
        .any(|sig| sig.role == SignatureRole::Submitter && sig.signer == approver);

    if same_signer {
        return Err(CoreError::SameSignerAuthorization {
            signer: approver.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn movement(
        movement_type: MovementType,
        quantity: i64,
        stock_on_hand: i64,
        day: u32,
    ) -> StockMovement {
        StockMovement {
            id: format!("movement-{day}"),
            stock_card_id: "card-1".into(),
            movement_type,
            quantity,
            stock_on_hand,
            reason_code: "DISTRICT_DDM".into(),
            document_number: None,
            signature: None,
            movement_date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            created_time: Utc::now(),
            synced: false,
        }
    }

    fn signature(signer: &str, role: SignatureRole) -> RnrSignature {
        RnrSignature {
            id: format!("sig-{signer}"),
            requisition_id: "form-1".into(),
            signer: signer.into(),
            role,
            signed_at: Utc::now(),
        }
    }

    #[test]
    fn test_columns_from_window() {
        let window = vec![
            movement(MovementType::Receive, 30, 80, 2),
            movement(MovementType::Issue, -20, 60, 5),
            movement(MovementType::NegativeAdjust, -5, 55, 9),
        ];

        let columns = compute_item_columns(55, &window);

        assert_eq!(columns.initial_amount, 50);
        assert_eq!(columns.received, 30);
        assert_eq!(columns.issued, 20);
        assert_eq!(columns.adjustment, -5);
        assert_eq!(columns.inventory, 55);
    }

    #[test]
    fn test_columns_empty_window_uses_current_balance() {
        let columns = compute_item_columns(42, &[]);

        assert_eq!(columns.initial_amount, 42);
        assert_eq!(columns.received, 0);
        assert_eq!(columns.issued, 0);
        assert_eq!(columns.adjustment, 0);
        assert_eq!(columns.inventory, 42);
    }

    #[test]
    fn test_columns_physical_inventory_first_in_window() {
        // Count corrected the balance from 50 down to 43 at the head of the
        // window; initial_amount must still recover the pre-count balance.
        let window = vec![
            movement(MovementType::PhysicalInventory, -7, 43, 1),
            movement(MovementType::Receive, 10, 53, 8),
        ];

        let columns = compute_item_columns(53, &window);

        assert_eq!(columns.initial_amount, 50);
        assert_eq!(columns.received, 10);
        assert_eq!(columns.adjustment, -7);
        assert_eq!(columns.inventory, 53);
    }

    #[test]
    fn test_transition_happy_path() {
        assert!(validate_transition(RnrFormStatus::Draft, RnrFormStatus::Submitted).is_ok());
        assert!(validate_transition(RnrFormStatus::Submitted, RnrFormStatus::Authorized).is_ok());
    }

    #[test]
    fn test_transition_out_of_order_rejected() {
        // Skipping SUBMITTED is a programming error
        let err = validate_transition(RnrFormStatus::Draft, RnrFormStatus::Authorized).unwrap_err();
        assert!(matches!(err, CoreError::InvalidStatusTransition { .. }));

        assert!(validate_transition(RnrFormStatus::Authorized, RnrFormStatus::Submitted).is_err());
        assert!(validate_transition(RnrFormStatus::Submitted, RnrFormStatus::Submitted).is_err());
    }

    #[test]
    fn test_authorizer_must_differ_from_submitter() {
        let existing = vec![signature("maria", SignatureRole::Submitter)];

        assert!(validate_authorizer(&existing, "joao").is_ok());

        let err = validate_authorizer(&existing, "maria").unwrap_err();
        assert!(matches!(err, CoreError::SameSignerAuthorization { .. }));
    }
}
