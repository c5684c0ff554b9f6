//! # Ledger Invariant Checks
//!
//! Pure validation of a movement against its stock card, run by the atomic
//! append in the db crate BEFORE anything is written.
//!
//! ## The Balance Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Ledger Balance Invariant                            │
//! │                                                                         │
//! │  card.stock_on_hand = 50                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  append RECEIVE quantity +30, declared stock_on_hand 80                │
//! │       │                                                                 │
//! │       ├── 50 + 30 == 80 ?  ✓ persist movement, card balance ← 80       │
//! │       │                                                                 │
//! │  append ISSUE quantity -20, declared stock_on_hand 55                  │
//! │       │                                                                 │
//! │       └── 80 - 20 == 55 ?  ✗ BalanceMismatch, transaction aborts       │
//! │                                                                         │
//! │  After any sequence of appends, the cached balance equals the initial  │
//! │  balance plus the signed sum of every appended quantity.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::LedgerError;
use crate::types::{NewMovement, StockCard};

/// Result type for ledger checks.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Validates a movement against the card it will be appended to.
///
/// ## Checks, in order
/// 1. Quantity sign is consistent with the movement type
/// 2. Declared balance equals `card.stock_on_hand + quantity`
/// 3. Declared balance is not negative
/// 4. Lot fan-out matches the card's lot-tracking setting and sums to the
///    movement quantity
///
/// Storage does not enforce any of this; a movement that fails here must
/// never reach the database.
pub fn validate_movement(card: &StockCard, movement: &NewMovement) -> LedgerResult<()> {
    if movement.movement_type.is_additive() && movement.quantity < 0 {
        return Err(LedgerError::SignMismatch {
            movement_type: movement.movement_type.to_string(),
            quantity: movement.quantity,
        });
    }
    if movement.movement_type.is_subtractive() && movement.quantity > 0 {
        return Err(LedgerError::SignMismatch {
            movement_type: movement.movement_type.to_string(),
            quantity: movement.quantity,
        });
    }

    let expected = card.stock_on_hand + movement.quantity;
    if movement.stock_on_hand != expected {
        return Err(LedgerError::BalanceMismatch {
            expected,
            declared: movement.stock_on_hand,
        });
    }

    if movement.stock_on_hand < 0 {
        return Err(LedgerError::NegativeBalance {
            balance: movement.stock_on_hand,
        });
    }

    validate_lot_fanout(card, movement)
}

/// Validates the per-lot fan-out of a movement.
fn validate_lot_fanout(card: &StockCard, movement: &NewMovement) -> LedgerResult<()> {
    if !card.lot_tracked {
        if movement.lots.is_empty() {
            return Ok(());
        }
        return Err(LedgerError::LotsNotTracked);
    }

    if movement.lots.is_empty() {
        return Err(LedgerError::LotsRequired);
    }

    let lot_total: i64 = movement.lots.iter().map(|lot| lot.quantity).sum();
    if lot_total != movement.quantity {
        return Err(LedgerError::LotFanoutMismatch {
            movement_quantity: movement.quantity,
            lot_total,
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
    use crate::types::{MovementType, NewLotMovement};
    use chrono::{NaiveDate, Utc};

    fn card(stock_on_hand: i64, lot_tracked: bool) -> StockCard {
        StockCard {
            id: "card-1".into(),
            facility_id: "facility-1".into(),
            program_code: "EM".into(),
            product_code: "02A001".into(),
            product_name: "Paracetamol 500mg".into(),
            unit: "each".into(),
            stock_on_hand,
            lot_tracked,
            is_kit: false,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn movement(movement_type: MovementType, quantity: i64, stock_on_hand: i64) -> NewMovement {
        NewMovement {
            movement_type,
            quantity,
            stock_on_hand,
            reason_code: "DISTRICT_DDM".into(),
            document_number: None,
            signature: Some("ab".into()),
            movement_date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            lots: Vec::new(),
        }
    }

    #[test]
    fn test_valid_receive() {
        let card = card(50, false);
        let receive = movement(MovementType::Receive, 30, 80);

        assert!(validate_movement(&card, &receive).is_ok());
    }

    #[test]
    fn test_balance_mismatch_rejected() {
        let card = card(80, false);
        let issue = movement(MovementType::Issue, -20, 55);

        assert_eq!(
            validate_movement(&card, &issue),
            Err(LedgerError::BalanceMismatch {
                expected: 60,
                declared: 55,
            })
        );
    }

    #[test]
    fn test_sign_mismatch_rejected() {
        let card = card(50, false);

        let bad_receive = movement(MovementType::Receive, -10, 40);
        assert!(matches!(
            validate_movement(&card, &bad_receive),
            Err(LedgerError::SignMismatch { .. })
        ));

        let bad_issue = movement(MovementType::Issue, 10, 60);
        assert!(matches!(
            validate_movement(&card, &bad_issue),
            Err(LedgerError::SignMismatch { .. })
        ));
    }

    #[test]
    fn test_negative_balance_rejected() {
        let card = card(10, false);
        let issue = movement(MovementType::Issue, -15, -5);

        assert_eq!(
            validate_movement(&card, &issue),
            Err(LedgerError::NegativeBalance { balance: -5 })
        );
    }

    #[test]
    fn test_physical_inventory_may_go_either_way() {
        let card = card(50, false);

        let count_up = movement(MovementType::PhysicalInventory, 3, 53);
        assert!(validate_movement(&card, &count_up).is_ok());

        let count_down = movement(MovementType::PhysicalInventory, -7, 43);
        assert!(validate_movement(&card, &count_down).is_ok());
    }

    #[test]
    fn test_lot_fanout_must_sum_to_quantity() {
        let card = card(50, true);
        let mut receive = movement(MovementType::Receive, 30, 80);
        receive.lots = vec![
            NewLotMovement {
                lot_number: "LOT-A".into(),
                expiry_date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
                quantity: 20,
            },
            NewLotMovement {
                lot_number: "LOT-B".into(),
                expiry_date: NaiveDate::from_ymd_opt(2025, 9, 30).unwrap(),
                quantity: 5,
            },
        ];

        assert_eq!(
            validate_movement(&card, &receive),
            Err(LedgerError::LotFanoutMismatch {
                movement_quantity: 30,
                lot_total: 25,
            })
        );
    }

    #[test]
    fn test_lot_tracked_card_requires_lots() {
        let card = card(50, true);
        let receive = movement(MovementType::Receive, 30, 80);

        assert_eq!(
            validate_movement(&card, &receive),
            Err(LedgerError::LotsRequired)
        );
    }

    #[test]
    fn test_untracked_card_rejects_lots() {
        let card = card(50, false);
        let mut receive = movement(MovementType::Receive, 30, 80);
        receive.lots = vec![NewLotMovement {
            lot_number: "LOT-A".into(),
            expiry_date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            quantity: 30,
        }];

        assert_eq!(
            validate_movement(&card, &receive),
            Err(LedgerError::LotsNotTracked)
        );
    }
}
