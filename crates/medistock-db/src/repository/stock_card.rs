//! # Stock Card Repository (Ledger Store)
//!
//! Database operations for stock cards, the movement ledger, and lot
//! balances.
//!
//! ## The Atomic Append
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  append_movement Transaction                            │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   │                                                                     │
//! │   ├── 1. SELECT card (current cached balance)                          │
//! │   │                                                                     │
//! │   ├── 2. validate_movement (core):                                     │
//! │   │      declared balance == cached + signed quantity, result ≥ 0,     │
//! │   │      lot fan-out sums to the movement quantity                     │
//! │   │                                                                     │
//! │   ├── 3. INSERT INTO stock_movements (balance snapshot AFTER entry)    │
//! │   │                                                                     │
//! │   ├── 4. UPDATE stock_cards SET stock_on_hand = declared balance       │
//! │   │                                                                     │
//! │   └── 5. (lot-tracked) INSERT lot_movements + upsert lots_on_hand,     │
//! │          rejecting any lot balance that would go negative              │
//! │   │                                                                     │
//! │  COMMIT ← All five steps succeed or none are visible                   │
//! │                                                                         │
//! │  A failure at ANY step (storage error or invariant violation) drops    │
//! │  the transaction; no partial ledger state is ever observable.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use medistock_core::ledger::validate_movement;
use medistock_core::{LedgerError, LotOnHand, NewMovement, StockCard, StockMovement};

/// Columns of a full `stock_cards` row, in struct order.
const CARD_COLUMNS: &str = "id, facility_id, program_code, product_code, product_name, unit, \
     stock_on_hand, lot_tracked, is_kit, is_active, created_at, updated_at";

/// Columns of a full `stock_movements` row, in struct order.
const MOVEMENT_COLUMNS: &str = "id, stock_card_id, movement_type, quantity, stock_on_hand, \
     reason_code, document_number, signature, movement_date, created_time, synced";

/// One unsynced movement joined with its card, ready for the push batch.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MovementExport {
    pub id: String,
    pub facility_id: String,
    pub product_code: String,
    pub movement_type: medistock_core::MovementType,
    pub quantity: i64,
    pub stock_on_hand: i64,
    pub reason_code: String,
    pub document_number: Option<String>,
    pub signature: Option<String>,
    pub movement_date: NaiveDate,
    pub created_time: chrono::DateTime<Utc>,
}

/// Repository for the stock ledger.
#[derive(Debug, Clone)]
pub struct StockCardRepository {
    pool: SqlitePool,
}

impl StockCardRepository {
    /// Creates a new StockCardRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockCardRepository { pool }
    }

    // =========================================================================
    // Card CRUD
    // =========================================================================

    /// Inserts a new stock card.
    pub async fn insert(&self, card: &StockCard) -> DbResult<()> {
        debug!(product_code = %card.product_code, "Inserting stock card");

        sqlx::query(
            r#"
            INSERT INTO stock_cards (
                id, facility_id, program_code, product_code, product_name, unit,
                stock_on_hand, lot_tracked, is_kit, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&card.id)
        .bind(&card.facility_id)
        .bind(&card.program_code)
        .bind(&card.product_code)
        .bind(&card.product_name)
        .bind(&card.unit)
        .bind(card.stock_on_hand)
        .bind(card.lot_tracked)
        .bind(card.is_kit)
        .bind(card.is_active)
        .bind(card.created_at)
        .bind(card.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a card by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<StockCard>> {
        let card = sqlx::query_as::<_, StockCard>(&format!(
            "SELECT {CARD_COLUMNS} FROM stock_cards WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    /// Gets a card by facility and product code.
    pub async fn get_by_product_code(
        &self,
        facility_id: &str,
        product_code: &str,
    ) -> DbResult<Option<StockCard>> {
        let card = sqlx::query_as::<_, StockCard>(&format!(
            "SELECT {CARD_COLUMNS} FROM stock_cards WHERE facility_id = ?1 AND product_code = ?2"
        ))
        .bind(facility_id)
        .bind(product_code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    /// Lists active, non-kit cards for a program (the R&R item universe).
    pub async fn list_active_for_program(&self, program_code: &str) -> DbResult<Vec<StockCard>> {
        let cards = sqlx::query_as::<_, StockCard>(&format!(
            "SELECT {CARD_COLUMNS} FROM stock_cards \
             WHERE program_code = ?1 AND is_active = 1 AND is_kit = 0 \
             ORDER BY product_code"
        ))
        .bind(program_code)
        .fetch_all(&self.pool)
        .await?;

        Ok(cards)
    }

    /// Applies a product-catalog entry fetched from the server.
    ///
    /// Inserts the card if the facility doesn't have it yet; otherwise
    /// refreshes the catalog fields (name, unit, program, flags). The local
    /// cached balance is never touched - catalog pulls describe the product,
    /// not the facility's stock.
    pub async fn upsert_catalog_entry(&self, card: &StockCard) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_cards (
                id, facility_id, program_code, product_code, product_name, unit,
                stock_on_hand, lot_tracked, is_kit, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT (facility_id, product_code) DO UPDATE SET
                program_code = excluded.program_code,
                product_name = excluded.product_name,
                unit = excluded.unit,
                lot_tracked = excluded.lot_tracked,
                is_kit = excluded.is_kit,
                is_active = excluded.is_active,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&card.id)
        .bind(&card.facility_id)
        .bind(&card.program_code)
        .bind(&card.product_code)
        .bind(&card.product_name)
        .bind(&card.unit)
        .bind(card.stock_on_hand)
        .bind(card.lot_tracked)
        .bind(card.is_kit)
        .bind(card.is_active)
        .bind(card.created_at)
        .bind(card.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Archives a card (keeps its ledger history).
    pub async fn archive(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE stock_cards SET is_active = 0, updated_at = ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("StockCard", id));
        }

        Ok(())
    }

    // =========================================================================
    // Atomic Append
    // =========================================================================

    /// Appends a movement to a card's ledger.
    ///
    /// Validates the balance invariant, persists the movement (and its lot
    /// fan-out for lot-tracked cards), and updates the card's cached balance
    /// in ONE transaction. Returns the updated card.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - unknown card
    /// * `DbError::Domain(Ledger(..))` - invariant violation; nothing written
    pub async fn append_movement(
        &self,
        card_id: &str,
        movement: NewMovement,
    ) -> DbResult<StockCard> {
        let mut tx = self.pool.begin().await?;

        let mut card = sqlx::query_as::<_, StockCard>(&format!(
            "SELECT {CARD_COLUMNS} FROM stock_cards WHERE id = ?1"
        ))
        .bind(card_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("StockCard", card_id))?;

        validate_movement(&card, &movement)?;

        let movement_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(
            card_id = %card_id,
            movement_type = %movement.movement_type,
            quantity = movement.quantity,
            stock_on_hand = movement.stock_on_hand,
            "Appending movement"
        );

        sqlx::query(
            r#"
            INSERT INTO stock_movements (
                id, stock_card_id, movement_type, quantity, stock_on_hand,
                reason_code, document_number, signature, movement_date,
                created_time, synced
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0)
            "#,
        )
        .bind(&movement_id)
        .bind(card_id)
        .bind(movement.movement_type)
        .bind(movement.quantity)
        .bind(movement.stock_on_hand)
        .bind(&movement.reason_code)
        .bind(&movement.document_number)
        .bind(&movement.signature)
        .bind(movement.movement_date)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE stock_cards SET stock_on_hand = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(card_id)
            .bind(movement.stock_on_hand)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        if card.lot_tracked {
            for lot in &movement.lots {
                sqlx::query(
                    r#"
                    INSERT INTO lot_movements (id, stock_movement_id, lot_number, expiry_date, quantity)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                )
                .bind(Uuid::new_v4().to_string())
                .bind(&movement_id)
                .bind(&lot.lot_number)
                .bind(lot.expiry_date)
                .bind(lot.quantity)
                .execute(&mut *tx)
                .await?;

                sqlx::query(
                    r#"
                    INSERT INTO lots_on_hand (stock_card_id, lot_number, expiry_date, quantity)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT (stock_card_id, lot_number) DO UPDATE SET
                        quantity = lots_on_hand.quantity + excluded.quantity,
                        expiry_date = excluded.expiry_date
                    "#,
                )
                .bind(card_id)
                .bind(&lot.lot_number)
                .bind(lot.expiry_date)
                .bind(lot.quantity)
                .execute(&mut *tx)
                .await?;

                let balance: i64 = sqlx::query_scalar(
                    "SELECT quantity FROM lots_on_hand WHERE stock_card_id = ?1 AND lot_number = ?2",
                )
                .bind(card_id)
                .bind(&lot.lot_number)
                .fetch_one(&mut *tx)
                .await?;

                if balance < 0 {
                    // Dropping the transaction rolls everything back
                    return Err(LedgerError::NegativeLotBalance {
                        lot_number: lot.lot_number.clone(),
                        balance,
                    }
                    .into());
                }
            }
        }

        tx.commit().await?;

        card.stock_on_hand = movement.stock_on_hand;
        card.updated_at = now;
        Ok(card)
    }

    // =========================================================================
    // Movement Reads
    // =========================================================================

    /// Movements strictly inside the window `(begin, end]` on the business
    /// date, ordered by movement date then creation time.
    pub async fn movements_in_window(
        &self,
        card_id: &str,
        begin: NaiveDate,
        end: NaiveDate,
    ) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements \
             WHERE stock_card_id = ?1 AND movement_date > ?2 AND movement_date <= ?3 \
             ORDER BY movement_date ASC, created_time ASC"
        ))
        .bind(card_id)
        .bind(begin)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// The card's `n` most recent movements, by insertion order.
    pub async fn recent_movements(&self, card_id: &str, n: u32) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements \
             WHERE stock_card_id = ?1 \
             ORDER BY created_time DESC, id DESC \
             LIMIT ?2"
        ))
        .bind(card_id)
        .bind(n)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// All not-yet-synced movements across all cards, joined with the card
    /// for the facility-keyed push batch. Oldest first.
    pub async fn list_unsynced(&self) -> DbResult<Vec<MovementExport>> {
        let movements = sqlx::query_as::<_, MovementExport>(
            r#"
            SELECT
                m.id, c.facility_id, c.product_code,
                m.movement_type, m.quantity, m.stock_on_hand,
                m.reason_code, m.document_number, m.signature,
                m.movement_date, m.created_time
            FROM stock_movements m
            INNER JOIN stock_cards c ON c.id = m.stock_card_id
            WHERE m.synced = 0
            ORDER BY m.created_time ASC, m.id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Marks movements as synced.
    ///
    /// Idempotent: already-synced rows are left untouched. Returns the number
    /// of rows that actually flipped.
    pub async fn mark_synced(&self, ids: &[String]) -> DbResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut flipped = 0;

        for id in ids {
            let result =
                sqlx::query("UPDATE stock_movements SET synced = 1 WHERE id = ?1 AND synced = 0")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            flipped += result.rows_affected();
        }

        tx.commit().await?;
        Ok(flipped)
    }

    /// Inserts server-fetched historical movements, already marked synced.
    ///
    /// Rows are keyed by their server-assigned ids; `INSERT OR IGNORE` makes
    /// a re-fetched backfill chunk idempotent. Card balances are NOT touched:
    /// history rows carry their own balance snapshots.
    pub async fn insert_history(&self, movements: &[StockMovement]) -> DbResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for movement in movements {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO stock_movements (
                    id, stock_card_id, movement_type, quantity, stock_on_hand,
                    reason_code, document_number, signature, movement_date,
                    created_time, synced
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 1)
                "#,
            )
            .bind(&movement.id)
            .bind(&movement.stock_card_id)
            .bind(movement.movement_type)
            .bind(movement.quantity)
            .bind(movement.stock_on_hand)
            .bind(&movement.reason_code)
            .bind(&movement.document_number)
            .bind(&movement.signature)
            .bind(movement.movement_date)
            .bind(movement.created_time)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    // =========================================================================
    // Lot Reads
    // =========================================================================

    /// Non-zero lot balances for a card, soonest expiry first.
    pub async fn lot_balances(&self, card_id: &str) -> DbResult<Vec<LotOnHand>> {
        let lots = sqlx::query_as::<_, LotOnHand>(
            "SELECT stock_card_id, lot_number, expiry_date, quantity \
             FROM lots_on_hand \
             WHERE stock_card_id = ?1 AND quantity <> 0 \
             ORDER BY expiry_date ASC",
        )
        .bind(card_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lots)
    }
}

/// Helper to generate a new stock card ID.
pub fn generate_card_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use medistock_core::{MovementType, NewLotMovement};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn card(stock_on_hand: i64, lot_tracked: bool) -> StockCard {
        let now = Utc::now();
        StockCard {
            id: generate_card_id(),
            facility_id: "facility-1".into(),
            program_code: "EM".into(),
            product_code: "02A001".into(),
            product_name: "Paracetamol 500mg".into(),
            unit: "each".into(),
            stock_on_hand,
            lot_tracked,
            is_kit: false,
            is_active: true,
            created_at: now,
            updated_at: now,
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
            movement_date: date(2024, 3, 10),
            lots: Vec::new(),
        }
    }

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_append_updates_running_balance() {
        let db = db().await;
        let repo = db.stock_cards();
        let seed = card(50, false);
        repo.insert(&seed).await.unwrap();

        let after_receive = repo
            .append_movement(&seed.id, movement(MovementType::Receive, 30, 80))
            .await
            .unwrap();
        assert_eq!(after_receive.stock_on_hand, 80);

        let after_issue = repo
            .append_movement(&seed.id, movement(MovementType::Issue, -20, 60))
            .await
            .unwrap();
        assert_eq!(after_issue.stock_on_hand, 60);

        // Whole-range window returns both entries in insertion order with
        // their balance snapshots
        let window = repo
            .movements_in_window(&seed.id, date(2024, 1, 1), date(2024, 12, 31))
            .await
            .unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].movement_type, MovementType::Receive);
        assert_eq!(window[0].stock_on_hand, 80);
        assert_eq!(window[1].movement_type, MovementType::Issue);
        assert_eq!(window[1].stock_on_hand, 60);
    }

    #[tokio::test]
    async fn test_append_balance_mismatch_writes_nothing() {
        let db = db().await;
        let repo = db.stock_cards();
        let seed = card(50, false);
        repo.insert(&seed).await.unwrap();

        let err = repo
            .append_movement(&seed.id, movement(MovementType::Receive, 30, 75))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(_)));

        // Nothing persisted: balance unchanged, ledger empty
        let unchanged = repo.get_by_id(&seed.id).await.unwrap().unwrap();
        assert_eq!(unchanged.stock_on_hand, 50);

        let recent = repo.recent_movements(&seed.id, 10).await.unwrap();
        assert!(recent.is_empty());
    }

    #[tokio::test]
    async fn test_lot_fanout_and_balance_invariant() {
        let db = db().await;
        let repo = db.stock_cards();
        let seed = card(0, true);
        repo.insert(&seed).await.unwrap();

        let mut receive = movement(MovementType::Receive, 30, 30);
        receive.lots = vec![
            NewLotMovement {
                lot_number: "LOT-A".into(),
                expiry_date: date(2025, 6, 30),
                quantity: 20,
            },
            NewLotMovement {
                lot_number: "LOT-B".into(),
                expiry_date: date(2025, 9, 30),
                quantity: 10,
            },
        ];
        let updated = repo.append_movement(&seed.id, receive).await.unwrap();

        let lots = repo.lot_balances(&seed.id).await.unwrap();
        assert_eq!(lots.len(), 2);
        let lot_total: i64 = lots.iter().map(|l| l.quantity).sum();
        assert_eq!(lot_total, updated.stock_on_hand);

        // Issuing a whole lot drops it from the non-zero balance list
        let mut issue = movement(MovementType::Issue, -10, 20);
        issue.lots = vec![NewLotMovement {
            lot_number: "LOT-B".into(),
            expiry_date: date(2025, 9, 30),
            quantity: -10,
        }];
        repo.append_movement(&seed.id, issue).await.unwrap();

        let lots = repo.lot_balances(&seed.id).await.unwrap();
        assert_eq!(lots.len(), 1);
        assert_eq!(lots[0].lot_number, "LOT-A");
    }

    #[tokio::test]
    async fn test_negative_lot_balance_rolls_back_everything() {
        let db = db().await;
        let repo = db.stock_cards();
        let seed = card(0, true);
        repo.insert(&seed).await.unwrap();

        let mut receive = movement(MovementType::Receive, 10, 10);
        receive.lots = vec![NewLotMovement {
            lot_number: "LOT-A".into(),
            expiry_date: date(2025, 6, 30),
            quantity: 10,
        }];
        repo.append_movement(&seed.id, receive).await.unwrap();

        // Card-level balance stays ≥ 0 but LOT-B goes negative
        let mut issue = movement(MovementType::Issue, -5, 5);
        issue.lots = vec![NewLotMovement {
            lot_number: "LOT-B".into(),
            expiry_date: date(2025, 9, 30),
            quantity: -5,
        }];
        let err = repo.append_movement(&seed.id, issue).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(_)));

        // The whole append rolled back: balance and ledger untouched
        let unchanged = repo.get_by_id(&seed.id).await.unwrap().unwrap();
        assert_eq!(unchanged.stock_on_hand, 10);
        assert_eq!(repo.recent_movements(&seed.id, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mark_synced_is_idempotent() {
        let db = db().await;
        let repo = db.stock_cards();
        let seed = card(0, false);
        repo.insert(&seed).await.unwrap();

        repo.append_movement(&seed.id, movement(MovementType::Receive, 5, 5))
            .await
            .unwrap();

        let unsynced = repo.list_unsynced().await.unwrap();
        assert_eq!(unsynced.len(), 1);
        let ids: Vec<String> = unsynced.iter().map(|m| m.id.clone()).collect();

        assert_eq!(repo.mark_synced(&ids).await.unwrap(), 1);
        // Second mark is a no-op
        assert_eq!(repo.mark_synced(&ids).await.unwrap(), 0);
        assert!(repo.list_unsynced().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_history_is_idempotent() {
        let db = db().await;
        let repo = db.stock_cards();
        let seed = card(0, false);
        repo.insert(&seed).await.unwrap();

        let history = vec![StockMovement {
            id: "server-movement-1".into(),
            stock_card_id: seed.id.clone(),
            movement_type: MovementType::Receive,
            quantity: 12,
            stock_on_hand: 12,
            reason_code: "DISTRICT_DDM".into(),
            document_number: None,
            signature: None,
            movement_date: date(2023, 7, 3),
            created_time: Utc::now(),
            synced: true,
        }];

        assert_eq!(repo.insert_history(&history).await.unwrap(), 1);
        // Re-fetching the same chunk inserts nothing new
        assert_eq!(repo.insert_history(&history).await.unwrap(), 0);

        // History rows never enter the push queue
        assert!(repo.list_unsynced().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_window_bounds_are_exclusive_inclusive() {
        let db = db().await;
        let repo = db.stock_cards();
        let seed = card(0, false);
        repo.insert(&seed).await.unwrap();

        let mut on_begin = movement(MovementType::Receive, 5, 5);
        on_begin.movement_date = date(2024, 2, 21);
        repo.append_movement(&seed.id, on_begin).await.unwrap();

        let mut on_end = movement(MovementType::Receive, 5, 10);
        on_end.movement_date = date(2024, 3, 20);
        repo.append_movement(&seed.id, on_end).await.unwrap();

        let window = repo
            .movements_in_window(&seed.id, date(2024, 2, 21), date(2024, 3, 20))
            .await
            .unwrap();

        // (begin, end]: the begin-date entry is outside, the end-date entry inside
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].movement_date, date(2024, 3, 20));
    }

    #[tokio::test]
    async fn test_catalog_upsert_preserves_balance() {
        let db = db().await;
        let repo = db.stock_cards();
        let seed = card(0, false);
        repo.insert(&seed).await.unwrap();
        repo.append_movement(&seed.id, movement(MovementType::Receive, 7, 7))
            .await
            .unwrap();

        let mut refreshed = seed.clone();
        refreshed.product_name = "Paracetamol 500mg (renamed)".into();
        refreshed.stock_on_hand = 0; // catalog entries carry no stock
        repo.upsert_catalog_entry(&refreshed).await.unwrap();

        let card = repo.get_by_id(&seed.id).await.unwrap().unwrap();
        assert_eq!(card.product_name, "Paracetamol 500mg (renamed)");
        assert_eq!(card.stock_on_hand, 7);
    }
}
