//! # Requisition Repository
//!
//! Database operations for R&R forms: period-based generation, the status
//! workflow, and the sync push queue.
//!
//! ## Form Generation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 build_for_period Transaction                            │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   │                                                                     │
//! │   ├── 1. Unique lookup: non-deleted form for (program, period)?        │
//! │   │      └── exists → DuplicatePeriod, abort                           │
//! │   │                                                                     │
//! │   ├── 2. INSERT the DRAFT form                                         │
//! │   │                                                                     │
//! │   ├── 3. For every active, non-kit card of the program:                │
//! │   │      read window movements (period.begin, period.end],             │
//! │   │      compute columns (core), INSERT the line item                  │
//! │   │                                                                     │
//! │   └── 4. INSERT empty base-info rows from the program profile          │
//! │   │                                                                     │
//! │  COMMIT ← A form without its items is never observable                 │
//! │                                                                         │
//! │  The duplicate check runs inside the SAME transaction as the create,   │
//! │  so a concurrent build cannot slip between check and insert.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Status Workflow
//! Transitions are validated by the core status machine and additionally
//! guarded by `WHERE status = ?` on the UPDATE, the same double protection
//! the ledger append uses.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use medistock_core::requisition::{compute_item_columns, validate_authorizer, validate_transition};
use medistock_core::validation::validate_signature;
use medistock_core::{
    BaseInfoItem, CoreError, Period, ProgramProfile, RnrForm, RnrFormItem, RnrFormStatus,
    RnrSignature, SignatureRole, StockCard, StockMovement,
};

/// Columns of a full `requisitions` row, in struct order.
const FORM_COLUMNS: &str = "id, program_code, period_begin, period_end, status, emergency, \
     synced, deleted, created_at, updated_at";

/// Columns of a full `requisition_items` row, in struct order.
const ITEM_COLUMNS: &str = "id, requisition_id, product_code, product_name, initial_amount, \
     received, issued, adjustment, inventory, request_amount, approved_amount";

/// Repository for requisition forms.
#[derive(Debug, Clone)]
pub struct RequisitionRepository {
    pool: SqlitePool,
}

impl RequisitionRepository {
    /// Creates a new RequisitionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RequisitionRepository { pool }
    }

    // =========================================================================
    // Generation
    // =========================================================================

    /// Generates the R&R form for a program and period.
    ///
    /// Derives one line item per active, non-kit stock card of the program
    /// from the ledger window, plus the program profile's base-info rows, all
    /// in one transaction.
    ///
    /// ## Errors
    /// * `DbError::DuplicatePeriod` - a non-deleted form already exists for
    ///   this (program, period)
    pub async fn build_for_period(
        &self,
        profile: &ProgramProfile,
        period: Period,
        emergency: bool,
    ) -> DbResult<RnrForm> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<String> = sqlx::query_scalar(
            "SELECT id FROM requisitions \
             WHERE program_code = ?1 AND period_begin = ?2 AND deleted = 0",
        )
        .bind(&profile.code)
        .bind(period.begin)
        .fetch_optional(&mut *tx)
        .await?;

        if existing.is_some() {
            return Err(DbError::DuplicatePeriod {
                program_code: profile.code.clone(),
                period_begin: period.begin,
            });
        }

        let now = Utc::now();
        let form = RnrForm {
            id: Uuid::new_v4().to_string(),
            program_code: profile.code.clone(),
            period_begin: period.begin,
            period_end: period.end,
            status: RnrFormStatus::Draft,
            emergency,
            synced: false,
            deleted: false,
            created_at: now,
            updated_at: now,
        };

        debug!(
            program = %profile.code,
            period = %period,
            "Generating requisition form"
        );

        sqlx::query(
            r#"
            INSERT INTO requisitions (
                id, program_code, period_begin, period_end, status,
                emergency, synced, deleted, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&form.id)
        .bind(&form.program_code)
        .bind(form.period_begin)
        .bind(form.period_end)
        .bind(form.status)
        .bind(form.emergency)
        .bind(form.synced)
        .bind(form.deleted)
        .bind(form.created_at)
        .bind(form.updated_at)
        .execute(&mut *tx)
        .await?;

        let cards = sqlx::query_as::<_, StockCard>(
            "SELECT id, facility_id, program_code, product_code, product_name, unit, \
                    stock_on_hand, lot_tracked, is_kit, is_active, created_at, updated_at \
             FROM stock_cards \
             WHERE program_code = ?1 AND is_active = 1 AND is_kit = 0 \
             ORDER BY product_code",
        )
        .bind(&profile.code)
        .fetch_all(&mut *tx)
        .await?;

        for card in &cards {
            let window = sqlx::query_as::<_, StockMovement>(
                "SELECT id, stock_card_id, movement_type, quantity, stock_on_hand, \
                        reason_code, document_number, signature, movement_date, \
                        created_time, synced \
                 FROM stock_movements \
                 WHERE stock_card_id = ?1 AND movement_date > ?2 AND movement_date <= ?3 \
                 ORDER BY movement_date ASC, created_time ASC",
            )
            .bind(&card.id)
            .bind(period.begin)
            .bind(period.end)
            .fetch_all(&mut *tx)
            .await?;

            let columns = compute_item_columns(card.stock_on_hand, &window);

            sqlx::query(
                r#"
                INSERT INTO requisition_items (
                    id, requisition_id, product_code, product_name,
                    initial_amount, received, issued, adjustment, inventory,
                    request_amount, approved_amount
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL, NULL)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&form.id)
            .bind(&card.product_code)
            .bind(&card.product_name)
            .bind(columns.initial_amount)
            .bind(columns.received)
            .bind(columns.issued)
            .bind(columns.adjustment)
            .bind(columns.inventory)
            .execute(&mut *tx)
            .await?;
        }

        for field in &profile.base_info_fields {
            sqlx::query(
                "INSERT INTO base_info_items (id, requisition_id, name, value) \
                 VALUES (?1, ?2, ?3, NULL)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&form.id)
            .bind(field)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(form_id = %form.id, items = cards.len(), "Requisition form generated");
        Ok(form)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a form by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<RnrForm>> {
        let form = sqlx::query_as::<_, RnrForm>(&format!(
            "SELECT {FORM_COLUMNS} FROM requisitions WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(form)
    }

    /// Gets the non-deleted form for (program, period begin), if any.
    pub async fn get_for_period(
        &self,
        program_code: &str,
        period_begin: chrono::NaiveDate,
    ) -> DbResult<Option<RnrForm>> {
        let form = sqlx::query_as::<_, RnrForm>(&format!(
            "SELECT {FORM_COLUMNS} FROM requisitions \
             WHERE program_code = ?1 AND period_begin = ?2 AND deleted = 0"
        ))
        .bind(program_code)
        .bind(period_begin)
        .fetch_optional(&self.pool)
        .await?;

        Ok(form)
    }

    /// Gets the line items of a form, in product order.
    pub async fn items(&self, form_id: &str) -> DbResult<Vec<RnrFormItem>> {
        let items = sqlx::query_as::<_, RnrFormItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM requisition_items \
             WHERE requisition_id = ?1 ORDER BY product_code"
        ))
        .bind(form_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets the base-info rows of a form.
    pub async fn base_info(&self, form_id: &str) -> DbResult<Vec<BaseInfoItem>> {
        let rows = sqlx::query_as::<_, BaseInfoItem>(
            "SELECT id, requisition_id, name, value FROM base_info_items \
             WHERE requisition_id = ?1 ORDER BY name",
        )
        .bind(form_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Gets the signatures of a form, oldest first.
    pub async fn signatures(&self, form_id: &str) -> DbResult<Vec<RnrSignature>> {
        let signatures = sqlx::query_as::<_, RnrSignature>(
            "SELECT id, requisition_id, signer, role, signed_at \
             FROM requisition_signatures \
             WHERE requisition_id = ?1 ORDER BY signed_at ASC",
        )
        .bind(form_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(signatures)
    }

    // =========================================================================
    // User Edits
    // =========================================================================

    /// Writes user-entered request/approved amounts on a line item.
    ///
    /// Only items of DRAFT forms are editable.
    pub async fn set_item_amounts(
        &self,
        item_id: &str,
        request_amount: Option<i64>,
        approved_amount: Option<i64>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE requisition_items SET request_amount = ?2, approved_amount = ?3 \
             WHERE id = ?1 AND requisition_id IN \
                 (SELECT id FROM requisitions WHERE status = 'draft' AND deleted = 0)",
        )
        .bind(item_id)
        .bind(request_amount)
        .bind(approved_amount)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("RnrFormItem (editable)", item_id));
        }

        Ok(())
    }

    /// Writes a user-entered base-info value.
    pub async fn set_base_info_value(&self, base_info_id: &str, value: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE base_info_items SET value = ?2 \
             WHERE id = ?1 AND requisition_id IN \
                 (SELECT id FROM requisitions WHERE status = 'draft' AND deleted = 0)",
        )
        .bind(base_info_id)
        .bind(value)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("BaseInfoItem (editable)", base_info_id));
        }

        Ok(())
    }

    // =========================================================================
    // Status Workflow
    // =========================================================================

    /// Submits a DRAFT form with the submitter's signature.
    pub async fn submit(&self, form_id: &str, signer: &str) -> DbResult<RnrForm> {
        validate_signature(signer).map_err(CoreError::from)?;

        let mut tx = self.pool.begin().await?;

        let form = sqlx::query_as::<_, RnrForm>(&format!(
            "SELECT {FORM_COLUMNS} FROM requisitions WHERE id = ?1 AND deleted = 0"
        ))
        .bind(form_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("RnrForm", form_id))?;

        validate_transition(form.status, RnrFormStatus::Submitted)?;

        self.insert_signature(&mut tx, form_id, signer, SignatureRole::Submitter)
            .await?;

        let now = Utc::now();
        sqlx::query(
            "UPDATE requisitions SET status = 'submitted', updated_at = ?2 \
             WHERE id = ?1 AND status = 'draft'",
        )
        .bind(form_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(form_id = %form_id, "Requisition submitted");
        Ok(RnrForm {
            status: RnrFormStatus::Submitted,
            updated_at: now,
            ..form
        })
    }

    /// Authorizes a SUBMITTED form with a second signature.
    ///
    /// The approver must differ from the submitter. Authorizing a form that
    /// is not SUBMITTED is a programming error
    /// ([`CoreError::InvalidStatusTransition`]), distinct from user-input
    /// validation failures.
    pub async fn authorize(&self, form_id: &str, signer: &str) -> DbResult<RnrForm> {
        validate_signature(signer).map_err(CoreError::from)?;

        let mut tx = self.pool.begin().await?;

        let form = sqlx::query_as::<_, RnrForm>(&format!(
            "SELECT {FORM_COLUMNS} FROM requisitions WHERE id = ?1 AND deleted = 0"
        ))
        .bind(form_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("RnrForm", form_id))?;

        validate_transition(form.status, RnrFormStatus::Authorized)?;

        let existing = sqlx::query_as::<_, RnrSignature>(
            "SELECT id, requisition_id, signer, role, signed_at \
             FROM requisition_signatures WHERE requisition_id = ?1",
        )
        .bind(form_id)
        .fetch_all(&mut *tx)
        .await?;

        validate_authorizer(&existing, signer)?;

        self.insert_signature(&mut tx, form_id, signer, SignatureRole::Approver)
            .await?;

        let now = Utc::now();
        sqlx::query(
            "UPDATE requisitions SET status = 'authorized', updated_at = ?2 \
             WHERE id = ?1 AND status = 'submitted'",
        )
        .bind(form_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(form_id = %form_id, "Requisition authorized");
        Ok(RnrForm {
            status: RnrFormStatus::Authorized,
            updated_at: now,
            ..form
        })
    }

    async fn insert_signature(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        form_id: &str,
        signer: &str,
        role: SignatureRole,
    ) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO requisition_signatures (id, requisition_id, signer, role, signed_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(form_id)
        .bind(signer.trim())
        .bind(role)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Soft-deletes an abandoned DRAFT form.
    ///
    /// Submitted and authorized forms are part of the record and cannot be
    /// deleted.
    pub async fn soft_delete(&self, form_id: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE requisitions SET deleted = 1, updated_at = ?2 \
             WHERE id = ?1 AND status = 'draft' AND deleted = 0",
        )
        .bind(form_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("RnrForm (draft)", form_id));
        }

        Ok(())
    }

    // =========================================================================
    // Sync Queue
    // =========================================================================

    /// AUTHORIZED, not-yet-synced forms - the push queue, oldest first.
    pub async fn list_authorized_unsynced(&self) -> DbResult<Vec<RnrForm>> {
        let forms = sqlx::query_as::<_, RnrForm>(&format!(
            "SELECT {FORM_COLUMNS} FROM requisitions \
             WHERE status = 'authorized' AND synced = 0 AND deleted = 0 \
             ORDER BY period_begin ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(forms)
    }

    /// Marks a form as synced.
    ///
    /// Idempotent: returns true only if the flag actually flipped.
    pub async fn mark_synced(&self, form_id: &str) -> DbResult<bool> {
        let result =
            sqlx::query("UPDATE requisitions SET synced = 1 WHERE id = ?1 AND synced = 0")
                .bind(form_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Stores a server-fetched form (with items), already marked synced.
    ///
    /// Skipped when a non-deleted form for the same (program, period) already
    /// exists locally - the local copy wins until the next push. Returns true
    /// if the form was stored.
    pub async fn save_external(
        &self,
        form: &RnrForm,
        items: &[RnrFormItem],
    ) -> DbResult<bool> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<String> = sqlx::query_scalar(
            "SELECT id FROM requisitions \
             WHERE program_code = ?1 AND period_begin = ?2 AND deleted = 0",
        )
        .bind(&form.program_code)
        .bind(form.period_begin)
        .fetch_optional(&mut *tx)
        .await?;

        if existing.is_some() {
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO requisitions (
                id, program_code, period_begin, period_end, status,
                emergency, synced, deleted, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, 0, ?7, ?8)
            "#,
        )
        .bind(&form.id)
        .bind(&form.program_code)
        .bind(form.period_begin)
        .bind(form.period_end)
        .bind(form.status)
        .bind(form.emergency)
        .bind(form.created_at)
        .bind(form.updated_at)
        .execute(&mut *tx)
        .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO requisition_items (
                    id, requisition_id, product_code, product_name,
                    initial_amount, received, issued, adjustment, inventory,
                    request_amount, approved_amount
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
            )
            .bind(&item.id)
            .bind(&form.id)
            .bind(&item.product_code)
            .bind(&item.product_name)
            .bind(item.initial_amount)
            .bind(item.received)
            .bind(item.issued)
            .bind(item.adjustment)
            .bind(item.inventory)
            .bind(item.request_amount)
            .bind(item.approved_amount)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::NaiveDate;
    use medistock_core::{MovementType, NewMovement};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn profile() -> ProgramProfile {
        ProgramProfile::new("EM", "Essential Medicines")
            .base_info_field("consultations")
            .base_info_field("sanitary_inspections")
    }

    fn march_period() -> Period {
        Period::containing(date(2024, 3, 20))
    }

    fn card(product_code: &str, stock_on_hand: i64) -> StockCard {
        let now = Utc::now();
        StockCard {
            id: Uuid::new_v4().to_string(),
            facility_id: "facility-1".into(),
            program_code: "EM".into(),
            product_code: product_code.into(),
            product_name: format!("Product {product_code}"),
            unit: "each".into(),
            stock_on_hand,
            lot_tracked: false,
            is_kit: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn movement(
        movement_type: MovementType,
        quantity: i64,
        stock_on_hand: i64,
        day: u32,
    ) -> NewMovement {
        NewMovement {
            movement_type,
            quantity,
            stock_on_hand,
            reason_code: "DISTRICT_DDM".into(),
            document_number: None,
            signature: None,
            movement_date: date(2024, 3, day),
            lots: Vec::new(),
        }
    }

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_build_derives_items_from_ledger() {
        let db = db().await;
        let cards = db.stock_cards();
        let repo = db.requisitions();

        // Card with window activity: 50 → +30 → -20
        let active = card("02A001", 50);
        cards.insert(&active).await.unwrap();
        cards
            .append_movement(&active.id, movement(MovementType::Receive, 30, 80, 2))
            .await
            .unwrap();
        cards
            .append_movement(&active.id, movement(MovementType::Issue, -20, 60, 9))
            .await
            .unwrap();

        // Card with no movements in the window
        let idle = card("02A002", 12);
        cards.insert(&idle).await.unwrap();

        // Kit cards never become line items
        let mut kit = card("99K001", 0);
        kit.is_kit = true;
        cards.insert(&kit).await.unwrap();

        let form = repo
            .build_for_period(&profile(), march_period(), false)
            .await
            .unwrap();
        assert_eq!(form.status, RnrFormStatus::Draft);

        let items = repo.items(&form.id).await.unwrap();
        assert_eq!(items.len(), 2);

        assert_eq!(items[0].product_code, "02A001");
        assert_eq!(items[0].initial_amount, 50);
        assert_eq!(items[0].received, 30);
        assert_eq!(items[0].issued, 20);
        assert_eq!(items[0].adjustment, 0);
        assert_eq!(items[0].inventory, 60);

        assert_eq!(items[1].product_code, "02A002");
        assert_eq!(items[1].initial_amount, 12);
        assert_eq!(items[1].inventory, 12);

        let base_info = repo.base_info(&form.id).await.unwrap();
        assert_eq!(base_info.len(), 2);
        assert!(base_info.iter().all(|row| row.value.is_none()));
    }

    #[tokio::test]
    async fn test_build_twice_yields_duplicate_period() {
        let db = db().await;
        let repo = db.requisitions();

        repo.build_for_period(&profile(), march_period(), false)
            .await
            .unwrap();

        let err = repo
            .build_for_period(&profile(), march_period(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::DuplicatePeriod { .. }));

        // Exactly one form persisted
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM requisitions WHERE program_code = 'EM'")
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_deleted_draft_frees_the_period() {
        let db = db().await;
        let repo = db.requisitions();

        let form = repo
            .build_for_period(&profile(), march_period(), false)
            .await
            .unwrap();
        repo.soft_delete(&form.id).await.unwrap();

        // The period is free again
        assert!(repo
            .build_for_period(&profile(), march_period(), false)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_status_workflow() {
        let db = db().await;
        let repo = db.requisitions();

        let form = repo
            .build_for_period(&profile(), march_period(), false)
            .await
            .unwrap();

        // Authorizing a DRAFT is a programming error
        let err = repo.authorize(&form.id, "joao").await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InvalidStatusTransition { .. })
        ));

        let submitted = repo.submit(&form.id, "maria").await.unwrap();
        assert_eq!(submitted.status, RnrFormStatus::Submitted);

        // Submitter cannot authorize their own form
        let err = repo.authorize(&form.id, "maria").await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::SameSignerAuthorization { .. })
        ));

        let authorized = repo.authorize(&form.id, "joao").await.unwrap();
        assert_eq!(authorized.status, RnrFormStatus::Authorized);

        let signatures = repo.signatures(&form.id).await.unwrap();
        assert_eq!(signatures.len(), 2);

        // AUTHORIZED is terminal
        assert!(repo.submit(&form.id, "ana").await.is_err());
        assert!(repo.authorize(&form.id, "ana").await.is_err());

        // Submitted/authorized forms cannot be deleted
        assert!(repo.soft_delete(&form.id).await.is_err());
    }

    #[tokio::test]
    async fn test_push_queue_and_idempotent_mark() {
        let db = db().await;
        let repo = db.requisitions();

        let form = repo
            .build_for_period(&profile(), march_period(), false)
            .await
            .unwrap();
        repo.submit(&form.id, "maria").await.unwrap();
        repo.authorize(&form.id, "joao").await.unwrap();

        let queue = repo.list_authorized_unsynced().await.unwrap();
        assert_eq!(queue.len(), 1);

        assert!(repo.mark_synced(&form.id).await.unwrap());
        // Marking again is a no-op
        assert!(!repo.mark_synced(&form.id).await.unwrap());
        assert!(repo.list_authorized_unsynced().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_item_amounts_editable_only_on_draft() {
        let db = db().await;
        let cards = db.stock_cards();
        let repo = db.requisitions();

        cards.insert(&card("02A001", 10)).await.unwrap();
        let form = repo
            .build_for_period(&profile(), march_period(), false)
            .await
            .unwrap();

        let items = repo.items(&form.id).await.unwrap();
        repo.set_item_amounts(&items[0].id, Some(25), None)
            .await
            .unwrap();

        let items = repo.items(&form.id).await.unwrap();
        assert_eq!(items[0].request_amount, Some(25));

        repo.submit(&form.id, "maria").await.unwrap();
        assert!(repo
            .set_item_amounts(&items[0].id, Some(30), None)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_save_external_skips_existing_period() {
        let db = db().await;
        let repo = db.requisitions();
        let period = march_period();

        let now = Utc::now();
        let remote = RnrForm {
            id: "server-form-1".into(),
            program_code: "EM".into(),
            period_begin: period.begin,
            period_end: period.end,
            status: RnrFormStatus::Authorized,
            emergency: false,
            synced: true,
            deleted: false,
            created_at: now,
            updated_at: now,
        };

        assert!(repo.save_external(&remote, &[]).await.unwrap());
        // Same period again: local copy wins
        assert!(!repo.save_external(&remote, &[]).await.unwrap());

        let stored = repo.get_by_id("server-form-1").await.unwrap().unwrap();
        assert!(stored.synced);
    }
}
