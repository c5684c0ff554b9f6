//! # Sync Engine
//!
//! The push/pull pipelines reconciling the local ledger with the server.
//!
//! ## Pipeline Anatomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One Pipeline Run                                     │
//! │                                                                         │
//! │  trigger (scheduler tick or "sync now")                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  try_acquire(category) ──held──► SyncRun::Skipped (silent no-op)       │
//! │       │ free                                                            │
//! │       ▼                                                                 │
//! │  read unsynced set ──► transport call(s) ──► mark synced / record      │
//! │       │                                       error-ledger entries     │
//! │       ▼                                                                 │
//! │  guard drops, gate released (success or failure alike)                 │
//! │                                                                         │
//! │  A running pipeline always runs to completion; callers may only        │
//! │  decline to start a new one. Nothing here retries on its own.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Pipelines are plain `async fn`s. The application shell dispatches them
//! onto a background task and delivers completion to the initiating context;
//! ledger writes unrelated to sync are never blocked by a gate.

use std::sync::Arc;

use chrono::{DateTime, Months, NaiveDate, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use medistock_core::{
    RnrForm, RnrFormItem, RnrFormStatus, StockCard, StockMovement, SyncCategory,
};
use medistock_db::{Database, MovementExport, SyncCursor};

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::gate::CategoryGates;
use crate::status::SyncStatus;
use crate::transport::{
    format_boundary_date, parse_boundary_date, ProductDto, RemoteTransport, RequisitionDto,
    RequisitionItemDto, StockMovementDto, TransportError,
};

// =============================================================================
// Sync Context
// =============================================================================

/// Explicit per-call context: which facility this engine is syncing for.
///
/// Passed into every pipeline instead of living in a global, so tests and
/// multi-facility tooling can construct engines without hidden state.
#[derive(Debug, Clone)]
pub struct SyncContext {
    /// Facility identifier used by movement endpoints.
    pub facility_id: String,

    /// Facility code used by catalog/requisition endpoints.
    pub facility_code: String,
}

impl SyncContext {
    /// Builds the context from the loaded configuration.
    pub fn from_config(config: &SyncConfig) -> Self {
        SyncContext {
            facility_id: config.facility.id.clone(),
            facility_code: config.facility.code.clone(),
        }
    }
}

// =============================================================================
// Run Outcomes
// =============================================================================

/// Outcome of a pipeline trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncRun<T> {
    /// The pipeline ran to completion.
    Completed(T),

    /// The category's gate was held; nothing was done.
    Skipped,
}

impl<T> SyncRun<T> {
    /// True if the run was skipped because a pipeline was already in flight.
    pub fn is_skipped(&self) -> bool {
        matches!(self, SyncRun::Skipped)
    }
}

/// Result of a push pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PushReport {
    /// Records confirmed by the server and marked synced.
    pub pushed: usize,

    /// Records that failed and stayed in the queue.
    pub failed: usize,
}

/// Result of a pull pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PullReport {
    /// Records the server returned.
    pub fetched: usize,

    /// Records actually applied locally.
    pub applied: usize,
}

/// Result of a backfill run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackfillReport {
    /// Monthly chunks completed in THIS run.
    pub chunks_completed: u32,

    /// Total chunks the backfill covers (0 when already complete).
    pub total_chunks: u32,

    /// History rows stored in this run.
    pub movements_saved: u64,
}

// =============================================================================
// Sync Engine
// =============================================================================

/// Orchestrates the three sync pipelines over a shared database and a
/// pluggable remote transport.
pub struct SyncEngine {
    db: Database,
    transport: Arc<dyn RemoteTransport>,
    gates: CategoryGates,
    backfill_months: u32,
    movement_batch_size: usize,
}

impl SyncEngine {
    /// Creates a new sync engine.
    pub fn new(db: Database, transport: Arc<dyn RemoteTransport>, config: &SyncConfig) -> Self {
        SyncEngine {
            db,
            transport,
            gates: CategoryGates::new(),
            backfill_months: config.sync.backfill_months,
            movement_batch_size: config.sync.movement_batch_size as usize,
        }
    }

    // =========================================================================
    // Push: Requisitions (per-record)
    // =========================================================================

    /// Pushes every AUTHORIZED, unsynced requisition form.
    ///
    /// Each form is attempted independently: a failed submit records an
    /// error-ledger entry for THAT form and the batch moves on, so one bad
    /// record cannot block the rest.
    pub async fn push_requisitions(&self, ctx: &SyncContext) -> SyncResult<SyncRun<PushReport>> {
        let Some(_guard) = self.gates.try_acquire(SyncCategory::Requisitions) else {
            debug!("Requisition sync already in flight, skipping");
            return Ok(SyncRun::Skipped);
        };

        let forms = self.db.requisitions().list_authorized_unsynced().await?;
        if forms.is_empty() {
            debug!("No requisitions to push");
            return Ok(SyncRun::Completed(PushReport::default()));
        }

        info!(
            facility = %ctx.facility_code,
            count = forms.len(),
            "Pushing requisitions"
        );
        let mut report = PushReport::default();

        for form in &forms {
            let items = self.db.requisitions().items(&form.id).await?;
            let dto = requisition_to_dto(form, &items);

            match self.transport.submit_requisition(&dto).await {
                Ok(()) => {
                    self.db.requisitions().mark_synced(&form.id).await?;
                    self.db
                        .sync_errors()
                        .clear(SyncCategory::Requisitions, &form.id)
                        .await?;
                    report.pushed += 1;
                }
                Err(e) => {
                    warn!(form_id = %form.id, error = %e, "Requisition push failed");
                    self.db
                        .sync_errors()
                        .record(SyncCategory::Requisitions, &form.id, &e.to_string())
                        .await?;
                    report.failed += 1;
                }
            }
        }

        if report.failed == 0 {
            self.db
                .sync_state()
                .set_last_synced(SyncCategory::Requisitions, Utc::now())
                .await?;
        }

        info!(pushed = report.pushed, failed = report.failed, "Requisition push finished");
        Ok(SyncRun::Completed(report))
    }

    // =========================================================================
    // Push: Stock Movements (all-or-nothing batch)
    // =========================================================================

    /// Pushes the facility's unsynced movements as ONE batch call.
    ///
    /// The remote endpoint is all-or-nothing for this category: on success
    /// the whole batch is marked synced; on failure nothing is marked and a
    /// single batch-level error-ledger entry (keyed by facility) is written
    /// before the error propagates.
    pub async fn push_stock_movements(
        &self,
        ctx: &SyncContext,
    ) -> SyncResult<SyncRun<PushReport>> {
        let Some(_guard) = self.gates.try_acquire(SyncCategory::StockMovements) else {
            debug!("Movement sync already in flight, skipping");
            return Ok(SyncRun::Skipped);
        };

        let mut exports = self.db.stock_cards().list_unsynced().await?;
        if exports.is_empty() {
            debug!("No stock movements to push");
            return Ok(SyncRun::Completed(PushReport::default()));
        }

        if exports.len() > self.movement_batch_size {
            debug!(
                pending = exports.len(),
                batch = self.movement_batch_size,
                "Capping movement batch; remainder goes with the next trigger"
            );
            exports.truncate(self.movement_batch_size);
        }

        let batch: Vec<StockMovementDto> = exports.iter().map(export_to_dto).collect();
        info!(count = batch.len(), "Pushing stock movement batch");

        match self
            .transport
            .push_stock_movements(&ctx.facility_id, &batch)
            .await
        {
            Ok(()) => {
                let ids: Vec<String> = exports.iter().map(|e| e.id.clone()).collect();
                self.db.stock_cards().mark_synced(&ids).await?;
                self.db
                    .sync_errors()
                    .clear(SyncCategory::StockMovements, &ctx.facility_id)
                    .await?;
                self.db
                    .sync_state()
                    .set_last_synced(SyncCategory::StockMovements, Utc::now())
                    .await?;

                info!(pushed = ids.len(), "Movement batch confirmed");
                Ok(SyncRun::Completed(PushReport {
                    pushed: ids.len(),
                    failed: 0,
                }))
            }
            Err(e) => {
                warn!(error = %e, "Movement batch push failed; nothing marked synced");
                self.db
                    .sync_errors()
                    .record(SyncCategory::StockMovements, &ctx.facility_id, &e.to_string())
                    .await?;
                Err(e.into())
            }
        }
    }

    // =========================================================================
    // Pull: Product Catalog
    // =========================================================================

    /// Pulls the product catalog and upserts stock cards.
    ///
    /// Server catalog fields win (last writer wins per record category); the
    /// facility's cached balances are never touched.
    pub async fn pull_products(&self, ctx: &SyncContext) -> SyncResult<SyncRun<PullReport>> {
        let Some(_guard) = self.gates.try_acquire(SyncCategory::Products) else {
            debug!("Product sync already in flight, skipping");
            return Ok(SyncRun::Skipped);
        };

        let products = match self.transport.fetch_products(&ctx.facility_code).await {
            Ok(products) => products,
            Err(e) => {
                warn!(error = %e, "Product pull failed");
                self.db
                    .sync_errors()
                    .record(SyncCategory::Products, &ctx.facility_code, &e.to_string())
                    .await?;
                return Err(e.into());
            }
        };

        let mut report = PullReport {
            fetched: products.len(),
            applied: 0,
        };

        for dto in &products {
            let card = catalog_card(ctx, dto);
            self.db.stock_cards().upsert_catalog_entry(&card).await?;
            report.applied += 1;
        }

        self.db
            .sync_errors()
            .clear(SyncCategory::Products, &ctx.facility_code)
            .await?;
        self.db
            .sync_state()
            .set_last_synced(SyncCategory::Products, Utc::now())
            .await?;

        info!(applied = report.applied, "Product catalog pulled");
        Ok(SyncRun::Completed(report))
    }

    // =========================================================================
    // Pull: Requisitions
    // =========================================================================

    /// Pulls server-side requisition forms and stores the ones this client
    /// doesn't have. Locally held forms for the same period win until pushed.
    pub async fn pull_requisitions(&self, ctx: &SyncContext) -> SyncResult<SyncRun<PullReport>> {
        let Some(_guard) = self.gates.try_acquire(SyncCategory::Requisitions) else {
            debug!("Requisition sync already in flight, skipping");
            return Ok(SyncRun::Skipped);
        };

        let dtos = match self.transport.fetch_requisitions(&ctx.facility_code).await {
            Ok(dtos) => dtos,
            Err(e) => {
                warn!(error = %e, "Requisition pull failed");
                self.db
                    .sync_errors()
                    .record(SyncCategory::Requisitions, &ctx.facility_code, &e.to_string())
                    .await?;
                return Err(e.into());
            }
        };

        let mut report = PullReport {
            fetched: dtos.len(),
            applied: 0,
        };

        for dto in &dtos {
            let (form, items) = form_from_dto(dto)?;
            if self.db.requisitions().save_external(&form, &items).await? {
                report.applied += 1;
            }
        }

        self.db
            .sync_errors()
            .clear(SyncCategory::Requisitions, &ctx.facility_code)
            .await?;
        self.db
            .sync_state()
            .set_last_synced(SyncCategory::Requisitions, Utc::now())
            .await?;

        info!(
            fetched = report.fetched,
            applied = report.applied,
            "Requisition pull finished"
        );
        Ok(SyncRun::Completed(report))
    }

    // =========================================================================
    // Pull: Historical Backfill
    // =========================================================================

    /// Fetches historical stock movements one calendar month at a time,
    /// newest month first, resuming from the persisted cursor.
    ///
    /// A full year in one request would risk timeout, so each chunk is one
    /// month. After every successful chunk the cursor advances and is
    /// persisted; on a mid-sequence failure the cursor is persisted BEFORE
    /// the error propagates, so a retry resumes at the failed chunk rather
    /// than refetching completed months. Completing the final chunk clears
    /// the cursor and sets the category's fully-synced flag, turning later
    /// calls into no-ops.
    pub async fn backfill_stock_movements(
        &self,
        ctx: &SyncContext,
        reference: NaiveDate,
    ) -> SyncResult<SyncRun<BackfillReport>> {
        let Some(_guard) = self.gates.try_acquire(SyncCategory::StockMovements) else {
            debug!("Movement sync already in flight, skipping");
            return Ok(SyncRun::Skipped);
        };

        if self
            .db
            .sync_state()
            .fully_synced(SyncCategory::StockMovements)
            .await?
        {
            debug!("Backfill already complete");
            return Ok(SyncRun::Completed(BackfillReport::default()));
        }

        let total = self.backfill_months;
        let mut cursor = match self.db.sync_state().backfill_cursor().await? {
            Some(cursor) => {
                info!(chunk = cursor.chunk_index, "Resuming backfill from cursor");
                cursor
            }
            None => SyncCursor {
                chunk_index: 0,
                last_end: reference,
            },
        };

        let mut report = BackfillReport {
            chunks_completed: 0,
            total_chunks: total,
            movements_saved: 0,
        };

        while cursor.chunk_index < total {
            let end = cursor.last_end;
            let start = months_back(end, 1)?;

            debug!(
                chunk = cursor.chunk_index,
                start = %start,
                end = %end,
                "Fetching backfill chunk"
            );

            let dtos = match self
                .transport
                .fetch_stock_movements(
                    &ctx.facility_id,
                    &format_boundary_date(start),
                    &format_boundary_date(end),
                )
                .await
            {
                Ok(dtos) => dtos,
                Err(e) => {
                    // Persist the resume point before propagating
                    self.db.sync_state().set_backfill_cursor(cursor).await?;
                    self.db
                        .sync_errors()
                        .record(SyncCategory::StockMovements, &ctx.facility_id, &e.to_string())
                        .await?;
                    warn!(
                        chunk = cursor.chunk_index,
                        error = %e,
                        "Backfill chunk failed; cursor persisted"
                    );
                    return Err(e.into());
                }
            };

            report.movements_saved += self.store_history_chunk(ctx, &dtos).await?;

            cursor = SyncCursor {
                chunk_index: cursor.chunk_index + 1,
                last_end: start,
            };
            self.db.sync_state().set_backfill_cursor(cursor).await?;
            report.chunks_completed += 1;
        }

        self.db.sync_state().clear_backfill_cursor().await?;
        self.db
            .sync_state()
            .set_fully_synced(SyncCategory::StockMovements, true)
            .await?;
        self.db
            .sync_errors()
            .clear(SyncCategory::StockMovements, &ctx.facility_id)
            .await?;

        info!(
            chunks = report.chunks_completed,
            movements = report.movements_saved,
            "Backfill complete"
        );
        Ok(SyncRun::Completed(report))
    }

    /// Stores one fetched chunk, resolving product codes to local cards.
    /// Movements for products this facility doesn't stock are skipped.
    async fn store_history_chunk(
        &self,
        ctx: &SyncContext,
        dtos: &[StockMovementDto],
    ) -> SyncResult<u64> {
        let mut rows = Vec::with_capacity(dtos.len());

        for dto in dtos {
            let card = self
                .db
                .stock_cards()
                .get_by_product_code(&ctx.facility_id, &dto.product_code)
                .await?;

            match card {
                Some(card) => rows.push(history_row(&card.id, dto)?),
                None => {
                    warn!(
                        product_code = %dto.product_code,
                        "Skipping history for unknown product"
                    );
                }
            }
        }

        Ok(self.db.stock_cards().insert_history(&rows).await?)
    }

    // =========================================================================
    // Status
    // =========================================================================

    /// Snapshot of sync health for the presentation layer.
    pub async fn status(&self) -> SyncResult<SyncStatus> {
        let state = self.db.sync_state();
        let errors = self.db.sync_errors();

        Ok(SyncStatus {
            movements_pending: self.db.stock_cards().list_unsynced().await?.len(),
            requisitions_pending: self
                .db
                .requisitions()
                .list_authorized_unsynced()
                .await?
                .len(),
            last_synced_products: state.last_synced(SyncCategory::Products).await?,
            last_synced_requisitions: state.last_synced(SyncCategory::Requisitions).await?,
            last_synced_movements: state.last_synced(SyncCategory::StockMovements).await?,
            backfill_complete: state.fully_synced(SyncCategory::StockMovements).await?,
            product_errors: errors.count_for_category(SyncCategory::Products).await?,
            requisition_errors: errors
                .count_for_category(SyncCategory::Requisitions)
                .await?,
            movement_errors: errors
                .count_for_category(SyncCategory::StockMovements)
                .await?,
        })
    }
}

// =============================================================================
// Conversions
// =============================================================================

fn requisition_to_dto(form: &RnrForm, items: &[RnrFormItem]) -> RequisitionDto {
    RequisitionDto {
        id: form.id.clone(),
        program_code: form.program_code.clone(),
        period_begin: format_boundary_date(form.period_begin),
        period_end: format_boundary_date(form.period_end),
        emergency: form.emergency,
        items: items
            .iter()
            .map(|item| RequisitionItemDto {
                product_code: item.product_code.clone(),
                product_name: item.product_name.clone(),
                initial_amount: item.initial_amount,
                received: item.received,
                issued: item.issued,
                adjustment: item.adjustment,
                inventory: item.inventory,
                request_amount: item.request_amount,
                approved_amount: item.approved_amount,
            })
            .collect(),
    }
}

fn form_from_dto(dto: &RequisitionDto) -> SyncResult<(RnrForm, Vec<RnrFormItem>)> {
    let now = Utc::now();

    let form = RnrForm {
        id: dto.id.clone(),
        program_code: dto.program_code.clone(),
        period_begin: parse_boundary_date(&dto.period_begin)?,
        period_end: parse_boundary_date(&dto.period_end)?,
        // Server forms are past the workflow; they arrive authorized
        status: RnrFormStatus::Authorized,
        emergency: dto.emergency,
        synced: true,
        deleted: false,
        created_at: now,
        updated_at: now,
    };

    let items = dto
        .items
        .iter()
        .map(|item| RnrFormItem {
            id: Uuid::new_v4().to_string(),
            requisition_id: form.id.clone(),
            product_code: item.product_code.clone(),
            product_name: item.product_name.clone(),
            initial_amount: item.initial_amount,
            received: item.received,
            issued: item.issued,
            adjustment: item.adjustment,
            inventory: item.inventory,
            request_amount: item.request_amount,
            approved_amount: item.approved_amount,
        })
        .collect();

    Ok((form, items))
}

fn catalog_card(ctx: &SyncContext, dto: &ProductDto) -> StockCard {
    let now = Utc::now();

    StockCard {
        id: Uuid::new_v4().to_string(),
        facility_id: ctx.facility_id.clone(),
        program_code: dto.program_code.clone(),
        product_code: dto.product_code.clone(),
        product_name: dto.product_name.clone(),
        unit: dto.unit.clone(),
        stock_on_hand: 0,
        lot_tracked: dto.lot_tracked,
        is_kit: dto.is_kit,
        is_active: dto.active,
        created_at: now,
        updated_at: now,
    }
}

fn export_to_dto(export: &MovementExport) -> StockMovementDto {
    StockMovementDto {
        id: export.id.clone(),
        product_code: export.product_code.clone(),
        movement_type: export.movement_type,
        quantity: export.quantity,
        stock_on_hand: export.stock_on_hand,
        reason_code: export.reason_code.clone(),
        document_number: export.document_number.clone(),
        signature: export.signature.clone(),
        occurred: format_boundary_date(export.movement_date),
        recorded: export.created_time.to_rfc3339(),
    }
}

fn history_row(card_id: &str, dto: &StockMovementDto) -> SyncResult<StockMovement> {
    let recorded: DateTime<Utc> = dto
        .recorded
        .parse::<DateTime<chrono::FixedOffset>>()
        .map_err(|e| {
            TransportError::MalformedResponse(format!("Bad instant '{}': {e}", dto.recorded))
        })?
        .with_timezone(&Utc);

    Ok(StockMovement {
        id: dto.id.clone(),
        stock_card_id: card_id.to_string(),
        movement_type: dto.movement_type,
        quantity: dto.quantity,
        stock_on_hand: dto.stock_on_hand,
        reason_code: dto.reason_code.clone(),
        document_number: dto.document_number.clone(),
        signature: dto.signature.clone(),
        movement_date: parse_boundary_date(&dto.occurred)?,
        created_time: recorded,
        synced: true,
    })
}

/// Shifts a date back by whole calendar months.
fn months_back(date: NaiveDate, months: u32) -> SyncResult<NaiveDate> {
    date.checked_sub_months(Months::new(months))
        .ok_or_else(|| SyncError::Internal(format!("Date out of range: {date} - {months} months")))
}

// =============================================================================
// Tests
// =============================================================================
