//! # Domain Types
//!
//! Core domain types used throughout Medistock.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────┐   ┌─────────────────┐      │
//! │  │   StockCard     │   │  StockMovement   │   │  LotMovement    │      │
//! │  │  ─────────────  │   │  ──────────────  │   │  ─────────────  │      │
//! │  │  id (UUID)      │◄──│  stock_card_id   │◄──│  movement_id    │      │
//! │  │  product_code   │   │  quantity (±)    │   │  lot_number     │      │
//! │  │  stock_on_hand  │   │  stock_on_hand   │   │  quantity       │      │
//! │  │  (cached)       │   │  (snapshot AFTER)│   │                 │      │
//! │  └─────────────────┘   └──────────────────┘   └─────────────────┘      │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────┐   ┌─────────────────┐      │
//! │  │    RnrForm      │   │   RnrFormItem    │   │  MovementType   │      │
//! │  │  ─────────────  │   │  ──────────────  │   │  ─────────────  │      │
//! │  │  program_code   │◄──│  requisition_id  │   │  Receive        │      │
//! │  │  period_begin   │   │  initial_amount  │   │  Issue          │      │
//! │  │  period_end     │   │  received/issued │   │  ±Adjust        │      │
//! │  │  status         │   │  inventory       │   │  PhysicalInv.   │      │
//! │  └─────────────────┘   └──────────────────┘   └─────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ledger Semantics
//! A [`StockCard`] caches its running balance; the balance is mutated ONLY by
//! appending a [`StockMovement`] through the atomic append operation in the
//! db crate. `StockMovement.quantity` is the **signed delta** the entry
//! applied (a physical count stores the difference between counted and prior
//! balance), and `StockMovement.stock_on_hand` is the balance **after** the
//! entry. Movements are immutable once written except for the `synced` flag.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Movement Type
// =============================================================================

/// The kind of ledger entry applied to a stock card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// Stock received from a supplier or upstream warehouse.
    Receive,
    /// Stock issued to a ward, patient, or downstream facility.
    Issue,
    /// Upward correction (found stock, return, transfer in).
    PositiveAdjust,
    /// Downward correction (damage, expiry, transfer out).
    NegativeAdjust,
    /// Physical count reset; quantity carries the counted difference.
    PhysicalInventory,
}

impl MovementType {
    /// Returns true if this type may only carry non-negative deltas.
    pub fn is_additive(&self) -> bool {
        matches!(self, MovementType::Receive | MovementType::PositiveAdjust)
    }

    /// Returns true if this type may only carry non-positive deltas.
    pub fn is_subtractive(&self) -> bool {
        matches!(self, MovementType::Issue | MovementType::NegativeAdjust)
    }
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MovementType::Receive => write!(f, "receive"),
            MovementType::Issue => write!(f, "issue"),
            MovementType::PositiveAdjust => write!(f, "positive_adjust"),
            MovementType::NegativeAdjust => write!(f, "negative_adjust"),
            MovementType::PhysicalInventory => write!(f, "physical_inventory"),
        }
    }
}

// =============================================================================
// Stock Card
// =============================================================================

/// A product stock line at the facility.
///
/// `stock_on_hand` is a cached running balance. It is never written directly;
/// the only mutation path is the atomic movement append in the db crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockCard {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Facility this card belongs to.
    pub facility_id: String,

    /// Program this product is requisitioned under.
    pub program_code: String,

    /// Product code - business identifier, unique per facility.
    pub product_code: String,

    /// Display name shown on stock screens and R&R forms.
    pub product_name: String,

    /// Dispensing unit (e.g., "each", "vial", "bottle").
    pub unit: String,

    /// Cached running balance (ledger invariant keeps this ≥ 0).
    pub stock_on_hand: i64,

    /// Whether per-lot balances are maintained for this card.
    pub lot_tracked: bool,

    /// Kit products aggregate other products and are excluded from R&R items.
    pub is_kit: bool,

    /// Whether the card is active (archived cards keep their history).
    pub is_active: bool,

    /// When the card was created.
    pub created_at: DateTime<Utc>,

    /// When the card was last touched by an append.
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Stock Movement
// =============================================================================

/// An immutable ledger entry.
///
/// `movement_date` is the business date the movement happened on;
/// `created_time` is the wall-clock insert instant. The two may differ (a
/// stocktake recorded the morning after), and `created_time` breaks ordering
/// ties within a day.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMovement {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Owning stock card.
    pub stock_card_id: String,

    /// Kind of entry.
    pub movement_type: MovementType,

    /// Signed delta applied to the balance.
    pub quantity: i64,

    /// Balance AFTER this entry.
    pub stock_on_hand: i64,

    /// Why the movement happened (e.g., "DISTRICT_DDM", "DAMAGED").
    pub reason_code: String,

    /// Source document reference, if any.
    pub document_number: Option<String>,

    /// Initials of the person who recorded the movement.
    pub signature: Option<String>,

    /// Business date of the movement.
    pub movement_date: NaiveDate,

    /// Wall-clock insert time.
    pub created_time: DateTime<Utc>,

    /// Whether this entry has been pushed to the server.
    pub synced: bool,
}

/// Input for the atomic movement append.
///
/// The caller computes the expected resulting balance; the append validates
/// it against the card's cached balance before anything is written.
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub movement_type: MovementType,
    /// Signed delta.
    pub quantity: i64,
    /// Declared balance after the movement.
    pub stock_on_hand: i64,
    pub reason_code: String,
    pub document_number: Option<String>,
    pub signature: Option<String>,
    pub movement_date: NaiveDate,
    /// Per-lot fan-out; required iff the card is lot-tracked.
    pub lots: Vec<NewLotMovement>,
}

// =============================================================================
// Lots
// =============================================================================

/// Per-lot quantity attached to a stock movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LotMovement {
    pub id: String,
    pub stock_movement_id: String,
    pub lot_number: String,
    pub expiry_date: NaiveDate,
    /// Signed delta for this lot.
    pub quantity: i64,
}

/// Lot fan-out input for [`NewMovement`].
#[derive(Debug, Clone)]
pub struct NewLotMovement {
    pub lot_number: String,
    pub expiry_date: NaiveDate,
    /// Signed delta for this lot; lot deltas sum to the movement quantity.
    pub quantity: i64,
}

/// Derived balance per (stock card, lot).
///
/// Invariant: when lot tracking is enabled, the sum of a card's lot balances
/// equals the card's `stock_on_hand`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LotOnHand {
    pub stock_card_id: String,
    pub lot_number: String,
    pub expiry_date: NaiveDate,
    pub quantity: i64,
}

// =============================================================================
// Requisition (R&R) Form
// =============================================================================

/// The status of a requisition form.
///
/// ## State Machine
/// ```text
/// DRAFT ──(submit, submitter signature)──► SUBMITTED
///       ──(authorize, approver signature from a DIFFERENT signer)──► AUTHORIZED
/// ```
/// AUTHORIZED is terminal for the workflow; only AUTHORIZED forms enter the
/// sync push queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum RnrFormStatus {
    /// Form is being edited.
    Draft,
    /// Form has been signed off by the submitter.
    Submitted,
    /// Form carries the second signature and is push-eligible.
    Authorized,
}

/// A periodic "Request & Report" requisition form.
///
/// At most one non-deleted form exists per (program, period).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct RnrForm {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Program the form reports on.
    pub program_code: String,

    /// First day of the reporting period.
    pub period_begin: NaiveDate,

    /// Last day of the reporting period (the cutoff day).
    pub period_end: NaiveDate,

    /// Workflow status.
    pub status: RnrFormStatus,

    /// Emergency requisitions ride outside the regular schedule.
    pub emergency: bool,

    /// Whether this form has been pushed to the server.
    pub synced: bool,

    /// Soft-delete flag for abandoned drafts.
    pub deleted: bool,

    /// When the form was generated.
    pub created_at: DateTime<Utc>,

    /// When the form was last changed.
    pub updated_at: DateTime<Utc>,
}

/// Per-product line of a requisition form.
///
/// The ledger-derived columns (`initial_amount` through `inventory`) are
/// computed once at generation time; `request_amount` / `approved_amount` are
/// filled in by the user before submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct RnrFormItem {
    pub id: String,
    pub requisition_id: String,
    pub product_code: String,
    pub product_name: String,

    /// Balance immediately before the period window.
    pub initial_amount: i64,

    /// Total received inside the window.
    pub received: i64,

    /// Total issued inside the window (reported as a positive number).
    pub issued: i64,

    /// Net adjustment inside the window (signed; includes count corrections).
    pub adjustment: i64,

    /// Closing balance (snapshot of the last window movement, or the card's
    /// current balance if the window is empty).
    pub inventory: i64,

    /// Quantity the facility requests; user-entered.
    pub request_amount: Option<i64>,

    /// Quantity approved upstream; user-entered.
    pub approved_amount: Option<i64>,
}

/// Program-specific base information field on a form.
///
/// Created empty at build time; the presentation layer fills values in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BaseInfoItem {
    pub id: String,
    pub requisition_id: String,
    pub name: String,
    pub value: Option<String>,
}

// =============================================================================
// Signatures
// =============================================================================

/// Role a signature was given in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum SignatureRole {
    /// Signed at submit time.
    Submitter,
    /// Signed at authorize time; must be a different signer.
    Approver,
}

/// A signature record attached to a requisition form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct RnrSignature {
    pub id: String,
    pub requisition_id: String,
    pub signer: String,
    pub role: SignatureRole,
    pub signed_at: DateTime<Utc>,
}

// =============================================================================
// Sync Category
// =============================================================================

/// The three independently synchronized record categories.
///
/// Each category has its own mutual-exclusion gate, its own last-synced
/// timestamp, and its own error-ledger namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncCategory {
    Products,
    Requisitions,
    StockMovements,
}

impl SyncCategory {
    /// Stable textual key used in the error ledger and scalar sync state.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncCategory::Products => "products",
            SyncCategory::Requisitions => "requisitions",
            SyncCategory::StockMovements => "stock_movements",
        }
    }
}

impl std::fmt::Display for SyncCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SyncCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "products" => Ok(SyncCategory::Products),
            "requisitions" => Ok(SyncCategory::Requisitions),
            "stock_movements" => Ok(SyncCategory::StockMovements),
            other => Err(format!("Unknown sync category: '{other}'")),
        }
    }
}

// =============================================================================
// Program Profile
// =============================================================================

/// Broad medicine classification used by program-specific form sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MedicineType {
    Adult,
    Children,
    Solution,
    General,
}

/// Program-specific requisition strategy.
///
/// One Requisition Builder serves every program; the differences between
/// programs (extra base-information fields, how products are grouped on the
/// form) live in this configuration struct, selected by program code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramProfile {
    /// Program code (e.g., "EM", "TARV").
    pub code: String,

    /// Human-readable program name.
    pub name: String,

    /// Base-information field names created empty on every new form.
    pub base_info_fields: Vec<String>,

    /// Prefix → classification rules; first match wins.
    pub classifier_rules: Vec<(String, MedicineType)>,
}

impl ProgramProfile {
    /// Creates a profile with no extra fields and no classifier rules.
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        ProgramProfile {
            code: code.into(),
            name: name.into(),
            base_info_fields: Vec::new(),
            classifier_rules: Vec::new(),
        }
    }

    /// Adds a base-information field (builder style).
    pub fn base_info_field(mut self, name: impl Into<String>) -> Self {
        self.base_info_fields.push(name.into());
        self
    }

    /// Adds a product-code-prefix classification rule (builder style).
    pub fn classifier_rule(mut self, prefix: impl Into<String>, kind: MedicineType) -> Self {
        self.classifier_rules.push((prefix.into(), kind));
        self
    }

    /// Classifies a product by code prefix; defaults to General.
    pub fn classify(&self, product_code: &str) -> MedicineType {
        self.classifier_rules
            .iter()
            .find(|(prefix, _)| product_code.starts_with(prefix.as_str()))
            .map(|(_, kind)| *kind)
            .unwrap_or(MedicineType::General)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_type_signs() {
        assert!(MovementType::Receive.is_additive());
        assert!(MovementType::PositiveAdjust.is_additive());
        assert!(MovementType::Issue.is_subtractive());
        assert!(MovementType::NegativeAdjust.is_subtractive());

        // Physical counts can move the balance either way
        assert!(!MovementType::PhysicalInventory.is_additive());
        assert!(!MovementType::PhysicalInventory.is_subtractive());
    }

    #[test]
    fn test_sync_category_round_trip() {
        for category in [
            SyncCategory::Products,
            SyncCategory::Requisitions,
            SyncCategory::StockMovements,
        ] {
            let parsed: SyncCategory = category.as_str().parse().unwrap();
            assert_eq!(parsed, category);
        }

        assert!("sales".parse::<SyncCategory>().is_err());
    }

    #[test]
    fn test_program_profile_classifier() {
        let profile = ProgramProfile::new("TARV", "Antiretroviral")
            .base_info_field("new_patients")
            .classifier_rule("08S01", MedicineType::Adult)
            .classifier_rule("08S32", MedicineType::Children);

        assert_eq!(profile.classify("08S01ZY"), MedicineType::Adult);
        assert_eq!(profile.classify("08S32WX"), MedicineType::Children);
        assert_eq!(profile.classify("02A001"), MedicineType::General);
        assert_eq!(profile.base_info_fields, vec!["new_patients".to_string()]);
    }
}
