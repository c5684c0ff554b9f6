//! # Remote Transport Contract
//!
//! The boundary between the sync engine and the network. The engine only
//! ever talks to [`RemoteTransport`]; the HTTP/JSON client implementing it
//! lives outside this workspace.
//!
//! ## Boundary Conventions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Transport Boundary                                   │
//! │                                                                         │
//! │  • All calendar dates cross the boundary as 'yyyy-MM-dd' text          │
//! │  • Instants cross as RFC 3339 text                                     │
//! │  • Record ids are UUID strings, stable across push and pull            │
//! │  • Timeouts are the transport's responsibility; they surface here      │
//! │    as ordinary TransportError values                                   │
//! │                                                                         │
//! │  The engine treats every TransportError as EXPECTED: record it in      │
//! │  the error ledger, release the gate, wait for the next trigger.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use medistock_core::MovementType;

/// Fixed textual form of calendar dates at the transport boundary.
pub const BOUNDARY_DATE_FORMAT: &str = "%Y-%m-%d";

// =============================================================================
// Transport Error
// =============================================================================

/// Failures reported by the remote transport.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Could not reach the server at all.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// The server answered with a non-success status.
    #[error("Server rejected the request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The server's response could not be interpreted.
    #[error("Malformed server response: {0}")]
    MalformedResponse(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

// =============================================================================
// Wire DTOs
// =============================================================================

/// A product catalog entry as the server sends it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDto {
    pub product_code: String,
    pub product_name: String,
    pub unit: String,
    pub program_code: String,
    pub lot_tracked: bool,
    pub is_kit: bool,
    pub active: bool,
}

/// A requisition form on the wire (push and pull share this shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequisitionDto {
    pub id: String,
    pub program_code: String,
    /// 'yyyy-MM-dd'
    pub period_begin: String,
    /// 'yyyy-MM-dd'
    pub period_end: String,
    pub emergency: bool,
    pub items: Vec<RequisitionItemDto>,
}

/// One requisition line item on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequisitionItemDto {
    pub product_code: String,
    pub product_name: String,
    pub initial_amount: i64,
    pub received: i64,
    pub issued: i64,
    pub adjustment: i64,
    pub inventory: i64,
    pub request_amount: Option<i64>,
    pub approved_amount: Option<i64>,
}

/// One stock movement on the wire (push batch and historical pull).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovementDto {
    /// Stable UUID; the same id never imports twice.
    pub id: String,
    pub product_code: String,
    pub movement_type: MovementType,
    /// Signed delta.
    pub quantity: i64,
    /// Balance after the movement.
    pub stock_on_hand: i64,
    pub reason_code: String,
    pub document_number: Option<String>,
    pub signature: Option<String>,
    /// Business date, 'yyyy-MM-dd'.
    pub occurred: String,
    /// Wall-clock insert time, RFC 3339.
    pub recorded: String,
}

// =============================================================================
// Date Helpers
// =============================================================================

/// Formats a calendar date for the boundary.
pub fn format_boundary_date(date: NaiveDate) -> String {
    date.format(BOUNDARY_DATE_FORMAT).to_string()
}

/// Parses a boundary date, surfacing failures as malformed responses.
pub fn parse_boundary_date(raw: &str) -> TransportResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, BOUNDARY_DATE_FORMAT).map_err(|e| {
        TransportError::MalformedResponse(format!("Bad date '{raw}': {e}"))
    })
}

// =============================================================================
// Remote Transport
// =============================================================================

/// The network client contract the sync engine drives.
///
/// Implementations are external collaborators (an HTTP/JSON client in the
/// application shell). The engine holds an `Arc<dyn RemoteTransport>` so
/// tests can substitute a programmable mock.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Fetches the facility's product catalog.
    async fn fetch_products(&self, facility_code: &str) -> TransportResult<Vec<ProductDto>>;

    /// Fetches the facility's server-side requisition forms.
    async fn fetch_requisitions(
        &self,
        facility_code: &str,
    ) -> TransportResult<Vec<RequisitionDto>>;

    /// Submits one authorized requisition form.
    async fn submit_requisition(&self, form: &RequisitionDto) -> TransportResult<()>;

    /// Fetches historical stock movements in `[start_date, end_date)`,
    /// both 'yyyy-MM-dd'.
    async fn fetch_stock_movements(
        &self,
        facility_id: &str,
        start_date: &str,
        end_date: &str,
    ) -> TransportResult<Vec<StockMovementDto>>;

    /// Pushes the facility's movement batch in one all-or-nothing call.
    async fn push_stock_movements(
        &self,
        facility_id: &str,
        batch: &[StockMovementDto],
    ) -> TransportResult<()>;
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_date_round_trip() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        let text = format_boundary_date(date);

        assert_eq!(text, "2024-03-20");
        assert_eq!(parse_boundary_date(&text).unwrap(), date);
    }

    #[test]
    fn test_parse_rejects_other_formats() {
        assert!(parse_boundary_date("20/03/2024").is_err());
        assert!(parse_boundary_date("2024-3-2O").is_err());
        assert!(parse_boundary_date("").is_err());
    }

    #[test]
    fn test_movement_dto_serde_shape() {
        let dto = StockMovementDto {
            id: "m-1".into(),
            product_code: "02A001".into(),
            movement_type: MovementType::NegativeAdjust,
            quantity: -5,
            stock_on_hand: 45,
            reason_code: "DAMAGED".into(),
            document_number: None,
            signature: Some("ab".into()),
            occurred: "2024-03-10".into(),
            recorded: "2024-03-10T08:30:00Z".into(),
        };

        let json = serde_json::to_string(&dto).unwrap();
        assert!(json.contains("\"movement_type\":\"negative_adjust\""));

        let back: StockMovementDto = serde_json::from_str(&json).unwrap();
        assert_eq!(back.quantity, -5);
    }
}
