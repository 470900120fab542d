use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fundos_api::domain::attachment::AttachmentRef;
use fundos_api::domain::report_status::ReportStatus;

/// # Documentation
/// - Expense report ("prestação de contas") embedded in a fund request.
/// - `declared_total` always equals the sum of the line items; the request
///   service recomputes it on submission and on every correction.
/// - Line items are immutable once submitted; a correction replaces the
///   whole list and produces a single new history entry on the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseReportModel {
    pub submitted_at: DateTime<Utc>,
    pub declared_total: Decimal,
    pub notes: Option<String>,
    /// Report-cycle shadow of the request's `Report*` status, kept in
    /// lockstep inside the same store write.
    pub status: ReportStatus,
    pub items: Vec<ExpenseLineItemModel>,
}

/// One declared expense with its supporting receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseLineItemModel {
    /// Client-assigned id, unique within the report.
    pub id: Uuid,
    pub incurred_on: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub receipt: AttachmentRef,
}
