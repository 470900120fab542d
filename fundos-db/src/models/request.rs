use chrono::{DateTime, NaiveDate, Utc};
use heapless::String as HeaplessString;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fundos_api::domain::request_status::RequestStatus;
use fundos_api::domain::transition::WorkflowKind;
use fundos_api::domain::attachment::AttachmentRef;

use crate::models::expense_report::ExpenseReportModel;
use crate::models::history::HistoryEntryModel;
use crate::models::identifiable::{Identifiable, Versioned};
use crate::models::workflow_entity::WorkflowEntity;

/// # Documentation
/// - A fund-advance request ("suprimento de fundos") and everything it owns:
///   its audit history and, once reporting starts, its expense report.
/// - `history` is append-only; the last entry's `to_status` always equals
///   `status`, and the list is empty only while the request is a draft.
/// - `version` is checked and incremented on every store update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundRequestModel {
    pub id: Uuid,

    pub requester_id: Uuid,

    pub created_at: DateTime<Utc>,

    /// Set when the draft is first submitted.
    pub submitted_at: Option<DateTime<Utc>>,

    pub status: RequestStatus,

    pub expense_category: HeaplessString<50>,

    pub cost_center: HeaplessString<20>,

    /// Comarca / judicial district the advance serves.
    pub jurisdiction: HeaplessString<50>,

    pub amount: Decimal,

    pub justification: String,

    /// Usage period during which the advance may be spent.
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,

    pub attachment: Option<AttachmentRef>,

    pub history: Vec<HistoryEntryModel<RequestStatus>>,

    pub expense_report: Option<ExpenseReportModel>,

    pub version: u64,
}

impl Identifiable for FundRequestModel {
    fn get_id(&self) -> Uuid {
        self.id
    }
}

impl Versioned for FundRequestModel {
    fn get_version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

impl WorkflowEntity for FundRequestModel {
    type State = RequestStatus;

    fn kind() -> WorkflowKind {
        WorkflowKind::FundRequest
    }

    fn current_status(&self) -> RequestStatus {
        self.status
    }

    fn set_status(&mut self, status: RequestStatus) {
        self.status = status;
    }

    fn history(&self) -> &[HistoryEntryModel<RequestStatus>] {
        &self.history
    }

    fn record_history(&mut self, entry: HistoryEntryModel<RequestStatus>) {
        self.history.push(entry);
    }
}
