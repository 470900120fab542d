use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fundos_api::domain::attachment::AttachmentRef;
use fundos_api::domain::report_status::ReportStatus;
use fundos_api::domain::transition::WorkflowKind;

use crate::models::history::HistoryEntryModel;
use crate::models::identifiable::{Identifiable, Versioned};
use crate::models::workflow_entity::WorkflowEntity;

/// Standalone reimbursement ("reembolso") for expenses paid out of pocket.
///
/// Runs the report-style cycle without the resubmission path: once returned
/// for correction it stays there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReimbursementModel {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub status: ReportStatus,
    pub amount: Decimal,
    pub description: String,
    pub receipt: Option<AttachmentRef>,
    pub history: Vec<HistoryEntryModel<ReportStatus>>,
    pub version: u64,
}

impl Identifiable for ReimbursementModel {
    fn get_id(&self) -> Uuid {
        self.id
    }
}

impl Versioned for ReimbursementModel {
    fn get_version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

impl WorkflowEntity for ReimbursementModel {
    type State = ReportStatus;

    fn kind() -> WorkflowKind {
        WorkflowKind::Reimbursement
    }

    fn current_status(&self) -> ReportStatus {
        self.status
    }

    fn set_status(&mut self, status: ReportStatus) {
        self.status = status;
    }

    fn history(&self) -> &[HistoryEntryModel<ReportStatus>] {
        &self.history
    }

    fn record_history(&mut self, entry: HistoryEntryModel<ReportStatus>) {
        self.history.push(entry);
    }
}
