use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use fundos_api::domain::payload::ReimbursementPayload;
use fundos_api::domain::report_status::ReportStatus;
use fundos_api::domain::transition::reimbursement_transitions;
use fundos_api::error::{WorkflowError, WorkflowResult};
use fundos_api::service::clock::Clock;
use fundos_api::service::identity::IdentityProvider;
use fundos_api::service::notification::NotificationSink;
use fundos_db::models::history::HistoryEntryModel;
use fundos_db::models::reimbursement::ReimbursementModel;
use fundos_db::repository::entity_store::EntityStore;

use crate::audit;
use crate::machine::StatusMachine;

/// Operations on standalone reimbursements.
///
/// Same machine, same audit trail, different table: a reimbursement
/// returned for correction has no way back into the cycle.
pub struct ReimbursementService {
    machine: Arc<StatusMachine<ReimbursementModel>>,
    store: Arc<dyn EntityStore<ReimbursementModel>>,
    clock: Arc<dyn Clock>,
}

impl ReimbursementService {
    pub fn new(
        store: Arc<dyn EntityStore<ReimbursementModel>>,
        identity: Arc<dyn IdentityProvider>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        let machine = Arc::new(StatusMachine::new(
            store.clone(),
            identity,
            clock.clone(),
            notifier,
            reimbursement_transitions(),
        ));
        Self {
            machine,
            store,
            clock,
        }
    }

    pub fn machine(&self) -> &StatusMachine<ReimbursementModel> {
        &self.machine
    }

    pub async fn find(&self, reimbursement_id: Uuid) -> WorkflowResult<ReimbursementModel> {
        self.store
            .find_by_id(reimbursement_id)
            .await
            .map_err(WorkflowError::internal)?
            .ok_or_else(|| WorkflowError::NotFound(format!("Reimbursement {reimbursement_id}")))
    }

    pub async fn create_draft(
        &self,
        payload: &ReimbursementPayload,
    ) -> WorkflowResult<ReimbursementModel> {
        payload
            .validate()
            .map_err(|err| WorkflowError::ValidationError(err.to_string()))?;

        let model = ReimbursementModel {
            id: Uuid::new_v4(),
            requester_id: payload.requester_id,
            created_at: self.clock.now(),
            submitted_at: None,
            status: ReportStatus::Draft,
            amount: payload.amount,
            description: payload.description.trim().to_string(),
            receipt: payload.receipt.clone(),
            history: Vec::new(),
            version: 0,
        };
        self.store
            .create(model)
            .await
            .map_err(WorkflowError::internal)
    }

    pub async fn submit(
        &self,
        reimbursement_id: Uuid,
        acting_user: Uuid,
    ) -> WorkflowResult<ReimbursementModel> {
        let now = self.clock.now();
        self.machine
            .transition_with(
                reimbursement_id,
                ReportStatus::Pending,
                acting_user,
                None,
                move |reimbursement| {
                    if reimbursement.submitted_at.is_none() {
                        reimbursement.submitted_at = Some(now);
                    }
                },
            )
            .await
    }

    pub async fn begin_review(
        &self,
        reimbursement_id: Uuid,
        acting_user: Uuid,
    ) -> WorkflowResult<ReimbursementModel> {
        self.machine
            .transition(reimbursement_id, ReportStatus::InReview, acting_user, None)
            .await
    }

    pub async fn approve(
        &self,
        reimbursement_id: Uuid,
        acting_user: Uuid,
    ) -> WorkflowResult<ReimbursementModel> {
        self.machine
            .transition(reimbursement_id, ReportStatus::Approved, acting_user, None)
            .await
    }

    pub async fn return_for_correction(
        &self,
        reimbursement_id: Uuid,
        acting_user: Uuid,
        reason: &str,
    ) -> WorkflowResult<ReimbursementModel> {
        self.machine
            .transition(
                reimbursement_id,
                ReportStatus::ReturnedForCorrection,
                acting_user,
                Some(reason),
            )
            .await
    }

    pub async fn reject(
        &self,
        reimbursement_id: Uuid,
        acting_user: Uuid,
        reason: &str,
    ) -> WorkflowResult<ReimbursementModel> {
        self.machine
            .transition(
                reimbursement_id,
                ReportStatus::Rejected,
                acting_user,
                Some(reason),
            )
            .await
    }

    pub async fn conclude(
        &self,
        reimbursement_id: Uuid,
        acting_user: Uuid,
    ) -> WorkflowResult<ReimbursementModel> {
        self.machine
            .transition(reimbursement_id, ReportStatus::Concluded, acting_user, None)
            .await
    }

    pub async fn history(
        &self,
        reimbursement_id: Uuid,
    ) -> WorkflowResult<Vec<HistoryEntryModel<ReportStatus>>> {
        let reimbursement = self.find(reimbursement_id).await?;
        Ok(audit::ordered(&reimbursement.history))
    }
}
