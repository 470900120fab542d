use std::collections::HashSet;
use std::sync::Arc;

use heapless::String as HeaplessString;
use rust_decimal::Decimal;
use uuid::Uuid;
use validator::Validate;

use fundos_api::domain::payload::{ExpenseReportPayload, FundRequestPayload};
use fundos_api::domain::report_status::ReportStatus;
use fundos_api::domain::request_status::RequestStatus;
use fundos_api::domain::transition::fund_request_transitions;
use fundos_api::error::{WorkflowError, WorkflowResult};
use fundos_api::service::clock::Clock;
use fundos_api::service::identity::IdentityProvider;
use fundos_api::service::notification::NotificationSink;
use fundos_db::models::expense_report::{ExpenseLineItemModel, ExpenseReportModel};
use fundos_db::models::history::HistoryEntryModel;
use fundos_db::models::request::FundRequestModel;
use fundos_db::repository::entity_store::EntityStore;

use crate::audit;
use crate::machine::StatusMachine;

fn bounded<const N: usize>(field: &str, value: &str) -> WorkflowResult<HeaplessString<N>> {
    HeaplessString::<N>::try_from(value.trim())
        .map_err(|_| WorkflowError::ValidationError(format!("{field} exceeds {N} characters")))
}

/// Report-cycle status mirrored onto the embedded expense report when the
/// request enters one of its `Report*` stages. Applied inside the same
/// store write as the request transition.
fn report_cycle_shadow(target: RequestStatus) -> Option<ReportStatus> {
    match target {
        RequestStatus::ReportSubmitted | RequestStatus::ReportCorrected => {
            Some(ReportStatus::Pending)
        }
        RequestStatus::ReportUnderReview => Some(ReportStatus::InReview),
        RequestStatus::ReportReturned => Some(ReportStatus::ReturnedForCorrection),
        RequestStatus::ReportRejected => Some(ReportStatus::Rejected),
        RequestStatus::ReportApproved => Some(ReportStatus::Approved),
        RequestStatus::Archived => Some(ReportStatus::Concluded),
        _ => None,
    }
}

/// UI-facing operations on fund-advance requests.
///
/// Every status change funnels through the one [`StatusMachine`] entry
/// point; this service adds payload validation and the entity patches that
/// must land atomically with a transition (submission timestamps, report
/// attach/replace, shadow status).
pub struct FundRequestService {
    machine: Arc<StatusMachine<FundRequestModel>>,
    store: Arc<dyn EntityStore<FundRequestModel>>,
    clock: Arc<dyn Clock>,
}

impl FundRequestService {
    pub fn new(
        store: Arc<dyn EntityStore<FundRequestModel>>,
        identity: Arc<dyn IdentityProvider>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        let machine = Arc::new(StatusMachine::new(
            store.clone(),
            identity,
            clock.clone(),
            notifier,
            fund_request_transitions(),
        ));
        Self {
            machine,
            store,
            clock,
        }
    }

    pub fn machine(&self) -> &StatusMachine<FundRequestModel> {
        &self.machine
    }

    pub fn machine_handle(&self) -> Arc<StatusMachine<FundRequestModel>> {
        Arc::clone(&self.machine)
    }

    pub async fn find(&self, request_id: Uuid) -> WorkflowResult<FundRequestModel> {
        self.store
            .find_by_id(request_id)
            .await
            .map_err(WorkflowError::internal)?
            .ok_or_else(|| WorkflowError::NotFound(format!("FundRequest {request_id}")))
    }

    /// Open a new draft. Drafts carry no history; the first entry is
    /// written on submission.
    pub async fn create_draft(
        &self,
        payload: &FundRequestPayload,
    ) -> WorkflowResult<FundRequestModel> {
        payload
            .validate()
            .map_err(|err| WorkflowError::ValidationError(err.to_string()))?;
        if payload.period_end < payload.period_start {
            return Err(WorkflowError::ValidationError(
                "usage period ends before it starts".to_string(),
            ));
        }

        let model = FundRequestModel {
            id: Uuid::new_v4(),
            requester_id: payload.requester_id,
            created_at: self.clock.now(),
            submitted_at: None,
            status: RequestStatus::Draft,
            expense_category: bounded::<50>("expense category", &payload.expense_category)?,
            cost_center: bounded::<20>("cost center", &payload.cost_center)?,
            jurisdiction: bounded::<50>("jurisdiction", &payload.jurisdiction)?,
            amount: payload.amount,
            justification: payload.justification.trim().to_string(),
            period_start: payload.period_start,
            period_end: payload.period_end,
            attachment: payload.attachment.clone(),
            history: Vec::new(),
            expense_report: None,
            version: 0,
        };
        self.store
            .create(model)
            .await
            .map_err(WorkflowError::internal)
    }

    /// Submit a draft, or resubmit after a return for adjustment.
    pub async fn submit(
        &self,
        request_id: Uuid,
        acting_user: Uuid,
    ) -> WorkflowResult<FundRequestModel> {
        let now = self.clock.now();
        self.machine
            .transition_with(
                request_id,
                RequestStatus::Submitted,
                acting_user,
                None,
                move |request| {
                    if request.submitted_at.is_none() {
                        request.submitted_at = Some(now);
                    }
                },
            )
            .await
    }

    pub async fn begin_review(
        &self,
        request_id: Uuid,
        acting_user: Uuid,
    ) -> WorkflowResult<FundRequestModel> {
        self.machine
            .transition(request_id, RequestStatus::UnderReview, acting_user, None)
            .await
    }

    pub async fn approve(
        &self,
        request_id: Uuid,
        acting_user: Uuid,
    ) -> WorkflowResult<FundRequestModel> {
        self.machine
            .transition(
                request_id,
                RequestStatus::ApprovedForGrant,
                acting_user,
                None,
            )
            .await
    }

    pub async fn return_for_adjustment(
        &self,
        request_id: Uuid,
        acting_user: Uuid,
        reason: &str,
    ) -> WorkflowResult<FundRequestModel> {
        self.machine
            .transition(
                request_id,
                RequestStatus::ReturnedForAdjustment,
                acting_user,
                Some(reason),
            )
            .await
    }

    pub async fn reject(
        &self,
        request_id: Uuid,
        acting_user: Uuid,
        reason: &str,
    ) -> WorkflowResult<FundRequestModel> {
        self.machine
            .transition(
                request_id,
                RequestStatus::Rejected,
                acting_user,
                Some(reason),
            )
            .await
    }

    pub async fn release_funds(
        &self,
        request_id: Uuid,
        acting_user: Uuid,
    ) -> WorkflowResult<FundRequestModel> {
        self.machine
            .transition(request_id, RequestStatus::FundsReleased, acting_user, None)
            .await
    }

    /// Submit the expense report for an advance awaiting reconciliation.
    ///
    /// The report is validated (positive amounts, unique line ids, declared
    /// total equal to the item sum) and attached in the same write that
    /// moves the request to `ReportSubmitted`.
    pub async fn submit_expense_report(
        &self,
        request_id: Uuid,
        acting_user: Uuid,
        payload: &ExpenseReportPayload,
    ) -> WorkflowResult<FundRequestModel> {
        let report = self.build_report(payload)?;
        self.machine
            .transition_with(
                request_id,
                RequestStatus::ReportSubmitted,
                acting_user,
                None,
                move |request| {
                    request.expense_report = Some(report);
                },
            )
            .await
    }

    /// Resubmit a corrected report after a return (glosa). The line item
    /// list is replaced wholesale and the total recomputed; exactly one
    /// history entry is produced.
    pub async fn correct_expense_report(
        &self,
        request_id: Uuid,
        acting_user: Uuid,
        payload: &ExpenseReportPayload,
    ) -> WorkflowResult<FundRequestModel> {
        let report = self.build_report(payload)?;
        self.machine
            .transition_with(
                request_id,
                RequestStatus::ReportCorrected,
                acting_user,
                None,
                move |request| {
                    request.expense_report = Some(report);
                },
            )
            .await
    }

    pub async fn begin_report_review(
        &self,
        request_id: Uuid,
        acting_user: Uuid,
    ) -> WorkflowResult<FundRequestModel> {
        self.report_stage(request_id, RequestStatus::ReportUnderReview, acting_user, None)
            .await
    }

    pub async fn approve_report(
        &self,
        request_id: Uuid,
        acting_user: Uuid,
    ) -> WorkflowResult<FundRequestModel> {
        self.report_stage(request_id, RequestStatus::ReportApproved, acting_user, None)
            .await
    }

    pub async fn return_report(
        &self,
        request_id: Uuid,
        acting_user: Uuid,
        reason: &str,
    ) -> WorkflowResult<FundRequestModel> {
        self.report_stage(
            request_id,
            RequestStatus::ReportReturned,
            acting_user,
            Some(reason),
        )
        .await
    }

    pub async fn reject_report(
        &self,
        request_id: Uuid,
        acting_user: Uuid,
        reason: &str,
    ) -> WorkflowResult<FundRequestModel> {
        self.report_stage(
            request_id,
            RequestStatus::ReportRejected,
            acting_user,
            Some(reason),
        )
        .await
    }

    pub async fn archive(
        &self,
        request_id: Uuid,
        acting_user: Uuid,
    ) -> WorkflowResult<FundRequestModel> {
        self.report_stage(request_id, RequestStatus::Archived, acting_user, None)
            .await
    }

    /// Timeline of the request, ordered for display.
    pub async fn history(
        &self,
        request_id: Uuid,
    ) -> WorkflowResult<Vec<HistoryEntryModel<RequestStatus>>> {
        let request = self.find(request_id).await?;
        Ok(audit::ordered(&request.history))
    }

    /// Statuses the acting user can move the request to. Drives button and
    /// tab visibility.
    pub async fn available_actions(
        &self,
        request_id: Uuid,
        acting_user: Uuid,
    ) -> WorkflowResult<HashSet<RequestStatus>> {
        self.machine.available_for(request_id, acting_user).await
    }

    async fn report_stage(
        &self,
        request_id: Uuid,
        target: RequestStatus,
        acting_user: Uuid,
        reason: Option<&str>,
    ) -> WorkflowResult<FundRequestModel> {
        self.machine
            .transition_with(request_id, target, acting_user, reason, move |request| {
                if let (Some(report), Some(shadow)) =
                    (request.expense_report.as_mut(), report_cycle_shadow(target))
                {
                    report.status = shadow;
                }
            })
            .await
    }

    fn build_report(&self, payload: &ExpenseReportPayload) -> WorkflowResult<ExpenseReportModel> {
        payload
            .validate()
            .map_err(|err| WorkflowError::ValidationError(err.to_string()))?;

        let mut seen = HashSet::new();
        for item in &payload.items {
            if !seen.insert(item.id) {
                return Err(WorkflowError::ValidationError(format!(
                    "duplicate line item id {}",
                    item.id
                )));
            }
        }

        let total: Decimal = payload.items.iter().map(|item| item.amount).sum();
        if let Some(declared) = payload.declared_total {
            if declared != total {
                return Err(WorkflowError::ValidationError(format!(
                    "declared total {declared} does not match the line item sum {total}"
                )));
            }
        }

        let items = payload
            .items
            .iter()
            .map(|item| ExpenseLineItemModel {
                id: item.id,
                incurred_on: item.incurred_on,
                description: item.description.trim().to_string(),
                amount: item.amount,
                receipt: item.receipt.clone(),
            })
            .collect();

        Ok(ExpenseReportModel {
            submitted_at: self.clock.now(),
            declared_total: total,
            notes: payload
                .notes
                .as_ref()
                .map(|notes| notes.trim().to_string())
                .filter(|notes| !notes.is_empty()),
            status: ReportStatus::Pending,
            items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helper::{
        sample_report_payload, sample_request_payload, setup_request_context, SYSTEM_USER,
    };

    type TestError = Box<dyn std::error::Error + Send + Sync>;

    #[tokio::test]
    async fn submission_stamps_the_request_and_opens_the_trail() -> Result<(), TestError> {
        let ctx = setup_request_context();
        let draft = ctx
            .requests
            .create_draft(&sample_request_payload(ctx.requester))
            .await?;
        assert_eq!(draft.status, RequestStatus::Draft);
        assert!(draft.history.is_empty());
        assert!(draft.submitted_at.is_none());

        let submitted = ctx.requests.submit(draft.id, ctx.requester).await?;
        assert_eq!(submitted.status, RequestStatus::Submitted);
        assert_eq!(submitted.submitted_at, Some(ctx.clock.now()));
        assert_eq!(submitted.history.len(), 1);
        audit::check_integrity(&submitted, RequestStatus::Draft)?;

        assert_eq!(ctx.notifier.count(), 1);
        let notice = ctx.notifier.last().unwrap();
        assert_eq!(notice.to, "Submitted");
        assert_eq!(notice.acting_user, ctx.requester);
        Ok(())
    }

    #[tokio::test]
    async fn drafts_with_bad_payloads_are_refused() -> Result<(), TestError> {
        let ctx = setup_request_context();

        let mut nonpositive = sample_request_payload(ctx.requester);
        nonpositive.amount = "0".parse().unwrap();
        assert!(matches!(
            ctx.requests.create_draft(&nonpositive).await,
            Err(WorkflowError::ValidationError(_))
        ));

        let mut inverted = sample_request_payload(ctx.requester);
        inverted.period_end = inverted.period_start - chrono::Duration::days(1);
        assert!(matches!(
            ctx.requests.create_draft(&inverted).await,
            Err(WorkflowError::ValidationError(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn report_total_is_the_sum_of_its_line_items() -> Result<(), TestError> {
        let ctx = setup_request_context();
        let request = ctx.awaiting_report_request().await?;

        let reported = ctx
            .requests
            .submit_expense_report(request.id, ctx.requester, &sample_report_payload())
            .await?;

        assert_eq!(reported.status, RequestStatus::ReportSubmitted);
        let report = reported.expense_report.as_ref().unwrap();
        assert_eq!(report.declared_total, "1155.75".parse::<Decimal>().unwrap());
        assert_eq!(report.status, ReportStatus::Pending);
        assert_eq!(report.items.len(), 5);
        Ok(())
    }

    #[tokio::test]
    async fn mismatched_declared_totals_are_refused() -> Result<(), TestError> {
        let ctx = setup_request_context();
        let request = ctx.awaiting_report_request().await?;

        let mut payload = sample_report_payload();
        payload.declared_total = Some("1000.00".parse().unwrap());
        let result = ctx
            .requests
            .submit_expense_report(request.id, ctx.requester, &payload)
            .await;

        assert!(matches!(result, Err(WorkflowError::ValidationError(_))));
        let reloaded = ctx.requests.find(request.id).await?;
        assert_eq!(reloaded.status, RequestStatus::AwaitingReport);
        assert!(reloaded.expense_report.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_line_item_ids_are_refused() -> Result<(), TestError> {
        let ctx = setup_request_context();
        let request = ctx.awaiting_report_request().await?;

        let mut payload = sample_report_payload();
        payload.items[1].id = payload.items[0].id;
        let result = ctx
            .requests
            .submit_expense_report(request.id, ctx.requester, &payload)
            .await;

        assert!(matches!(result, Err(WorkflowError::ValidationError(_))));
        Ok(())
    }

    #[tokio::test]
    async fn correction_replaces_items_with_one_history_entry() -> Result<(), TestError> {
        let ctx = setup_request_context();
        let request = ctx.reported_request().await?;
        ctx.requests
            .begin_report_review(request.id, ctx.admin)
            .await?;
        let returned = ctx
            .requests
            .return_report(request.id, ctx.admin, "Receipt for item 3 is illegible")
            .await?;
        assert_eq!(
            returned.expense_report.as_ref().unwrap().status,
            ReportStatus::ReturnedForCorrection
        );
        let history_before = returned.history.len();

        let mut corrected_payload = sample_report_payload();
        corrected_payload.items.truncate(2);
        let corrected = ctx
            .requests
            .correct_expense_report(request.id, ctx.requester, &corrected_payload)
            .await?;

        assert_eq!(corrected.status, RequestStatus::ReportCorrected);
        assert_eq!(corrected.history.len(), history_before + 1);
        let report = corrected.expense_report.as_ref().unwrap();
        assert_eq!(report.items.len(), 2);
        assert_eq!(report.declared_total, "145.50".parse::<Decimal>().unwrap());
        assert_eq!(report.status, ReportStatus::Pending);
        Ok(())
    }

    #[tokio::test]
    async fn returning_a_report_requires_a_reason() -> Result<(), TestError> {
        let ctx = setup_request_context();
        let request = ctx.reported_request().await?;
        let reviewed = ctx
            .requests
            .begin_report_review(request.id, ctx.admin)
            .await?;

        let result = ctx.requests.return_report(request.id, ctx.admin, "  ").await;
        assert!(matches!(result, Err(WorkflowError::ValidationError(_))));

        let reloaded = ctx.requests.find(request.id).await?;
        assert_eq!(reloaded.status, RequestStatus::ReportUnderReview);
        assert_eq!(reloaded.history.len(), reviewed.history.len());
        Ok(())
    }

    #[tokio::test]
    async fn full_lifecycle_reaches_the_archive() -> Result<(), TestError> {
        let ctx = setup_request_context();
        let request = ctx.reported_request().await?;

        ctx.requests
            .begin_report_review(request.id, ctx.admin)
            .await?;
        ctx.requests.approve_report(request.id, ctx.admin).await?;
        let archived = ctx.requests.archive(request.id, ctx.admin).await?;

        assert_eq!(archived.status, RequestStatus::Archived);
        assert_eq!(
            archived.expense_report.as_ref().unwrap().status,
            ReportStatus::Concluded
        );
        assert_eq!(archived.history.len(), 10);
        audit::check_integrity(&archived, RequestStatus::Draft)?;

        // Terminal: nobody moves an archived request.
        let result = ctx
            .requests
            .machine()
            .transition(request.id, RequestStatus::UnderReview, ctx.admin, None)
            .await;
        assert!(matches!(
            result,
            Err(WorkflowError::IllegalTransition { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn system_transitions_are_recorded_with_the_system_actor() -> Result<(), TestError> {
        let ctx = setup_request_context();
        let request = ctx.awaiting_report_request().await?;

        let trail = ctx.requests.history(request.id).await?;
        let system_entries: Vec<_> = trail
            .iter()
            .filter(|entry| entry.changed_by == SYSTEM_USER)
            .collect();
        assert_eq!(system_entries.len(), 2);
        assert_eq!(
            system_entries[0].to_status,
            RequestStatus::InExecution
        );
        assert_eq!(
            system_entries[1].to_status,
            RequestStatus::AwaitingReport
        );
        Ok(())
    }
}
