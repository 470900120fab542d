use std::sync::Arc;

use chrono::Duration;
use uuid::Uuid;

use fundos_api::domain::request_status::RequestStatus;
use fundos_api::domain::role::ActorIdentity;
use fundos_api::error::{WorkflowError, WorkflowResult};
use fundos_api::service::clock::Clock;
use fundos_db::models::request::FundRequestModel;
use fundos_db::repository::query::QueryBy;

use crate::listing::RequestFilter;
use crate::machine::StatusMachine;

/// Days after the usage period ends before an unreported advance falls
/// into default ("em alcance").
pub const REPORTING_DEADLINE_DAYS: i64 = 30;

/// Timer-driven transitions, made explicit.
///
/// The host invokes `sweep` on whatever cadence it likes (cron, poll loop);
/// each due request is advanced one step through the same machine entry
/// point as a button click, acting as the system principal. A failure on
/// one request is logged and never aborts the rest of the sweep.
pub struct DeadlineScheduler {
    store: Arc<dyn QueryBy<FundRequestModel, RequestFilter>>,
    machine: Arc<StatusMachine<FundRequestModel>>,
    clock: Arc<dyn Clock>,
}

impl DeadlineScheduler {
    pub fn new(
        store: Arc<dyn QueryBy<FundRequestModel, RequestFilter>>,
        machine: Arc<StatusMachine<FundRequestModel>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            machine,
            clock,
        }
    }

    /// Advance every request whose timer has elapsed. Returns the ids that
    /// moved.
    pub async fn sweep(&self) -> WorkflowResult<Vec<Uuid>> {
        let today = self.clock.now().date_naive();
        let system = ActorIdentity::system().id;
        let requests = self
            .store
            .query(&RequestFilter::default())
            .await
            .map_err(WorkflowError::internal)?;

        let mut advanced = Vec::new();
        for request in requests {
            let target = match request.status {
                RequestStatus::FundsReleased if today >= request.period_start => {
                    RequestStatus::InExecution
                }
                RequestStatus::InExecution if today > request.period_end => {
                    RequestStatus::AwaitingReport
                }
                RequestStatus::AwaitingReport
                    if today > request.period_end + Duration::days(REPORTING_DEADLINE_DAYS) =>
                {
                    RequestStatus::InDefault
                }
                _ => continue,
            };

            match self
                .machine
                .transition(request.id, target, system, None)
                .await
            {
                Ok(_) => advanced.push(request.id),
                Err(err) => {
                    tracing::warn!(
                        request_id = %request.id,
                        target = %target,
                        error = %err,
                        "deadline sweep transition failed"
                    );
                }
            }
        }
        Ok(advanced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helper::{setup_request_context, RequestContext, SYSTEM_USER};

    type TestError = Box<dyn std::error::Error + Send + Sync>;

    fn scheduler(ctx: &RequestContext) -> DeadlineScheduler {
        DeadlineScheduler::new(
            ctx.store.clone(),
            ctx.requests.machine_handle(),
            ctx.clock.clone(),
        )
    }

    #[tokio::test]
    async fn a_released_advance_enters_execution_when_the_period_starts() -> Result<(), TestError> {
        let ctx = setup_request_context();
        let request = ctx.submitted_request().await?;
        ctx.requests.begin_review(request.id, ctx.admin).await?;
        ctx.requests.approve(request.id, ctx.admin).await?;
        ctx.requests.release_funds(request.id, ctx.admin).await?;

        // Clock starts before the usage period: nothing is due yet.
        let advanced = scheduler(&ctx).sweep().await?;
        assert!(advanced.is_empty());

        ctx.clock.advance(chrono::Duration::days(5));
        let advanced = scheduler(&ctx).sweep().await?;
        assert_eq!(advanced, vec![request.id]);
        let reloaded = ctx.requests.find(request.id).await?;
        assert_eq!(reloaded.status, RequestStatus::InExecution);
        Ok(())
    }

    #[tokio::test]
    async fn an_unreported_advance_falls_into_default() -> Result<(), TestError> {
        let ctx = setup_request_context();
        let request = ctx.awaiting_report_request().await?;

        // Inside the reporting window: still waiting.
        ctx.clock.advance(chrono::Duration::days(40));
        assert!(scheduler(&ctx).sweep().await?.is_empty());

        // Past period_end + 30 days: the request defaults.
        ctx.clock.advance(chrono::Duration::days(30));
        let advanced = scheduler(&ctx).sweep().await?;
        assert_eq!(advanced, vec![request.id]);

        let reloaded = ctx.requests.find(request.id).await?;
        assert_eq!(reloaded.status, RequestStatus::InDefault);
        let last = reloaded.history.last().unwrap();
        assert_eq!(last.changed_by, SYSTEM_USER);
        Ok(())
    }

    #[tokio::test]
    async fn terminal_and_reported_requests_are_left_alone() -> Result<(), TestError> {
        let ctx = setup_request_context();
        let reported = ctx.reported_request().await?;

        ctx.clock.advance(chrono::Duration::days(365));
        let advanced = scheduler(&ctx).sweep().await?;
        assert!(advanced.is_empty());

        let reloaded = ctx.requests.find(reported.id).await?;
        assert_eq!(reloaded.status, RequestStatus::ReportSubmitted);
        Ok(())
    }
}
