use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use fundos_api::domain::role::ActorIdentity;
use fundos_api::domain::transition::{TransitionTable, WorkflowState};
use fundos_api::error::{WorkflowError, WorkflowResult};
use fundos_api::service::clock::Clock;
use fundos_api::service::identity::IdentityProvider;
use fundos_api::service::notification::{NotificationSink, StatusChangeNotice};
use fundos_db::models::history::HistoryEntryModel;
use fundos_db::models::identifiable::{Identifiable, Versioned};
use fundos_db::models::workflow_entity::WorkflowEntity;
use fundos_db::repository::entity_store::EntityStore;
use fundos_db::repository::update::UpdateOutcome;

use crate::audit;

/// Executes role-gated status transitions for one entity kind.
///
/// A transition is a unit: legality check against the table, the status
/// write, and the history append either all happen in one store update or
/// none of them happen. Notification is the only side effect allowed to
/// fail without rolling anything back.
pub struct StatusMachine<E: WorkflowEntity> {
    store: Arc<dyn EntityStore<E>>,
    identity: Arc<dyn IdentityProvider>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn NotificationSink>,
    table: TransitionTable<E::State>,
}

impl<E: WorkflowEntity> StatusMachine<E> {
    pub fn new(
        store: Arc<dyn EntityStore<E>>,
        identity: Arc<dyn IdentityProvider>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn NotificationSink>,
        table: TransitionTable<E::State>,
    ) -> Self {
        Self {
            store,
            identity,
            clock,
            notifier,
            table,
        }
    }

    pub fn table(&self) -> &TransitionTable<E::State> {
        &self.table
    }

    /// Statuses the acting user may move this entity to right now. Drives
    /// which action buttons the UI renders; an empty set hides them all.
    pub async fn available_for(
        &self,
        entity_id: Uuid,
        acting_user: Uuid,
    ) -> WorkflowResult<HashSet<E::State>> {
        let actor = self.resolve_actor(acting_user).await?;
        let entity = self.load(entity_id).await?;
        Ok(self
            .table
            .available_transitions(actor.role, entity.current_status()))
    }

    /// Execute a single transition.
    ///
    /// Fails with `NotFound` for an unresolvable entity or acting user,
    /// `IllegalTransition` when the table does not permit the move (self
    /// loops included), and `ValidationError` when a mandatory reason is
    /// missing. On any failure the entity and its history are untouched.
    pub async fn transition(
        &self,
        entity_id: Uuid,
        target: E::State,
        acting_user: Uuid,
        reason: Option<&str>,
    ) -> WorkflowResult<E> {
        self.transition_with(entity_id, target, acting_user, reason, |_| {})
            .await
    }

    /// Like [`transition`](Self::transition), with an extra entity patch
    /// applied inside the same atomic write. Used by the composite
    /// operations (report attach/replace, submission timestamps) so their
    /// payload lands together with the status and history.
    pub(crate) async fn transition_with<F>(
        &self,
        entity_id: Uuid,
        target: E::State,
        acting_user: Uuid,
        reason: Option<&str>,
        patch: F,
    ) -> WorkflowResult<E>
    where
        F: FnOnce(&mut E),
    {
        let actor = self.resolve_actor(acting_user).await?;
        let entity = self.load(entity_id).await?;
        let current = entity.current_status();

        if target == current || !self.table.permits(actor.role, current, target) {
            return Err(WorkflowError::IllegalTransition {
                role: actor.role.to_string(),
                from: current.to_string(),
                to: target.to_string(),
            });
        }

        let reason = reason
            .map(str::trim)
            .filter(|trimmed| !trimmed.is_empty())
            .map(str::to_string);
        if target.requires_reason() && reason.is_none() {
            return Err(WorkflowError::ValidationError(format!(
                "a non-empty reason is required to enter status '{target}'"
            )));
        }

        let expected_version = entity.get_version();
        let now = self.clock.now();

        let mut updated = entity;
        patch(&mut updated);
        updated.set_status(target);
        audit::record(
            &mut updated,
            HistoryEntryModel {
                from_status: current,
                to_status: target,
                changed_at: now,
                changed_by: actor.id,
                role: actor.role,
                reason: reason.clone(),
            },
        );

        let stored = match self
            .store
            .update(updated, expected_version)
            .await
            .map_err(WorkflowError::internal)?
        {
            UpdateOutcome::Updated(stored) => stored,
            UpdateOutcome::VersionMismatch { actual } => {
                return Err(WorkflowError::Conflict(format!(
                    "{} {entity_id} was modified concurrently (expected version {expected_version}, found {actual})",
                    E::kind(),
                )));
            }
        };

        tracing::info!(
            kind = %E::kind(),
            entity_id = %entity_id,
            from = %current,
            to = %target,
            role = %actor.role,
            "status transition committed"
        );

        self.dispatch_notice(&stored, current, target, &actor, reason, now)
            .await;

        Ok(stored)
    }

    async fn resolve_actor(&self, acting_user: Uuid) -> WorkflowResult<ActorIdentity> {
        self.identity
            .resolve(acting_user)
            .await
            .map_err(WorkflowError::internal)?
            .ok_or_else(|| WorkflowError::NotFound(format!("acting user {acting_user}")))
    }

    async fn load(&self, entity_id: Uuid) -> WorkflowResult<E> {
        self.store
            .find_by_id(entity_id)
            .await
            .map_err(WorkflowError::internal)?
            .ok_or_else(|| WorkflowError::NotFound(format!("{} {entity_id}", E::kind())))
    }

    async fn dispatch_notice(
        &self,
        entity: &E,
        from: E::State,
        to: E::State,
        actor: &ActorIdentity,
        reason: Option<String>,
        occurred_at: chrono::DateTime<chrono::Utc>,
    ) {
        let notice = StatusChangeNotice {
            entity_id: entity.get_id(),
            kind: E::kind(),
            from: from.to_string(),
            to: to.to_string(),
            summary: to.description().to_string(),
            acting_user: actor.id,
            role: actor.role,
            reason,
            occurred_at,
        };
        if let Err(err) = self.notifier.notify(notice).await {
            tracing::warn!(
                kind = %E::kind(),
                entity_id = %entity.get_id(),
                error = %err,
                "status-change notification failed; transition is already committed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helper::{setup_request_context, FailingSink};
    use async_trait::async_trait;
    use fundos_api::domain::request_status::RequestStatus;
    use fundos_api::domain::transition::fund_request_transitions;
    use fundos_db::models::request::FundRequestModel;
    use fundos_db::repository::create::Create;
    use fundos_db::repository::find_by_id::FindById;
    use fundos_db::repository::update::Update;
    use fundos_db::repository::update::UpdateOutcome;

    type TestError = Box<dyn std::error::Error + Send + Sync>;

    #[tokio::test]
    async fn administrator_moves_a_submitted_request_into_review() -> Result<(), TestError> {
        let ctx = setup_request_context();
        let request = ctx.submitted_request().await?;

        let updated = ctx
            .requests
            .machine()
            .transition(request.id, RequestStatus::UnderReview, ctx.admin, None)
            .await?;

        assert_eq!(updated.status, RequestStatus::UnderReview);
        assert_eq!(updated.history.len(), 2);
        let last = updated.history.last().unwrap();
        assert_eq!(last.from_status, RequestStatus::Submitted);
        assert_eq!(last.to_status, RequestStatus::UnderReview);
        assert_eq!(last.changed_by, ctx.admin);
        Ok(())
    }

    #[tokio::test]
    async fn rejecting_without_a_reason_changes_nothing() -> Result<(), TestError> {
        let ctx = setup_request_context();
        let request = ctx.submitted_request().await?;
        let request = ctx
            .requests
            .machine()
            .transition(request.id, RequestStatus::UnderReview, ctx.admin, None)
            .await?;

        let result = ctx
            .requests
            .machine()
            .transition(request.id, RequestStatus::Rejected, ctx.admin, Some("   "))
            .await;

        assert!(matches!(result, Err(WorkflowError::ValidationError(_))));
        let reloaded = ctx.store.find_by_id(request.id).await?.unwrap();
        assert_eq!(reloaded.status, RequestStatus::UnderReview);
        assert_eq!(reloaded.history.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn requester_cannot_approve_a_request() -> Result<(), TestError> {
        let ctx = setup_request_context();
        let request = ctx.submitted_request().await?;
        let request = ctx
            .requests
            .machine()
            .transition(request.id, RequestStatus::UnderReview, ctx.admin, None)
            .await?;

        let result = ctx
            .requests
            .machine()
            .transition(
                request.id,
                RequestStatus::ApprovedForGrant,
                ctx.requester,
                None,
            )
            .await;

        assert!(matches!(
            result,
            Err(WorkflowError::IllegalTransition { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn self_loops_are_illegal_for_every_status() -> Result<(), TestError> {
        let ctx = setup_request_context();
        let request = ctx.submitted_request().await?;

        for user in [ctx.admin, ctx.requester] {
            let result = ctx
                .requests
                .machine()
                .transition(request.id, RequestStatus::Submitted, user, None)
                .await;
            assert!(matches!(
                result,
                Err(WorkflowError::IllegalTransition { .. })
            ));
        }
        Ok(())
    }

    #[tokio::test]
    async fn unknown_entity_and_unknown_user_are_not_found() -> Result<(), TestError> {
        let ctx = setup_request_context();
        let request = ctx.submitted_request().await?;

        let missing_entity = ctx
            .requests
            .machine()
            .transition(
                Uuid::new_v4(),
                RequestStatus::UnderReview,
                ctx.admin,
                None,
            )
            .await;
        assert!(matches!(missing_entity, Err(WorkflowError::NotFound(_))));

        let missing_user = ctx
            .requests
            .machine()
            .transition(
                request.id,
                RequestStatus::UnderReview,
                Uuid::new_v4(),
                None,
            )
            .await;
        assert!(matches!(missing_user, Err(WorkflowError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn notification_failure_never_rolls_back() -> Result<(), TestError> {
        let ctx = setup_request_context();
        let request = ctx.submitted_request().await?;

        let machine = StatusMachine::new(
            ctx.entity_store(),
            ctx.identity.clone(),
            ctx.clock.clone(),
            Arc::new(FailingSink),
            fund_request_transitions(),
        );
        let updated = machine
            .transition(request.id, RequestStatus::UnderReview, ctx.admin, None)
            .await?;

        assert_eq!(updated.status, RequestStatus::UnderReview);
        let reloaded = ctx.store.find_by_id(request.id).await?.unwrap();
        assert_eq!(reloaded.status, RequestStatus::UnderReview);
        Ok(())
    }

    /// Store that reports every guarded write as lost to a concurrent one.
    struct ContendedStore {
        inner: Arc<crate::store::memory::InMemoryEntityStore<FundRequestModel>>,
    }

    #[async_trait]
    impl FindById<FundRequestModel> for ContendedStore {
        async fn find_by_id(&self, id: Uuid) -> Result<Option<FundRequestModel>, TestError> {
            self.inner.find_by_id(id).await
        }
    }

    #[async_trait]
    impl Create<FundRequestModel> for ContendedStore {
        async fn create(&self, item: FundRequestModel) -> Result<FundRequestModel, TestError> {
            self.inner.create(item).await
        }
    }

    #[async_trait]
    impl Update<FundRequestModel> for ContendedStore {
        async fn update(
            &self,
            _item: FundRequestModel,
            _expected_version: u64,
        ) -> Result<UpdateOutcome<FundRequestModel>, TestError> {
            Ok(UpdateOutcome::VersionMismatch { actual: 99 })
        }
    }

    #[tokio::test]
    async fn concurrent_writes_surface_as_conflict() -> Result<(), TestError> {
        let ctx = setup_request_context();
        let request = ctx.submitted_request().await?;

        let machine = StatusMachine::new(
            Arc::new(ContendedStore {
                inner: ctx.store.clone(),
            }),
            ctx.identity.clone(),
            ctx.clock.clone(),
            ctx.notifier.clone(),
            fund_request_transitions(),
        );
        let result = machine
            .transition(request.id, RequestStatus::UnderReview, ctx.admin, None)
            .await;

        assert!(matches!(result, Err(WorkflowError::Conflict(_))));
        let reloaded = ctx.store.find_by_id(request.id).await?.unwrap();
        assert_eq!(reloaded.status, RequestStatus::Submitted);
        Ok(())
    }

    #[tokio::test]
    async fn available_transitions_follow_the_actor_role() -> Result<(), TestError> {
        let ctx = setup_request_context();
        let request = ctx.submitted_request().await?;

        let for_admin = ctx
            .requests
            .machine()
            .available_for(request.id, ctx.admin)
            .await?;
        assert_eq!(
            for_admin,
            HashSet::from([RequestStatus::UnderReview])
        );

        let for_requester = ctx
            .requests
            .machine()
            .available_for(request.id, ctx.requester)
            .await?;
        assert!(for_requester.is_empty());
        Ok(())
    }
}
