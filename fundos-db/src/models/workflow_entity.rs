use fundos_api::domain::transition::{WorkflowKind, WorkflowState};

use crate::models::history::HistoryEntryModel;
use crate::models::identifiable::{Identifiable, Versioned};

/// Trait binding an entity model to its status vocabulary and audit trail.
///
/// Implemented by every model the status machine can drive. History access
/// is deliberately asymmetric: reads are public, appends go through
/// `record_history` so nothing but the machine produces entries.
pub trait WorkflowEntity: Identifiable + Versioned + Clone + Send + Sync + 'static {
    type State: WorkflowState;

    fn kind() -> WorkflowKind;

    fn current_status(&self) -> Self::State;

    fn set_status(&mut self, status: Self::State);

    fn history(&self) -> &[HistoryEntryModel<Self::State>];

    fn record_history(&mut self, entry: HistoryEntryModel<Self::State>);
}
