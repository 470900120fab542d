use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fundos_api::domain::role::ActorRole;
use fundos_api::domain::transition::WorkflowState;

/// # Documentation
/// - One audit record per committed status change.
/// - Written only by the status machine, in the same store write that
///   updates the entity's status.
/// - Ordered by `changed_at`, with insertion order breaking ties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntryModel<S: WorkflowState> {
    pub from_status: S,
    pub to_status: S,
    pub changed_at: DateTime<Utc>,
    pub changed_by: Uuid,
    pub role: ActorRole,
    /// Mandatory for return-for-correction and reject actions, optional
    /// otherwise. Stored trimmed.
    pub reason: Option<String>,
}
