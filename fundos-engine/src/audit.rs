use fundos_api::domain::transition::WorkflowState;
use fundos_api::error::{WorkflowError, WorkflowResult};
use fundos_db::models::history::HistoryEntryModel;
use fundos_db::models::workflow_entity::WorkflowEntity;

/// Append one entry to an entity's trail. Crate-private: the status machine
/// is the only writer, UI code reads through [`ordered`].
pub(crate) fn record<E: WorkflowEntity>(entity: &mut E, entry: HistoryEntryModel<E::State>) {
    entity.record_history(entry);
}

/// History entries ordered for timeline display: by timestamp, insertion
/// order breaking ties (the sort is stable and entries are stored in
/// insertion order).
pub fn ordered<S: WorkflowState>(entries: &[HistoryEntryModel<S>]) -> Vec<HistoryEntryModel<S>> {
    let mut sorted = entries.to_vec();
    sorted.sort_by_key(|entry| entry.changed_at);
    sorted
}

/// The most recent entry under [`ordered`] semantics.
pub fn latest<S: WorkflowState>(
    entries: &[HistoryEntryModel<S>],
) -> Option<&HistoryEntryModel<S>> {
    entries.iter().fold(None, |best, entry| match best {
        Some(b) if entry.changed_at >= b.changed_at => Some(entry),
        None => Some(entry),
        keep => keep,
    })
}

/// Verify the audit invariants of an entity against its draft status:
/// an entity past `draft` has a non-empty trail, the first entry leaves
/// `draft`, consecutive entries chain from-status to to-status, and the
/// last entry lands on the current status.
pub fn check_integrity<E: WorkflowEntity>(entity: &E, draft: E::State) -> WorkflowResult<()> {
    let entries = ordered(entity.history());
    let current = entity.current_status();

    if entries.is_empty() {
        if current == draft {
            return Ok(());
        }
        return Err(WorkflowError::InternalError(format!(
            "status '{current}' has no supporting history"
        )));
    }

    if entries[0].from_status != draft {
        return Err(WorkflowError::InternalError(format!(
            "history starts at '{}' instead of '{draft}'",
            entries[0].from_status
        )));
    }
    for pair in entries.windows(2) {
        if pair[1].from_status != pair[0].to_status {
            return Err(WorkflowError::InternalError(format!(
                "history breaks between '{}' and '{}'",
                pair[0].to_status, pair[1].from_status
            )));
        }
    }

    let last = &entries[entries.len() - 1];
    if last.to_status != current {
        return Err(WorkflowError::InternalError(format!(
            "history ends at '{}' but current status is '{current}'",
            last.to_status
        )));
    }
    Ok(())
}
