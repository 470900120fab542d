use async_trait::async_trait;

use crate::models::identifiable::{Identifiable, Versioned};

/// Result of a guarded update.
///
/// The version conflict is part of the contract rather than a stringly
/// error so the status machine can surface it as a typed Conflict.
#[derive(Debug, Clone)]
pub enum UpdateOutcome<T> {
    /// The write succeeded; the stored entity carries the bumped version.
    Updated(T),
    /// The expected version was stale; nothing was written.
    VersionMismatch { actual: u64 },
}

/// Generic repository trait for updating an entity under optimistic
/// concurrency control
///
/// The whole entity (status, history, embedded report) is written in one
/// call, which is what makes the machine's status+history append atomic.
///
/// # Type Parameters
/// * `T` - The entity type, which must implement Identifiable and Versioned
#[async_trait]
pub trait Update<T: Identifiable + Versioned>: Send + Sync {
    /// Replace the stored entity if its version still equals `expected_version`
    ///
    /// # Arguments
    /// * `item` - The new entity state
    /// * `expected_version` - The version the caller read before mutating
    ///
    /// # Returns
    /// * `Ok(UpdateOutcome::Updated(T))` - The stored entity, version bumped
    /// * `Ok(UpdateOutcome::VersionMismatch)` - A concurrent write won
    /// * `Err` - An error if the write could not be executed
    async fn update(
        &self,
        item: T,
        expected_version: u64,
    ) -> Result<UpdateOutcome<T>, Box<dyn std::error::Error + Send + Sync>>;
}
