use async_trait::async_trait;
use uuid::Uuid;

use crate::models::identifiable::Identifiable;

/// Generic repository trait for finding entities by their ID
///
/// Returns an Option so callers decide how a missing entity is reported;
/// the status machine maps `None` to its NotFound error.
///
/// # Type Parameters
/// * `T` - The entity type, which must implement the Identifiable trait
///
/// # Example
/// ```ignore
/// impl FindById<FundRequestModel> for InMemoryEntityStore<FundRequestModel> {
///     async fn find_by_id(&self, id: Uuid) -> Result<Option<FundRequestModel>, Box<dyn Error + Send + Sync>> {
///         // Implementation
///     }
/// }
/// ```
#[async_trait]
pub trait FindById<T: Identifiable>: Send + Sync {
    /// Find an entity by its unique identifier
    ///
    /// # Arguments
    /// * `id` - The UUID of the entity to find
    ///
    /// # Returns
    /// * `Ok(Some(T))` - The found entity
    /// * `Ok(None)` - If the entity does not exist
    /// * `Err` - An error if the query could not be executed
    async fn find_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<T>, Box<dyn std::error::Error + Send + Sync>>;
}
