use async_trait::async_trait;

use crate::models::identifiable::Identifiable;

/// Generic repository trait for creating a single entity
///
/// Creation fails if an entity with the same id already exists; ids are
/// minted by the caller, never by the store.
///
/// # Type Parameters
/// * `T` - The entity type, which must implement the Identifiable trait
#[async_trait]
pub trait Create<T: Identifiable>: Send + Sync {
    /// Persist a new entity
    ///
    /// # Arguments
    /// * `item` - The entity to create
    ///
    /// # Returns
    /// * `Ok(T)` - The created entity as stored
    /// * `Err` - An error if the entity could not be created
    async fn create(&self, item: T) -> Result<T, Box<dyn std::error::Error + Send + Sync>>;
}
