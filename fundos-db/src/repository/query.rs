use async_trait::async_trait;

/// Generic repository trait for filtered collection reads
///
/// # Type Parameters
/// * `T` - The entity type returned
/// * `F` - The filter type understood by the store
#[async_trait]
pub trait QueryBy<T, F: Send + Sync>: Send + Sync {
    /// List entities matching the filter, in store order
    ///
    /// # Arguments
    /// * `filter` - The filter to apply
    ///
    /// # Returns
    /// * `Ok(Vec<T>)` - Matching entities (possibly empty)
    /// * `Err` - An error if the query could not be executed
    async fn query(&self, filter: &F) -> Result<Vec<T>, Box<dyn std::error::Error + Send + Sync>>;
}
