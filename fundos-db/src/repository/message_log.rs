use async_trait::async_trait;
use uuid::Uuid;

use crate::models::message::MessageModel;

/// Flat, append-only store for side-channel messages.
///
/// There is no conversation table; threads are derived views over
/// `list_all`. The only mutation besides append is flipping read flags.
#[async_trait]
pub trait MessageLog: Send + Sync {
    /// Append one message to the log
    async fn append(
        &self,
        message: MessageModel,
    ) -> Result<MessageModel, Box<dyn std::error::Error + Send + Sync>>;

    /// Every message in the log, in insertion order
    async fn list_all(&self) -> Result<Vec<MessageModel>, Box<dyn std::error::Error + Send + Sync>>;

    /// Mark the given messages as read
    async fn mark_read(&self, ids: &[Uuid])
        -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
