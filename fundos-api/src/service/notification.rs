use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::role::ActorRole;
use crate::domain::transition::WorkflowKind;

/// Human-readable record of a committed status change, pushed to the
/// notification sink after the entity write succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangeNotice {
    pub entity_id: Uuid,
    pub kind: WorkflowKind,
    pub from: String,
    pub to: String,
    /// Description of the target status, suitable for display.
    pub summary: String,
    pub acting_user: Uuid,
    pub role: ActorRole,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Best-effort, fire-and-forget channel for status-change messages.
///
/// A failure here is logged and swallowed; it never rolls back the
/// transition that produced the notice.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(
        &self,
        notice: StatusChangeNotice,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Sink that drops every notice. Default for hosts without messaging.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardNotifications;

#[async_trait]
impl NotificationSink for DiscardNotifications {
    async fn notify(
        &self,
        _notice: StatusChangeNotice,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}
