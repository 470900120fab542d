use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::role::ActorIdentity;

/// Resolves the acting user's identity and role for every transition.
///
/// The status machine must never infer a role from anything other than this
/// provider; role strings carried in request data are not trusted.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a user id to an identity, or `None` for unknown users.
    async fn resolve(
        &self,
        user_id: Uuid,
    ) -> Result<Option<ActorIdentity>, Box<dyn std::error::Error + Send + Sync>>;
}
