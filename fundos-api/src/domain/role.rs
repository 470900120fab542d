use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Roles recognized by the workflow.
///
/// The portal has exactly two human roles. `System` is the principal used by
/// the deadline scheduler for timer-driven transitions; it never originates
/// from a logged-in session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorRole {
    Requester,
    Administrator,
    System,
}

impl std::fmt::Display for ActorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActorRole::Requester => write!(f, "Requester"),
            ActorRole::Administrator => write!(f, "Administrator"),
            ActorRole::System => write!(f, "System"),
        }
    }
}

impl std::str::FromStr for ActorRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Requester" => Ok(ActorRole::Requester),
            "Administrator" => Ok(ActorRole::Administrator),
            "System" => Ok(ActorRole::System),
            _ => Err(format!("Invalid ActorRole: {s}")),
        }
    }
}

/// A resolved acting user: identity plus role.
///
/// Instances are produced by the identity provider; the status machine never
/// builds one from request data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorIdentity {
    pub id: Uuid,
    pub role: ActorRole,
}

impl ActorIdentity {
    pub fn new(id: Uuid, role: ActorRole) -> Self {
        Self { id, role }
    }

    /// The scheduler principal. Registered with the identity provider under
    /// the nil UUID.
    pub fn system() -> Self {
        Self {
            id: Uuid::nil(),
            role: ActorRole::System,
        }
    }
}
