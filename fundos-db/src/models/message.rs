use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::identifiable::Identifiable;

/// Kind of a side-channel message.
///
/// `Unlock` marks the one administrator action that also drives a status
/// transition (lifting a default); everything else is plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    Text,
    Unlock,
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageKind::Text => write!(f, "Text"),
            MessageKind::Unlock => write!(f, "Unlock"),
        }
    }
}

/// One message in the flat log. Conversations are not stored; they are
/// rebuilt from this log on every read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageModel {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    /// Request this message is about, when sent from an entity detail view.
    pub subject_request_id: Option<Uuid>,
    pub kind: MessageKind,
    pub content: String,
    pub sent_at: DateTime<Utc>,
    pub read: bool,
}

impl Identifiable for MessageModel {
    fn get_id(&self) -> Uuid {
        self.id
    }
}

/// Conversation identity: the participant pair, order-normalized so that
/// `of(a, b) == of(b, a)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationKey {
    lo: Uuid,
    hi: Uuid,
}

impl ConversationKey {
    pub fn of(a: Uuid, b: Uuid) -> Self {
        if a <= b {
            Self { lo: a, hi: b }
        } else {
            Self { lo: b, hi: a }
        }
    }

    pub fn of_message(message: &MessageModel) -> Self {
        Self::of(message.sender_id, message.recipient_id)
    }

    pub fn participants(&self) -> (Uuid, Uuid) {
        (self.lo, self.hi)
    }

    pub fn involves(&self, user_id: Uuid) -> bool {
        self.lo == user_id || self.hi == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_serialize_with_plain_enum_tags() {
        let message = MessageModel {
            id: Uuid::nil(),
            sender_id: Uuid::nil(),
            recipient_id: Uuid::nil(),
            subject_request_id: None,
            kind: MessageKind::Unlock,
            content: "Default lifted".to_string(),
            sent_at: chrono::DateTime::from_timestamp(1_709_283_600, 0).unwrap(),
            read: false,
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["kind"], "Unlock");
        assert_eq!(value["read"], false);
    }

    #[test]
    fn key_is_order_insensitive() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(ConversationKey::of(a, b), ConversationKey::of(b, a));
        assert!(ConversationKey::of(a, b).involves(a));
        assert!(ConversationKey::of(a, b).involves(b));
        assert!(!ConversationKey::of(a, b).involves(Uuid::new_v4()));
    }
}
