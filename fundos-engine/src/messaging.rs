use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use fundos_api::domain::request_status::RequestStatus;
use fundos_api::error::{WorkflowError, WorkflowResult};
use fundos_api::service::clock::Clock;
use fundos_db::models::message::{ConversationKey, MessageKind, MessageModel};
use fundos_db::models::request::FundRequestModel;
use fundos_db::repository::message_log::MessageLog;

use crate::machine::StatusMachine;

/// Derived conversation view: never stored, rebuilt from the flat message
/// log on every read.
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub key: ConversationKey,
    pub messages: Vec<MessageModel>,
}

impl Conversation {
    pub fn unread_for(&self, user_id: Uuid) -> usize {
        self.messages
            .iter()
            .filter(|message| message.recipient_id == user_id && !message.read)
            .count()
    }

    pub fn last_activity(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.messages.last().map(|message| message.sent_at)
    }
}

/// Side channel between requesters and administrators.
///
/// Decoupled from the status machine except for one action: an
/// administrator's unlock message, which lifts a default
/// (`InDefault -> Regularized`) through the machine's own `transition`
/// entry point before the message is appended. A refused transition
/// appends nothing, so the audit trail and the thread never disagree.
pub struct MessagingService {
    log: Arc<dyn MessageLog>,
    clock: Arc<dyn Clock>,
    requests: Arc<StatusMachine<FundRequestModel>>,
}

impl MessagingService {
    pub fn new(
        log: Arc<dyn MessageLog>,
        clock: Arc<dyn Clock>,
        requests: Arc<StatusMachine<FundRequestModel>>,
    ) -> Self {
        Self {
            log,
            clock,
            requests,
        }
    }

    pub async fn send_text(
        &self,
        sender_id: Uuid,
        recipient_id: Uuid,
        content: &str,
        subject_request_id: Option<Uuid>,
    ) -> WorkflowResult<MessageModel> {
        self.append(
            sender_id,
            recipient_id,
            content,
            subject_request_id,
            MessageKind::Text,
        )
        .await
    }

    /// Administrator unlock: regularize a defaulted request and record the
    /// message that did it. The message content doubles as the transition
    /// reason in the audit trail.
    pub async fn send_unlock(
        &self,
        admin_id: Uuid,
        recipient_id: Uuid,
        request_id: Uuid,
        content: &str,
    ) -> WorkflowResult<(FundRequestModel, MessageModel)> {
        let request = self
            .requests
            .transition(
                request_id,
                RequestStatus::Regularized,
                admin_id,
                Some(content),
            )
            .await?;
        let message = self
            .append(
                admin_id,
                recipient_id,
                content,
                Some(request_id),
                MessageKind::Unlock,
            )
            .await?;
        Ok((request, message))
    }

    /// The thread between two participants, ordered by send time.
    pub async fn conversation(&self, a: Uuid, b: Uuid) -> WorkflowResult<Conversation> {
        let key = ConversationKey::of(a, b);
        let mut messages: Vec<MessageModel> = self
            .list_all()
            .await?
            .into_iter()
            .filter(|message| ConversationKey::of_message(message) == key)
            .collect();
        messages.sort_by_key(|message| message.sent_at);
        Ok(Conversation { key, messages })
    }

    /// Every thread the user participates in, most recent activity first.
    pub async fn conversations_for(&self, user_id: Uuid) -> WorkflowResult<Vec<Conversation>> {
        let mut grouped: BTreeMap<ConversationKey, Vec<MessageModel>> = BTreeMap::new();
        for message in self.list_all().await? {
            let key = ConversationKey::of_message(&message);
            if key.involves(user_id) {
                grouped.entry(key).or_default().push(message);
            }
        }

        let mut conversations: Vec<Conversation> = grouped
            .into_iter()
            .map(|(key, mut messages)| {
                messages.sort_by_key(|message| message.sent_at);
                Conversation { key, messages }
            })
            .collect();
        conversations.sort_by_key(|conversation| conversation.last_activity());
        conversations.reverse();
        Ok(conversations)
    }

    /// Mark everything addressed to `reader` in the thread as read.
    /// Returns how many messages were flipped.
    pub async fn mark_read(&self, key: ConversationKey, reader: Uuid) -> WorkflowResult<usize> {
        let unread: Vec<Uuid> = self
            .list_all()
            .await?
            .into_iter()
            .filter(|message| {
                ConversationKey::of_message(message) == key
                    && message.recipient_id == reader
                    && !message.read
            })
            .map(|message| message.id)
            .collect();
        if !unread.is_empty() {
            self.log
                .mark_read(&unread)
                .await
                .map_err(WorkflowError::internal)?;
        }
        Ok(unread.len())
    }

    async fn append(
        &self,
        sender_id: Uuid,
        recipient_id: Uuid,
        content: &str,
        subject_request_id: Option<Uuid>,
        kind: MessageKind,
    ) -> WorkflowResult<MessageModel> {
        let content = content.trim();
        if content.is_empty() {
            return Err(WorkflowError::ValidationError(
                "message content must not be empty".to_string(),
            ));
        }
        if sender_id == recipient_id {
            return Err(WorkflowError::ValidationError(
                "a conversation needs two distinct participants".to_string(),
            ));
        }

        self.log
            .append(MessageModel {
                id: Uuid::new_v4(),
                sender_id,
                recipient_id,
                subject_request_id,
                kind,
                content: content.to_string(),
                sent_at: self.clock.now(),
                read: false,
            })
            .await
            .map_err(WorkflowError::internal)
    }

    async fn list_all(&self) -> WorkflowResult<Vec<MessageModel>> {
        self.log.list_all().await.map_err(WorkflowError::internal)
    }
}
