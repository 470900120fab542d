use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use fundos_api::domain::role::{ActorIdentity, ActorRole};
use fundos_api::service::identity::IdentityProvider;
use fundos_db::models::identifiable::{Identifiable, Versioned};
use fundos_db::models::message::MessageModel;
use fundos_db::models::request::FundRequestModel;
use fundos_db::repository::create::Create;
use fundos_db::repository::find_by_id::FindById;
use fundos_db::repository::message_log::MessageLog;
use fundos_db::repository::query::QueryBy;
use fundos_db::repository::update::{Update, UpdateOutcome};

use crate::listing::{matches, RequestFilter};

type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Reference entity store: the original portal's in-memory context,
/// re-expressed behind the repository traits so hosts can swap in a durable
/// implementation without touching the engine.
pub struct InMemoryEntityStore<T> {
    entries: RwLock<HashMap<Uuid, T>>,
}

impl<T> InMemoryEntityStore<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<T> Default for InMemoryEntityStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> FindById<T> for InMemoryEntityStore<T>
where
    T: Identifiable + Clone + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        Ok(self.entries.read().get(&id).cloned())
    }
}

#[async_trait]
impl<T> Create<T> for InMemoryEntityStore<T>
where
    T: Identifiable + Clone + Send + Sync + 'static,
{
    async fn create(&self, item: T) -> Result<T, StoreError> {
        let mut entries = self.entries.write();
        let id = item.get_id();
        if entries.contains_key(&id) {
            return Err(format!("entity {id} already exists").into());
        }
        entries.insert(id, item.clone());
        Ok(item)
    }
}

#[async_trait]
impl<T> Update<T> for InMemoryEntityStore<T>
where
    T: Identifiable + Versioned + Clone + Send + Sync + 'static,
{
    async fn update(
        &self,
        mut item: T,
        expected_version: u64,
    ) -> Result<UpdateOutcome<T>, StoreError> {
        let mut entries = self.entries.write();
        let id = item.get_id();
        let Some(stored) = entries.get(&id) else {
            return Err(format!("entity {id} does not exist").into());
        };
        let actual = stored.get_version();
        if actual != expected_version {
            return Ok(UpdateOutcome::VersionMismatch { actual });
        }
        item.set_version(expected_version + 1);
        entries.insert(id, item.clone());
        Ok(UpdateOutcome::Updated(item))
    }
}

#[async_trait]
impl QueryBy<FundRequestModel, RequestFilter> for InMemoryEntityStore<FundRequestModel> {
    async fn query(&self, filter: &RequestFilter) -> Result<Vec<FundRequestModel>, StoreError> {
        let mut rows: Vec<FundRequestModel> = self
            .entries
            .read()
            .values()
            .filter(|request| matches(request, filter))
            .cloned()
            .collect();
        // Deterministic store order; list screens re-sort as requested.
        rows.sort_by_key(|request| (request.created_at, request.id));
        Ok(rows)
    }
}

/// Flat, append-only message log.
pub struct InMemoryMessageLog {
    messages: RwLock<Vec<MessageModel>>,
}

impl InMemoryMessageLog {
    pub fn new() -> Self {
        Self {
            messages: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryMessageLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageLog for InMemoryMessageLog {
    async fn append(&self, message: MessageModel) -> Result<MessageModel, StoreError> {
        self.messages.write().push(message.clone());
        Ok(message)
    }

    async fn list_all(&self) -> Result<Vec<MessageModel>, StoreError> {
        Ok(self.messages.read().clone())
    }

    async fn mark_read(&self, ids: &[Uuid]) -> Result<(), StoreError> {
        let mut messages = self.messages.write();
        for message in messages.iter_mut() {
            if ids.contains(&message.id) {
                message.read = true;
            }
        }
        Ok(())
    }
}

/// Role directory backing the identity provider. The system principal is
/// seeded so scheduler transitions resolve like any other actor.
pub struct InMemoryIdentityProvider {
    users: RwLock<HashMap<Uuid, ActorRole>>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        let system = ActorIdentity::system();
        let mut users = HashMap::new();
        users.insert(system.id, system.role);
        Self {
            users: RwLock::new(users),
        }
    }

    pub fn register(&self, user_id: Uuid, role: ActorRole) {
        self.users.write().insert(user_id, role);
    }
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn resolve(&self, user_id: Uuid) -> Result<Option<ActorIdentity>, StoreError> {
        Ok(self
            .users
            .read()
            .get(&user_id)
            .map(|role| ActorIdentity::new(user_id, *role)))
    }
}
