use crate::models::identifiable::{Identifiable, Versioned};
use crate::repository::create::Create;
use crate::repository::find_by_id::FindById;
use crate::repository::update::Update;

/// Everything the status machine needs from a backing store, as one trait
/// object bound.
pub trait EntityStore<T: Identifiable + Versioned>:
    FindById<T> + Create<T> + Update<T> + Send + Sync
{
}

impl<S, T> EntityStore<T> for S
where
    T: Identifiable + Versioned,
    S: FindById<T> + Create<T> + Update<T> + Send + Sync,
{
}
