use uuid::Uuid;

/// Trait for entities addressable by UUID.
pub trait Identifiable {
    fn get_id(&self) -> Uuid;
}

/// Trait for entities guarded by an optimistic-concurrency version counter.
///
/// The counter starts at 0 on creation and is incremented by the store on
/// every successful update; a write carrying a stale expected version is
/// refused.
pub trait Versioned {
    fn get_version(&self) -> u64;
    fn set_version(&mut self, version: u64);
}
