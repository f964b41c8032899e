//! Persistence for users, issues and their audit events.

pub mod events;
pub mod schema;
pub mod sqlite;

pub use sqlite::{DatabaseLocation, ListFilters, MutationContext, SqliteStorage};

use std::sync::{Arc, Mutex, MutexGuard};

/// One connection shared by every request handler.
pub type SharedStorage = Arc<Mutex<SqliteStorage>>;

/// Wrap a storage handle for sharing.
#[must_use]
pub fn shared(storage: SqliteStorage) -> SharedStorage {
    Arc::new(Mutex::new(storage))
}

/// Lock the shared connection.
///
/// A panic while holding the lock cannot leave the connection mid-transaction
/// (rusqlite rolls back on drop), so a poisoned lock is still usable.
pub fn lock(storage: &SharedStorage) -> MutexGuard<'_, SqliteStorage> {
    storage
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}
