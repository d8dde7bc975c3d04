//! Application state shared across request handlers.

use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Shared server state: one store connection behind a mutex plus the
/// pagination settings from config.
///
/// Requests are serialized at the connection; each handler's primary
/// update and history insert run back to back in its call stack, which
/// is what guarantees per-entity history entries appear in commit order.
pub struct AppState {
    db: Mutex<Connection>,
    pub per_page_default: u32,
    pub per_page_max: u32,
}

impl AppState {
    #[must_use]
    pub fn new(conn: Connection, per_page_default: u32, per_page_max: u32) -> Self {
        Self {
            db: Mutex::new(conn),
            per_page_default: per_page_default.max(1),
            per_page_max: per_page_max.max(1),
        }
    }

    /// Borrow the store connection. A poisoned mutex is recovered rather
    /// than propagated: SQLite state is consistent per statement and the
    /// panicking handler has already been torn down.
    pub(crate) fn db(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
