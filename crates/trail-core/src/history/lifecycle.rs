//! Tombstone lifecycle for history entries: active → tombstoned → purged.
//!
//! Administrative cleanup only; the automatic writer never calls these.
//! Tombstoning hides an entry from default queries without touching its
//! recorded diff; purge is the single irreversible transition and only
//! applies to entries that were tombstoned first.

use anyhow::{Context, Result};
use rusqlite::{Connection, params};

use crate::clock::now_us;

/// Tombstone an active entry. Returns false when no active row matched.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn tombstone_history(conn: &Connection, history_id: &str) -> Result<bool> {
    let affected = conn
        .execute(
            "UPDATE assign_histories SET is_deleted = 1, deleted_at_us = ?1
             WHERE history_id = ?2 AND is_deleted = 0",
            params![now_us(), history_id],
        )
        .with_context(|| format!("tombstone history '{history_id}'"))?;
    Ok(affected > 0)
}

/// Restore a tombstoned entry. Returns false when no tombstoned row matched.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn restore_history(conn: &Connection, history_id: &str) -> Result<bool> {
    let affected = conn
        .execute(
            "UPDATE assign_histories SET is_deleted = 0, deleted_at_us = NULL
             WHERE history_id = ?1 AND is_deleted = 1",
            params![history_id],
        )
        .with_context(|| format!("restore history '{history_id}'"))?;
    Ok(affected > 0)
}

/// Permanently purge a tombstoned entry. Returns false when the row is
/// absent or still active.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn purge_history(conn: &Connection, history_id: &str) -> Result<bool> {
    let affected = conn
        .execute(
            "DELETE FROM assign_histories WHERE history_id = ?1 AND is_deleted = 1",
            params![history_id],
        )
        .with_context(|| format!("purge history '{history_id}'"))?;
    Ok(affected > 0)
}
