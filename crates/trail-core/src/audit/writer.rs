//! Best-effort history writer.
//!
//! Runs strictly after the primary entity update has committed, in the
//! same call stack. A failed insert is logged with enough context to
//! reconstruct the lost entry by hand and then suppressed; it must never
//! roll back or fail the caller's update.

use anyhow::{Context, Result};
use rusqlite::{Connection, params};

use super::detect::ChangeSet;
use super::tracked::TrackedField;
use crate::clock::now_us;
use crate::error::ErrorCode;
use crate::history::{HISTORY_ID_PREFIX, HistoryEntry};
use crate::model::entity::EntityKind;
use crate::model::ident;

/// Context for one history write: which entity changed and who changed it.
#[derive(Debug, Clone, Copy)]
pub struct ChangeContext<'a> {
    pub kind: EntityKind,
    pub entity_id: &'a str,
    /// The authenticated actor, when one is resolvable.
    pub actor_id: Option<&'a str>,
    /// The entity's creator; the actor fallback when no session actor
    /// exists. An update must never fail purely for lack of an actor.
    pub created_by: &'a str,
    /// Optional free-text note carried onto the entry.
    pub note: Option<&'a str>,
}

/// Persist one history entry for a non-empty change set.
///
/// Returns `None` for an empty change set (a no-op, not an error) and
/// `None` when the insert fails — the failure is logged and swallowed.
pub fn record_change(
    conn: &Connection,
    ctx: &ChangeContext<'_>,
    changes: &ChangeSet,
) -> Option<HistoryEntry> {
    if changes.is_empty() {
        return None;
    }

    match try_record(conn, ctx, changes) {
        Ok(entry) => Some(entry),
        Err(error) => {
            let diff = serde_json::to_string(changes)
                .unwrap_or_else(|_| "<unserializable diff>".to_owned());
            tracing::error!(
                code = %ErrorCode::HistoryWriteFailed,
                entity_kind = %ctx.kind,
                entity_id = ctx.entity_id,
                actor = ctx.actor_id.unwrap_or(ctx.created_by),
                diff = %diff,
                error = %format!("{error:#}"),
                "history write failed; primary update is unaffected"
            );
            None
        }
    }
}

fn try_record(
    conn: &Connection,
    ctx: &ChangeContext<'_>,
    changes: &ChangeSet,
) -> Result<HistoryEntry> {
    let assign_by = ctx.actor_id.unwrap_or(ctx.created_by).to_owned();

    // Snapshot columns hold the *new* value of each changed field.
    let assign_to = changes
        .get(&TrackedField::Assignee)
        .and_then(|c| c.new.as_text().map(ToOwned::to_owned));
    let status = changes
        .get(&TrackedField::Status)
        .and_then(|c| c.new.as_text().map(ToOwned::to_owned));
    let status_at_us = changes
        .get(&TrackedField::SubmittedAt)
        .and_then(|c| c.new.as_timestamp());

    let entry = HistoryEntry {
        id: ident::generate(HISTORY_ID_PREFIX),
        entity_kind: ctx.kind,
        entity_id: ctx.entity_id.to_owned(),
        assign_by,
        assign_to,
        status,
        status_at_us,
        note: ctx.note.map(ToOwned::to_owned),
        changes: changes.clone(),
        is_deleted: false,
        deleted_at_us: None,
        created_at_us: now_us(),
    };

    let changes_json = serde_json::to_string(&entry.changes).context("serialize change set")?;

    conn.execute(
        "INSERT INTO assign_histories (
            history_id, entity_kind, entity_id, assign_by, assign_to,
            status, status_at_us, note, changes_json,
            is_deleted, deleted_at_us, created_at_us
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, NULL, ?10)",
        params![
            entry.id,
            entry.entity_kind.as_str(),
            entry.entity_id,
            entry.assign_by,
            entry.assign_to,
            entry.status,
            entry.status_at_us,
            entry.note,
            changes_json,
            entry.created_at_us,
        ],
    )
    .with_context(|| format!("insert history entry for {} {}", ctx.kind, ctx.entity_id))?;

    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::{ChangeContext, record_change};
    use crate::audit::detect::{ChangeSet, FieldChange};
    use crate::audit::tracked::{FieldValue, TrackedField};
    use crate::db::migrations;
    use crate::model::entity::EntityKind;
    use rusqlite::Connection;

    fn test_db() -> Connection {
        let mut conn = Connection::open_in_memory().expect("open in-memory db");
        migrations::migrate(&mut conn).expect("migrate schema");
        conn
    }

    fn assignee_change(old: Option<&str>, new: Option<&str>) -> ChangeSet {
        let mut changes = ChangeSet::new();
        changes.insert(
            TrackedField::Assignee,
            FieldChange {
                old: old.map_or(FieldValue::Null, |v| FieldValue::Text(v.into())),
                new: new.map_or(FieldValue::Null, |v| FieldValue::Text(v.into())),
            },
        );
        changes
    }

    fn ctx<'a>(actor: Option<&'a str>) -> ChangeContext<'a> {
        ChangeContext {
            kind: EntityKind::Brief,
            entity_id: "br-0000000042",
            actor_id: actor,
            created_by: "us-creator",
            note: None,
        }
    }

    #[test]
    fn empty_change_set_is_a_no_op() {
        let conn = test_db();
        assert!(record_change(&conn, &ctx(Some("us-actor")), &ChangeSet::new()).is_none());
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM assign_histories", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 0);
    }

    #[test]
    fn one_entry_aggregates_all_changed_fields() {
        let conn = test_db();
        let mut changes = assignee_change(Some("us-1"), Some("us-5"));
        changes.insert(
            TrackedField::Status,
            FieldChange {
                old: FieldValue::Text("draft".into()),
                new: FieldValue::Text("submitted".into()),
            },
        );

        let entry = record_change(&conn, &ctx(Some("us-actor")), &changes).expect("entry");
        assert_eq!(entry.assign_to.as_deref(), Some("us-5"));
        assert_eq!(entry.status.as_deref(), Some("submitted"));
        assert_eq!(entry.changes.len(), 2);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM assign_histories", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 1);
    }

    #[test]
    fn actor_falls_back_to_creator() {
        let conn = test_db();
        let entry =
            record_change(&conn, &ctx(None), &assignee_change(None, Some("us-5"))).expect("entry");
        assert_eq!(entry.assign_by, "us-creator");
    }

    #[test]
    fn cleared_assignee_snapshots_as_null() {
        let conn = test_db();
        let entry = record_change(
            &conn,
            &ctx(Some("us-actor")),
            &assignee_change(Some("us-1"), None),
        )
        .expect("entry");
        assert_eq!(entry.assign_to, None);
        assert_eq!(
            entry.changes[&TrackedField::Assignee].old,
            FieldValue::Text("us-1".into())
        );
    }

    #[test]
    fn insert_failure_is_swallowed() {
        let conn = test_db();
        conn.execute_batch("DROP TABLE assign_histories")
            .expect("drop table");
        // No panic, no error: the writer logs and returns None.
        assert!(
            record_change(
                &conn,
                &ctx(Some("us-actor")),
                &assignee_change(Some("us-1"), Some("us-5")),
            )
            .is_none()
        );
    }
}
