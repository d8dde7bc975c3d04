//! Entity write pipeline.
//!
//! The audit hook is explicit rather than hidden in a model lifecycle
//! callback: `update_entity` snapshots tracked fields, commits the UPDATE,
//! re-snapshots, diffs, and hands any changes to the best-effort history
//! writer — strictly in that order, in the caller's call stack.

use anyhow::Result;
use rusqlite::Connection;

use crate::audit::detect::detect_changes;
use crate::audit::tracked::tracked_fields;
use crate::audit::writer::{ChangeContext, record_change};
use crate::clock::now_us;
use crate::db::entities::{
    self, get_entity, insert_entity, list_entities, update_entity_row,
};
use crate::db::users::user_exists;
use crate::history::HistoryEntry;
use crate::model::entity::{EntityKind, EntityPatch, ValidationError, WorkflowEntity};
use crate::model::ident;
use crate::model::user::Actor;
use crate::page::{Page, PageRequest};
use crate::scope::Visibility;

/// Fields for a new workflow entity.
#[derive(Debug, Clone)]
pub struct NewEntity {
    pub kind: EntityKind,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub assigned_to: Option<String>,
    pub submitted_at_us: Option<i64>,
}

/// Result of a successful entity update: the new state plus the history
/// entry the update produced, if any tracked field changed.
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub entity: WorkflowEntity,
    pub history: Option<HistoryEntry>,
}

/// Create a workflow entity. The actor becomes its immutable creator.
///
/// # Errors
///
/// Returns [`ValidationError`] for empty title/status or an unknown
/// assignee, or an error if the insert fails.
pub fn create_entity(conn: &Connection, actor: &Actor, new: NewEntity) -> Result<WorkflowEntity> {
    if new.title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle.into());
    }
    if new.status.trim().is_empty() {
        return Err(ValidationError::EmptyStatus.into());
    }
    if let Some(assignee) = &new.assigned_to {
        if !user_exists(conn, assignee)? {
            return Err(ValidationError::UnknownAssignee(assignee.clone()).into());
        }
    }

    let now = now_us();
    let entity = WorkflowEntity {
        id: ident::generate(new.kind.id_prefix()),
        kind: new.kind,
        title: new.title,
        description: new.description,
        status: new.status,
        created_by: actor.id.clone(),
        assigned_to: new.assigned_to,
        submitted_at_us: new.submitted_at_us,
        is_deleted: false,
        deleted_at_us: None,
        created_at_us: now,
        updated_at_us: now,
    };
    insert_entity(conn, &entity)?;
    Ok(entity)
}

/// Fetch one entity under the actor's scope.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn fetch_entity(
    conn: &Connection,
    actor: Option<&Actor>,
    kind: EntityKind,
    entity_id: &str,
) -> Result<Option<WorkflowEntity>> {
    let vis = Visibility::for_actor(actor);
    get_entity(conn, &vis, kind, entity_id, false)
}

/// List entities under the actor's scope.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_scoped_entities(
    conn: &Connection,
    actor: Option<&Actor>,
    filter: &entities::EntityFilter,
    page: PageRequest,
) -> Result<Page<WorkflowEntity>> {
    let vis = Visibility::for_actor(actor);
    list_entities(conn, &vis, filter, page)
}

/// Update an entity and record its audit trail.
///
/// Returns `Ok(None)` when the entity is absent or outside the actor's
/// scope — mutation rights reuse the read scope, so an unauthorized
/// update is indistinguishable from updating a missing entity.
///
/// Exactly one history entry is written when one or more tracked fields
/// changed; none otherwise. A failed history write is logged and
/// swallowed, and the committed update is returned as a success.
///
/// # Errors
///
/// Returns [`ValidationError`] for empty title/status or an unknown
/// assignee, or an error if the primary update itself fails.
pub fn update_entity(
    conn: &Connection,
    actor: Option<&Actor>,
    kind: EntityKind,
    entity_id: &str,
    patch: &EntityPatch,
) -> Result<Option<UpdateOutcome>> {
    if matches!(&patch.title, Some(t) if t.trim().is_empty()) {
        return Err(ValidationError::EmptyTitle.into());
    }
    if matches!(&patch.status, Some(s) if s.trim().is_empty()) {
        return Err(ValidationError::EmptyStatus.into());
    }
    if let Some(Some(assignee)) = &patch.assigned_to {
        if !user_exists(conn, assignee)? {
            return Err(ValidationError::UnknownAssignee(assignee.clone()).into());
        }
    }

    let vis = Visibility::for_actor(actor);
    let Some(original) = get_entity(conn, &vis, kind, entity_id, false)? else {
        return Ok(None);
    };

    let before = original.tracked_snapshot();

    let mut updated = original.clone();
    if let Some(title) = &patch.title {
        updated.title = title.clone();
    }
    if let Some(description) = &patch.description {
        updated.description = Some(description.clone());
    }
    if let Some(status) = &patch.status {
        updated.status = status.clone();
    }
    if let Some(assigned_to) = &patch.assigned_to {
        updated.assigned_to = assigned_to.clone();
    }
    if let Some(submitted_at_us) = patch.submitted_at_us {
        updated.submitted_at_us = submitted_at_us;
    }
    updated.updated_at_us = now_us();

    // Primary commit. Everything after this line is best-effort auditing
    // and must not influence the caller-visible result.
    if !update_entity_row(conn, &updated)? {
        return Ok(None);
    }

    let after = updated.tracked_snapshot();
    let changes = detect_changes(&before, &after, tracked_fields(kind));
    let history = record_change(
        conn,
        &ChangeContext {
            kind,
            entity_id: &updated.id,
            actor_id: actor.map(|a| a.id.as_str()),
            created_by: &updated.created_by,
            note: patch.note.as_deref(),
        },
        &changes,
    );

    Ok(Some(UpdateOutcome {
        entity: updated,
        history,
    }))
}

/// Tombstone an entity under the actor's scope.
///
/// # Errors
///
/// Returns an error if the database update fails.
pub fn tombstone_entity(
    conn: &Connection,
    actor: Option<&Actor>,
    kind: EntityKind,
    entity_id: &str,
) -> Result<bool> {
    let vis = Visibility::for_actor(actor);
    if get_entity(conn, &vis, kind, entity_id, false)?.is_none() {
        return Ok(false);
    }
    entities::tombstone_entity(conn, kind, entity_id)
}

/// Restore a tombstoned entity under the actor's scope.
///
/// # Errors
///
/// Returns an error if the database update fails.
pub fn restore_entity(
    conn: &Connection,
    actor: Option<&Actor>,
    kind: EntityKind,
    entity_id: &str,
) -> Result<bool> {
    let vis = Visibility::for_actor(actor);
    match get_entity(conn, &vis, kind, entity_id, true)? {
        Some(entity) if entity.is_deleted => entities::restore_entity(conn, kind, entity_id),
        _ => Ok(false),
    }
}

/// Permanently purge a tombstoned entity under the actor's scope. Its
/// history entries are left in place.
///
/// # Errors
///
/// Returns an error if the database delete fails.
pub fn purge_entity(
    conn: &Connection,
    actor: Option<&Actor>,
    kind: EntityKind,
    entity_id: &str,
) -> Result<bool> {
    let vis = Visibility::for_actor(actor);
    match get_entity(conn, &vis, kind, entity_id, true)? {
        Some(entity) if entity.is_deleted => entities::purge_entity(conn, kind, entity_id),
        _ => Ok(false),
    }
}
