//! History endpoints: `/assign-histories` and the per-user/per-entity
//! convenience reads.
//!
//! Entries are read-only over HTTP except for the tombstone lifecycle.
//! Invalid lifecycle transitions answer 409 rather than 404: the caller
//! can see the entry, it is just in the wrong state.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use trail_core::error::ErrorCode;
use trail_core::history::lifecycle::{purge_history, restore_history, tombstone_history};
use trail_core::history::query::{get_history, histories_by_actor, histories_for_entity, list_histories};
use trail_core::history::{ActorDirection, HistoryEntry, HistoryFilter};
use trail_core::model::entity::EntityKind;
use trail_core::scope::Visibility;

use super::actor::resolve_actor;
use super::params::{FieldErrors, parse_flag, parse_kind, parse_page, parse_time};
use super::state::AppState;
use super::{data_envelope, internal_error, json_error, not_found, page_envelope, validation_error};

fn conflict(message: &str) -> Response {
    json_error(StatusCode::CONFLICT, ErrorCode::ValidationFailed, message)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct HistoriesQuery {
    entity_kind: Option<String>,
    entity_id: Option<String>,
    assign_by_id: Option<String>,
    assign_to_id: Option<String>,
    status: Option<String>,
    since: Option<String>,
    until: Option<String>,
    include_deleted: Option<String>,
    page: Option<String>,
    per_page: Option<String>,
}

pub(crate) async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoriesQuery>,
    headers: HeaderMap,
) -> Response {
    let mut errors = FieldErrors::default();
    let entity_kind = parse_kind(query.entity_kind.as_deref(), "entity_kind", &mut errors);
    let since_us = parse_time(query.since.as_deref(), "since", &mut errors);
    let until_us = parse_time(query.until.as_deref(), "until", &mut errors);
    let include_deleted = parse_flag(query.include_deleted.as_deref(), "include_deleted", &mut errors);
    let page = parse_page(
        query.page.as_deref(),
        query.per_page.as_deref(),
        state.per_page_default,
        state.per_page_max,
        &mut errors,
    );
    if !errors.is_empty() {
        return validation_error(errors);
    }

    let filter = HistoryFilter {
        entity_kind,
        entity_id: query.entity_id,
        assign_by: query.assign_by_id,
        assign_to: query.assign_to_id,
        status: query.status,
        since_us,
        until_us,
        include_deleted,
    };

    let conn = state.db();
    let actor = resolve_actor(&conn, &headers);
    let vis = Visibility::for_actor(actor.as_ref());
    match list_histories(&conn, &vis, &filter, page) {
        Ok(page) => page_envelope(&page),
        Err(error) => internal_error(&error),
    }
}

pub(crate) async fn show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let conn = state.db();
    let actor = resolve_actor(&conn, &headers);
    let vis = Visibility::for_actor(actor.as_ref());
    match get_history(&conn, &vis, &id, false) {
        Ok(Some(entry)) => data_envelope(&entry),
        Ok(None) => not_found(ErrorCode::HistoryNotFound),
        Err(error) => internal_error(&error),
    }
}

/// Resolve the entry for a lifecycle transition: visible (tombstoned
/// included) or a 404 that does not reveal whether it ever existed.
fn lifecycle_target(
    conn: &rusqlite::Connection,
    headers: &HeaderMap,
    id: &str,
) -> Result<HistoryEntry, Response> {
    let actor = resolve_actor(conn, headers);
    let vis = Visibility::for_actor(actor.as_ref());
    match get_history(conn, &vis, id, true) {
        Ok(Some(entry)) => Ok(entry),
        Ok(None) => Err(not_found(ErrorCode::HistoryNotFound)),
        Err(error) => Err(internal_error(&error)),
    }
}

pub(crate) async fn tombstone(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let conn = state.db();
    let entry = match lifecycle_target(&conn, &headers, &id) {
        Ok(entry) => entry,
        Err(response) => return response,
    };
    if entry.is_deleted {
        return conflict("history entry is already tombstoned");
    }
    match tombstone_history(&conn, &id) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => conflict("history entry is already tombstoned"),
        Err(error) => internal_error(&error),
    }
}

pub(crate) async fn restore(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let conn = state.db();
    let entry = match lifecycle_target(&conn, &headers, &id) {
        Ok(entry) => entry,
        Err(response) => return response,
    };
    if !entry.is_deleted {
        return conflict("history entry is not tombstoned");
    }
    match restore_history(&conn, &id) {
        Ok(true) => data_envelope(&HistoryEntry {
            is_deleted: false,
            deleted_at_us: None,
            ..entry
        }),
        Ok(false) => conflict("history entry is not tombstoned"),
        Err(error) => internal_error(&error),
    }
}

pub(crate) async fn purge(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let conn = state.db();
    let entry = match lifecycle_target(&conn, &headers, &id) {
        Ok(entry) => entry,
        Err(response) => return response,
    };
    if !entry.is_deleted {
        return conflict("history entry must be tombstoned before purge");
    }
    match purge_history(&conn, &id) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => conflict("history entry must be tombstoned before purge"),
        Err(error) => internal_error(&error),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ByActorQuery {
    direction: Option<String>,
    page: Option<String>,
    per_page: Option<String>,
}

pub(crate) async fn by_actor(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<ByActorQuery>,
    headers: HeaderMap,
) -> Response {
    let mut errors = FieldErrors::default();
    let direction = match query.direction.as_deref() {
        None | Some("by") => ActorDirection::AssignedBy,
        Some("to") => ActorDirection::AssignedTo,
        Some(other) => {
            errors.push("direction", format!("'{other}' is not one of: by, to"));
            ActorDirection::AssignedBy
        }
    };
    let page = parse_page(
        query.page.as_deref(),
        query.per_page.as_deref(),
        state.per_page_default,
        state.per_page_max,
        &mut errors,
    );
    if !errors.is_empty() {
        return validation_error(errors);
    }

    let conn = state.db();
    let actor = resolve_actor(&conn, &headers);
    let vis = Visibility::for_actor(actor.as_ref());
    match histories_by_actor(&conn, &vis, &user_id, direction, page) {
        Ok(page) => page_envelope(&page),
        Err(error) => internal_error(&error),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ForEntityQuery {
    page: Option<String>,
    per_page: Option<String>,
}

pub(crate) async fn for_entity(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, String)>,
    Query(query): Query<ForEntityQuery>,
    headers: HeaderMap,
) -> Response {
    let Ok(kind) = EntityKind::from_str(&kind) else {
        return not_found(ErrorCode::InvalidKind);
    };

    let mut errors = FieldErrors::default();
    let page = parse_page(
        query.page.as_deref(),
        query.per_page.as_deref(),
        state.per_page_default,
        state.per_page_max,
        &mut errors,
    );
    if !errors.is_empty() {
        return validation_error(errors);
    }

    let conn = state.db();
    let actor = resolve_actor(&conn, &headers);
    let vis = Visibility::for_actor(actor.as_ref());
    match histories_for_entity(&conn, &vis, kind, &id, page) {
        Ok(page) => page_envelope(&page),
        Err(error) => internal_error(&error),
    }
}
