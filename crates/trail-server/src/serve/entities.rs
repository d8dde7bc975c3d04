//! Workflow entity endpoints: `/briefs`, `/leads`, `/planners`.
//!
//! The kind is a path segment; an unknown kind is a 404 with its own
//! error code. Reads and mutations alike run under the caller's
//! visibility scope, so an out-of-scope id answers exactly like a
//! missing one.

use std::str::FromStr;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use trail_core::db::entities::EntityFilter;
use trail_core::error::ErrorCode;
use trail_core::model::entity::{EntityKind, EntityPatch, ValidationError};
use trail_core::service::{self, NewEntity};

use super::actor::resolve_actor;
use super::params::{FieldErrors, parse_flag, parse_page};
use super::state::AppState;
use super::{data_envelope, internal_error, json_error, not_found, page_envelope, validation_error};

/// Distinguish "field absent" from "field set to null" in PATCH bodies.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

fn parse_path_kind(raw: &str) -> Result<EntityKind, Response> {
    EntityKind::from_str(raw).map_err(|_| not_found(ErrorCode::InvalidKind))
}

fn validation_failure(error: &anyhow::Error) -> Option<Response> {
    let validation = error.downcast_ref::<ValidationError>()?;
    let mut errors = FieldErrors::default();
    errors.push(validation.field(), validation.to_string());
    Some(validation_error(errors))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ListQuery {
    status: Option<String>,
    created_by: Option<String>,
    assigned_to: Option<String>,
    include_deleted: Option<String>,
    page: Option<String>,
    per_page: Option<String>,
}

pub(crate) async fn list(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> Response {
    let kind = match parse_path_kind(&kind) {
        Ok(kind) => kind,
        Err(response) => return response,
    };

    let mut errors = FieldErrors::default();
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

    let filter = EntityFilter {
        kind: Some(kind),
        status: query.status,
        created_by: query.created_by,
        assigned_to: query.assigned_to,
        include_deleted,
    };

    let conn = state.db();
    let actor = resolve_actor(&conn, &headers);
    match service::list_scoped_entities(&conn, actor.as_ref(), &filter, page) {
        Ok(page) => page_envelope(&page),
        Err(error) => internal_error(&error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateBody {
    title: Option<String>,
    description: Option<String>,
    status: Option<String>,
    assigned_to: Option<String>,
    submitted_at: Option<DateTime<Utc>>,
}

pub(crate) async fn create(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    headers: HeaderMap,
    Json(body): Json<CreateBody>,
) -> Response {
    let kind = match parse_path_kind(&kind) {
        Ok(kind) => kind,
        Err(response) => return response,
    };

    let mut errors = FieldErrors::default();
    if body.title.is_none() {
        errors.push("title", "is required");
    }
    if body.status.is_none() {
        errors.push("status", "is required");
    }
    if !errors.is_empty() {
        return validation_error(errors);
    }

    let conn = state.db();
    let Some(actor) = resolve_actor(&conn, &headers) else {
        return json_error(
            StatusCode::UNAUTHORIZED,
            ErrorCode::Unauthenticated,
            ErrorCode::Unauthenticated.message(),
        );
    };

    let new = NewEntity {
        kind,
        title: body.title.unwrap_or_default(),
        description: body.description,
        status: body.status.unwrap_or_default(),
        assigned_to: body.assigned_to,
        submitted_at_us: body.submitted_at.map(|ts| ts.timestamp_micros()),
    };
    match service::create_entity(&conn, &actor, new) {
        Ok(entity) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "data": entity })),
        )
            .into_response(),
        Err(error) => validation_failure(&error).unwrap_or_else(|| internal_error(&error)),
    }
}

pub(crate) async fn show(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let kind = match parse_path_kind(&kind) {
        Ok(kind) => kind,
        Err(response) => return response,
    };

    let conn = state.db();
    let actor = resolve_actor(&conn, &headers);
    match service::fetch_entity(&conn, actor.as_ref(), kind, &id) {
        Ok(Some(entity)) => data_envelope(&entity),
        Ok(None) => not_found(ErrorCode::EntityNotFound),
        Err(error) => internal_error(&error),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct UpdateBody {
    title: Option<String>,
    description: Option<String>,
    status: Option<String>,
    #[serde(deserialize_with = "double_option")]
    assigned_to: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    submitted_at: Option<Option<DateTime<Utc>>>,
    note: Option<String>,
}

pub(crate) async fn update(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<UpdateBody>,
) -> Response {
    let kind = match parse_path_kind(&kind) {
        Ok(kind) => kind,
        Err(response) => return response,
    };

    let patch = EntityPatch {
        title: body.title,
        description: body.description,
        status: body.status,
        assigned_to: body.assigned_to,
        submitted_at_us: body
            .submitted_at
            .map(|slot| slot.map(|ts| ts.timestamp_micros())),
        note: body.note,
    };

    let conn = state.db();
    let actor = resolve_actor(&conn, &headers);
    match service::update_entity(&conn, actor.as_ref(), kind, &id, &patch) {
        Ok(Some(outcome)) => data_envelope(&outcome.entity),
        Ok(None) => not_found(ErrorCode::EntityNotFound),
        Err(error) => validation_failure(&error).unwrap_or_else(|| internal_error(&error)),
    }
}

pub(crate) async fn tombstone(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let kind = match parse_path_kind(&kind) {
        Ok(kind) => kind,
        Err(response) => return response,
    };

    let conn = state.db();
    let actor = resolve_actor(&conn, &headers);
    match service::tombstone_entity(&conn, actor.as_ref(), kind, &id) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => not_found(ErrorCode::EntityNotFound),
        Err(error) => internal_error(&error),
    }
}

pub(crate) async fn restore(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let kind = match parse_path_kind(&kind) {
        Ok(kind) => kind,
        Err(response) => return response,
    };

    let conn = state.db();
    let actor = resolve_actor(&conn, &headers);
    match service::restore_entity(&conn, actor.as_ref(), kind, &id) {
        Ok(true) => match service::fetch_entity(&conn, actor.as_ref(), kind, &id) {
            Ok(Some(entity)) => data_envelope(&entity),
            Ok(None) => not_found(ErrorCode::EntityNotFound),
            Err(error) => internal_error(&error),
        },
        Ok(false) => not_found(ErrorCode::EntityNotFound),
        Err(error) => internal_error(&error),
    }
}

pub(crate) async fn purge(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let kind = match parse_path_kind(&kind) {
        Ok(kind) => kind,
        Err(response) => return response,
    };

    let conn = state.db();
    let actor = resolve_actor(&conn, &headers);
    match service::purge_entity(&conn, actor.as_ref(), kind, &id) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => not_found(ErrorCode::EntityNotFound),
        Err(error) => internal_error(&error),
    }
}
