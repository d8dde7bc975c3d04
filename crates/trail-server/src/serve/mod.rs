//! HTTP JSON API for the trail backend.
//!
//! Endpoints:
//! - `GET    /health`                                  - server status
//! - `GET    /assign-histories`                        - filtered history list
//! - `GET    /assign-histories/{id}`                   - single history entry
//! - `DELETE /assign-histories/{id}`                   - tombstone entry
//! - `POST   /assign-histories/{id}/restore`           - restore entry
//! - `DELETE /assign-histories/{id}/force`             - purge entry
//! - `GET    /users/{id}/assigned-histories`           - per-actor histories (`?direction=by|to`)
//! - `GET    /{briefs|leads|planners}`                 - scoped entity list
//! - `POST   /{kind}`                                  - create entity
//! - `GET    /{kind}/{id}`                             - single entity
//! - `PATCH  /{kind}/{id}`                             - update entity (audit side effect)
//! - `DELETE /{kind}/{id}` / `.../restore` / `.../force` - entity tombstone lifecycle
//! - `GET    /{kind}/{id}/assign-histories`            - per-entity histories
//!
//! All responses use Content-Type: application/json. List responses use
//! the `{data, meta.pagination}` envelope. Callers identify via the
//! `X-Actor-Id` header; unauthenticated reads fail closed to empty
//! results rather than a distinct "forbidden" error.

mod actor;
mod entities;
mod histories;
mod params;
mod state;

pub use state::AppState;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use trail_core::error::ErrorCode;
use trail_core::page::Page;

use self::params::FieldErrors;

/// Construct a JSON error response with the given status and error code.
pub(crate) fn json_error(status: StatusCode, code: ErrorCode, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": message,
            "code": code.code(),
            "hint": code.hint(),
        })),
    )
        .into_response()
}

pub(crate) fn not_found(code: ErrorCode) -> Response {
    json_error(StatusCode::NOT_FOUND, code, code.message())
}

/// 422 with per-field messages, emitted before anything reaches the core.
pub(crate) fn validation_error(errors: FieldErrors) -> Response {
    let fields: serde_json::Map<String, serde_json::Value> = errors
        .into_fields()
        .into_iter()
        .map(|(field, message)| (field.to_owned(), serde_json::Value::String(message)))
        .collect();
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(serde_json::json!({
            "error": ErrorCode::ValidationFailed.message(),
            "code": ErrorCode::ValidationFailed.code(),
            "fields": fields,
        })),
    )
        .into_response()
}

pub(crate) fn internal_error(error: &anyhow::Error) -> Response {
    tracing::error!(error = %format!("{error:#}"), "request failed");
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorCode::InternalUnexpected,
        ErrorCode::InternalUnexpected.message(),
    )
}

/// `{data, meta.pagination}` list envelope.
pub(crate) fn page_envelope<T: Serialize>(page: &Page<T>) -> Response {
    Json(serde_json::json!({
        "data": page.data,
        "meta": {
            "pagination": {
                "total": page.total,
                "count": page.data.len(),
                "per_page": page.per_page,
                "current_page": page.page,
                "total_pages": page.total_pages(),
            }
        }
    }))
    .into_response()
}

pub(crate) fn data_envelope<T: Serialize>(value: &T) -> Response {
    Json(serde_json::json!({ "data": value })).into_response()
}

async fn handle_not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, ErrorCode::EntityNotFound, "not found")
}

async fn handle_health() -> Response {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
    .into_response()
}

/// Build the application router.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/assign-histories", get(histories::list))
        .route(
            "/assign-histories/{id}",
            get(histories::show).delete(histories::tombstone),
        )
        .route("/assign-histories/{id}/restore", post(histories::restore))
        .route("/assign-histories/{id}/force", delete(histories::purge))
        .route("/users/{id}/assigned-histories", get(histories::by_actor))
        .route("/{kind}", get(entities::list).post(entities::create))
        .route(
            "/{kind}/{id}",
            get(entities::show)
                .patch(entities::update)
                .delete(entities::tombstone),
        )
        .route("/{kind}/{id}/restore", post(entities::restore))
        .route("/{kind}/{id}/force", delete(entities::purge))
        .route("/{kind}/{id}/assign-histories", get(histories::for_entity))
        .fallback(handle_not_found)
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process is stopped.
///
/// # Errors
///
/// Returns an error if binding or serving fails.
pub async fn run(bind: &str, state: Arc<AppState>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("bind {bind}"))?;
    tracing::info!(bind, "trail API listening");
    axum::serve(listener, router(state))
        .await
        .context("serve HTTP")
}
