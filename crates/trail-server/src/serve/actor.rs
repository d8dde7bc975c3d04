//! Actor/session resolution.
//!
//! The caller identifies as a user via the `X-Actor-Id` header. An
//! absent header, unknown id, or lookup failure all resolve to `None` —
//! an unauthenticated context that the visibility scope fails closed on.

use axum::http::HeaderMap;
use rusqlite::Connection;
use trail_core::db::users::get_actor;
use trail_core::model::user::Actor;

pub(crate) const ACTOR_HEADER: &str = "x-actor-id";

pub(crate) fn resolve_actor(conn: &Connection, headers: &HeaderMap) -> Option<Actor> {
    let user_id = headers.get(ACTOR_HEADER)?.to_str().ok()?;
    match get_actor(conn, user_id) {
        Ok(actor) => actor,
        Err(error) => {
            tracing::warn!(
                user_id,
                error = %format!("{error:#}"),
                "actor lookup failed; treating request as unauthenticated"
            );
            None
        }
    }
}
