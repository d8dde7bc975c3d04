//! End-to-end tests driving the router in-process with `tower::oneshot`.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use rusqlite::Connection;
use tower::ServiceExt;
use trail_core::db::migrations;
use trail_core::db::users::{grant_role, insert_user};
use trail_core::model::user::SUPER_ROLE;
use trail_server::serve::{self, AppState};

fn test_app() -> Router {
    let mut conn = Connection::open_in_memory().expect("open in-memory db");
    migrations::migrate(&mut conn).expect("migrate schema");
    insert_user(&conn, "us-root", "Root").expect("insert root");
    grant_role(&conn, "us-root", SUPER_ROLE).expect("grant super");
    insert_user(&conn, "us-alice", "Alice").expect("insert alice");
    insert_user(&conn, "us-bob", "Bob").expect("insert bob");
    serve::router(Arc::new(AppState::new(conn, 15, 100)))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    actor: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder.header("x-actor-id", actor);
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("build request");

    let response = app.clone().oneshot(request).await.expect("send request");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("parse body as JSON")
    };
    (status, json)
}

async fn create_brief(app: &Router, actor: &str, title: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/briefs",
        Some(actor),
        Some(serde_json::json!({ "title": title, "status": "draft" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create brief: {body}");
    body["data"]["id"]
        .as_str()
        .expect("created entity id")
        .to_owned()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = test_app();
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn unauthenticated_create_is_401_and_list_is_empty() {
    let app = test_app();
    create_brief(&app, "us-alice", "Visible to Alice only").await;

    let (status, body) = send(
        &app,
        "POST",
        "/briefs",
        None,
        Some(serde_json::json!({ "title": "x", "status": "draft" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "E2005");

    // Reads fail closed: no actor means zero rows, not an error.
    let (status, body) = send(&app, "GET", "/briefs", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["pagination"]["total"], 0);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn scope_separates_ordinary_actors_but_not_super() {
    let app = test_app();
    create_brief(&app, "us-alice", "Alice's brief").await;
    create_brief(&app, "us-bob", "Bob's brief").await;

    let (_, body) = send(&app, "GET", "/briefs", Some("us-alice"), None).await;
    assert_eq!(body["meta"]["pagination"]["total"], 1);

    let (_, body) = send(&app, "GET", "/briefs", Some("us-root"), None).await;
    assert_eq!(body["meta"]["pagination"]["total"], 2);
}

#[tokio::test]
async fn patch_produces_one_history_entry() {
    let app = test_app();
    let id = create_brief(&app, "us-alice", "Needs an assignee").await;

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/briefs/{id}"),
        Some("us-alice"),
        Some(serde_json::json!({ "assigned_to": "us-bob", "note": "please review" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "patch: {body}");
    assert_eq!(body["data"]["assigned_to"], "us-bob");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/briefs/{id}/assign-histories"),
        Some("us-alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["pagination"]["total"], 1);
    let entry = &body["data"][0];
    assert_eq!(entry["assign_by"], "us-alice");
    assert_eq!(entry["assign_to"], "us-bob");
    assert_eq!(entry["note"], "please review");
    assert_eq!(entry["changes"]["assignee"]["new"], "us-bob");
}

#[tokio::test]
async fn title_only_patch_records_no_history() {
    let app = test_app();
    let id = create_brief(&app, "us-alice", "Old title").await;

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/briefs/{id}"),
        Some("us-alice"),
        Some(serde_json::json!({ "title": "New title" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(
        &app,
        "GET",
        &format!("/briefs/{id}/assign-histories"),
        Some("us-alice"),
        None,
    )
    .await;
    assert_eq!(body["meta"]["pagination"]["total"], 0);
}

#[tokio::test]
async fn assigning_an_unknown_user_answers_422_not_500() {
    let app = test_app();
    let id = create_brief(&app, "us-alice", "Needs a real assignee").await;

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/briefs/{id}"),
        Some("us-alice"),
        Some(serde_json::json!({ "assigned_to": "us-ghost" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "patch: {body}");
    assert_eq!(body["code"], "E2004");
    assert!(body["fields"]["assigned_to"].is_string());

    // The entity is untouched and no history entry was written.
    let (_, body) = send(&app, "GET", &format!("/briefs/{id}"), Some("us-alice"), None).await;
    assert!(body["data"]["assigned_to"].is_null());
    let (_, body) = send(
        &app,
        "GET",
        &format!("/briefs/{id}/assign-histories"),
        Some("us-alice"),
        None,
    )
    .await;
    assert_eq!(body["meta"]["pagination"]["total"], 0);

    // Create validates the assignee the same way.
    let (status, body) = send(
        &app,
        "POST",
        "/briefs",
        Some("us-alice"),
        Some(serde_json::json!({
            "title": "x",
            "status": "draft",
            "assigned_to": "us-ghost"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["fields"]["assigned_to"].is_string());
}

#[tokio::test]
async fn bad_query_params_answer_422_with_field_messages() {
    let app = test_app();
    let (status, body) = send(
        &app,
        "GET",
        "/assign-histories?per_page=abc&since=yesterday",
        Some("us-root"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "E2004");
    assert!(body["fields"]["per_page"].is_string());
    assert!(body["fields"]["since"].is_string());
}

#[tokio::test]
async fn unknown_kind_is_a_404_with_its_own_code() {
    let app = test_app();
    let (status, body) = send(&app, "GET", "/campaigns", Some("us-root"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "E2003");
}

#[tokio::test]
async fn history_detail_is_invisible_outside_the_parent_scope() {
    let app = test_app();
    let id = create_brief(&app, "us-alice", "Private").await;
    send(
        &app,
        "PATCH",
        &format!("/briefs/{id}"),
        Some("us-alice"),
        Some(serde_json::json!({ "status": "in_review" })),
    )
    .await;

    let (_, body) = send(
        &app,
        "GET",
        &format!("/briefs/{id}/assign-histories"),
        Some("us-alice"),
        None,
    )
    .await;
    let history_id = body["data"][0]["id"].as_str().expect("history id").to_owned();

    let (status, _) = send(
        &app,
        "GET",
        &format!("/assign-histories/{history_id}"),
        Some("us-alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Bob is neither creator nor assignee of the parent entity.
    let (status, body) = send(
        &app,
        "GET",
        &format!("/assign-histories/{history_id}"),
        Some("us-bob"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "E2002");
}

#[tokio::test]
async fn history_lifecycle_enforces_its_transitions() {
    let app = test_app();
    let id = create_brief(&app, "us-alice", "Lifecycle target").await;
    send(
        &app,
        "PATCH",
        &format!("/briefs/{id}"),
        Some("us-alice"),
        Some(serde_json::json!({ "assigned_to": "us-bob" })),
    )
    .await;
    let (_, body) = send(
        &app,
        "GET",
        &format!("/briefs/{id}/assign-histories"),
        Some("us-alice"),
        None,
    )
    .await;
    let history_id = body["data"][0]["id"].as_str().expect("history id").to_owned();
    let detail = format!("/assign-histories/{history_id}");

    // Purging an active entry is a conflict, not a delete.
    let (status, _) = send(&app, "DELETE", &format!("{detail}/force"), Some("us-root"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, "DELETE", &detail, Some("us-root"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", &detail, Some("us-root"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Tombstoned entries disappear from default reads.
    let (status, _) = send(&app, "GET", &detail, Some("us-root"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "POST", &format!("{detail}/restore"), Some("us-root"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_deleted"], false);

    let (status, _) = send(&app, "DELETE", &detail, Some("us-root"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", &format!("{detail}/force"), Some("us-root"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &detail, Some("us-root"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn entity_tombstone_hides_it_but_not_its_histories() {
    let app = test_app();
    let id = create_brief(&app, "us-alice", "To be tombstoned").await;
    send(
        &app,
        "PATCH",
        &format!("/briefs/{id}"),
        Some("us-alice"),
        Some(serde_json::json!({ "status": "in_review" })),
    )
    .await;

    let (status, _) = send(&app, "DELETE", &format!("/briefs/{id}"), Some("us-alice"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &format!("/briefs/{id}"), Some("us-alice"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The audit trail outlives the parent's soft deletion.
    let (_, body) = send(
        &app,
        "GET",
        &format!("/briefs/{id}/assign-histories"),
        Some("us-alice"),
        None,
    )
    .await;
    assert_eq!(body["meta"]["pagination"]["total"], 1);

    let (status, body) = send(&app, "POST", &format!("/briefs/{id}/restore"), Some("us-alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_deleted"], false);
}

#[tokio::test]
async fn by_actor_read_covers_both_directions() {
    let app = test_app();
    let id = create_brief(&app, "us-alice", "Directional").await;
    send(
        &app,
        "PATCH",
        &format!("/briefs/{id}"),
        Some("us-alice"),
        Some(serde_json::json!({ "assigned_to": "us-bob" })),
    )
    .await;

    let (_, body) = send(
        &app,
        "GET",
        "/users/us-alice/assigned-histories?direction=by",
        Some("us-root"),
        None,
    )
    .await;
    assert_eq!(body["meta"]["pagination"]["total"], 1);

    let (_, body) = send(
        &app,
        "GET",
        "/users/us-bob/assigned-histories?direction=to",
        Some("us-root"),
        None,
    )
    .await;
    assert_eq!(body["meta"]["pagination"]["total"], 1);

    let (_, body) = send(
        &app,
        "GET",
        "/assign-histories?assign_to_id=us-bob",
        Some("us-root"),
        None,
    )
    .await;
    assert_eq!(body["meta"]["pagination"]["total"], 1);

    let (status, body) = send(
        &app,
        "GET",
        "/users/us-bob/assigned-histories?direction=sideways",
        Some("us-root"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["fields"]["direction"].is_string());
}
