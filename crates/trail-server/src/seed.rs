//! Demo data for local development: a handful of users, one entity of
//! each kind, and a few updates so the history endpoints have content.

use anyhow::Result;
use rusqlite::Connection;
use trail_core::db::users::{grant_role, insert_user};
use trail_core::model::entity::{EntityKind, EntityPatch};
use trail_core::model::user::{Actor, SUPER_ROLE};
use trail_core::service::{self, NewEntity};

/// Populate the store with demo users, entities, and history entries.
///
/// Not idempotent: running it twice fails on the duplicate user ids.
///
/// # Errors
///
/// Returns an error if any insert or update fails.
pub fn run(conn: &Connection) -> Result<()> {
    insert_user(conn, "us-admin", "Admin")?;
    grant_role(conn, "us-admin", SUPER_ROLE)?;
    insert_user(conn, "us-alice", "Alice")?;
    grant_role(conn, "us-alice", "sales")?;
    insert_user(conn, "us-bob", "Bob")?;
    grant_role(conn, "us-bob", "planning")?;

    let alice = Actor {
        id: "us-alice".to_owned(),
        name: "Alice".to_owned(),
        roles: vec!["sales".to_owned()],
    };
    let bob = Actor {
        id: "us-bob".to_owned(),
        name: "Bob".to_owned(),
        roles: vec!["planning".to_owned()],
    };

    let brief = service::create_entity(
        conn,
        &alice,
        NewEntity {
            kind: EntityKind::Brief,
            title: "Spring campaign brief".to_owned(),
            description: Some("Creative brief for the spring launch.".to_owned()),
            status: "draft".to_owned(),
            assigned_to: None,
            submitted_at_us: None,
        },
    )?;
    let lead = service::create_entity(
        conn,
        &alice,
        NewEntity {
            kind: EntityKind::Lead,
            title: "Acme Corp inbound".to_owned(),
            description: None,
            status: "new".to_owned(),
            assigned_to: Some("us-bob".to_owned()),
            submitted_at_us: None,
        },
    )?;
    let planner = service::create_entity(
        conn,
        &bob,
        NewEntity {
            kind: EntityKind::Planner,
            title: "Q2 media plan".to_owned(),
            description: None,
            status: "open".to_owned(),
            assigned_to: None,
            submitted_at_us: None,
        },
    )?;

    // A few tracked-field updates so the history endpoints have entries.
    service::update_entity(
        conn,
        Some(&alice),
        EntityKind::Brief,
        &brief.id,
        &EntityPatch {
            assigned_to: Some(Some("us-bob".to_owned())),
            status: Some("in_review".to_owned()),
            note: Some("handing over for planning review".to_owned()),
            ..EntityPatch::default()
        },
    )?;
    service::update_entity(
        conn,
        Some(&bob),
        EntityKind::Lead,
        &lead.id,
        &EntityPatch {
            status: Some("qualified".to_owned()),
            ..EntityPatch::default()
        },
    )?;
    service::update_entity(
        conn,
        Some(&bob),
        EntityKind::Planner,
        &planner.id,
        &EntityPatch {
            assigned_to: Some(Some("us-alice".to_owned())),
            ..EntityPatch::default()
        },
    )?;

    Ok(())
}
