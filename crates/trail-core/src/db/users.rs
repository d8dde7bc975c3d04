//! User and role lookup backing actor/session resolution.

use anyhow::{Context, Result};
use rusqlite::{Connection, params};

use crate::clock::now_us;
use crate::model::user::Actor;

/// Insert a user. Fails if the id already exists.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_user(conn: &Connection, user_id: &str, name: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO users (user_id, name, created_at_us) VALUES (?1, ?2, ?3)",
        params![user_id, name, now_us()],
    )
    .with_context(|| format!("insert user '{user_id}'"))?;
    Ok(())
}

/// Grant a role to a user. Granting an already-held role is a no-op.
///
/// # Errors
///
/// Returns an error if the insert fails (e.g. unknown user).
pub fn grant_role(conn: &Connection, user_id: &str, role: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO user_roles (user_id, role) VALUES (?1, ?2)",
        params![user_id, role],
    )
    .with_context(|| format!("grant role '{role}' to '{user_id}'"))?;
    Ok(())
}

/// Whether a user row exists for this id.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn user_exists(conn: &Connection, user_id: &str) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM users WHERE user_id = ?1)",
        params![user_id],
        |row| row.get(0),
    )
    .with_context(|| format!("check user '{user_id}' exists"))
}

/// Resolve a user id to an [`Actor`] with their roles.
///
/// Returns `None` for an unknown id — the caller treats that as an
/// unauthenticated context.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_actor(conn: &Connection, user_id: &str) -> Result<Option<Actor>> {
    let mut stmt = conn
        .prepare("SELECT user_id, name FROM users WHERE user_id = ?1")
        .context("prepare get_actor query")?;

    let row = stmt.query_row(params![user_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    });

    let (id, name) = match row {
        Ok(pair) => pair,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(e).context(format!("get_actor for '{user_id}'")),
    };

    let mut stmt = conn
        .prepare("SELECT role FROM user_roles WHERE user_id = ?1 ORDER BY role")
        .context("prepare roles query")?;
    let rows = stmt
        .query_map(params![user_id], |row| row.get::<_, String>(0))
        .context("execute roles query")?;

    let mut roles = Vec::new();
    for role in rows {
        roles.push(role.context("read role row")?);
    }

    Ok(Some(Actor { id, name, roles }))
}
