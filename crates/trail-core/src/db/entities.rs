//! Workflow entity reads and writes.
//!
//! All read paths take a [`Visibility`] and push its predicate into the
//! WHERE clause; callers never see rows the actor is not entitled to.

use anyhow::{Context, Result};
use rusqlite::{Connection, Row, params, params_from_iter};
use std::fmt::Write as _;
use std::str::FromStr;

use crate::clock::now_us;
use crate::model::entity::{EntityKind, WorkflowEntity};
use crate::page::{Page, PageRequest};
use crate::scope::Visibility;

const ENTITY_COLUMNS: &str = "entity_id, kind, title, description, status, created_by, \
     assigned_to, submitted_at_us, is_deleted, deleted_at_us, created_at_us, updated_at_us";

/// Filter criteria for entity listings. Set fields combine with AND.
#[derive(Debug, Clone, Default)]
pub struct EntityFilter {
    pub kind: Option<EntityKind>,
    pub status: Option<String>,
    pub created_by: Option<String>,
    pub assigned_to: Option<String>,
    /// Include tombstoned entities (default: false).
    pub include_deleted: bool,
}

fn row_to_entity(row: &Row<'_>) -> rusqlite::Result<WorkflowEntity> {
    let kind_raw: String = row.get(1)?;
    let kind = EntityKind::from_str(&kind_raw).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(error))
    })?;
    Ok(WorkflowEntity {
        id: row.get(0)?,
        kind,
        title: row.get(2)?,
        description: row.get(3)?,
        status: row.get(4)?,
        created_by: row.get(5)?,
        assigned_to: row.get(6)?,
        submitted_at_us: row.get(7)?,
        is_deleted: row.get(8)?,
        deleted_at_us: row.get(9)?,
        created_at_us: row.get(10)?,
        updated_at_us: row.get(11)?,
    })
}

/// Insert a freshly-created entity row.
///
/// # Errors
///
/// Returns an error if the insert fails (e.g. constraint violation).
pub fn insert_entity(conn: &Connection, entity: &WorkflowEntity) -> Result<()> {
    conn.execute(
        "INSERT INTO entities (
            entity_id, kind, title, description, status, created_by,
            assigned_to, submitted_at_us, is_deleted, deleted_at_us,
            created_at_us, updated_at_us
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            entity.id,
            entity.kind.as_str(),
            entity.title,
            entity.description,
            entity.status,
            entity.created_by,
            entity.assigned_to,
            entity.submitted_at_us,
            i64::from(entity.is_deleted),
            entity.deleted_at_us,
            entity.created_at_us,
            entity.updated_at_us,
        ],
    )
    .with_context(|| format!("insert {} '{}'", entity.kind, entity.id))?;
    Ok(())
}

/// Fetch a single entity by kind and id, subject to visibility scoping.
///
/// Returns `None` when the row does not exist, is tombstoned (unless
/// `include_deleted`), or falls outside the actor's scope — the three
/// cases are indistinguishable to the caller by design.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_entity(
    conn: &Connection,
    vis: &Visibility,
    kind: EntityKind,
    entity_id: &str,
    include_deleted: bool,
) -> Result<Option<WorkflowEntity>> {
    let mut conditions: Vec<String> = Vec::new();
    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    param_values.push(Box::new(entity_id.to_owned()));
    conditions.push(format!("entity_id = ?{}", param_values.len()));
    param_values.push(Box::new(kind.as_str().to_owned()));
    conditions.push(format!("kind = ?{}", param_values.len()));
    if !include_deleted {
        conditions.push("is_deleted = 0".to_owned());
    }
    vis.push_predicate("created_by", "assigned_to", &mut conditions, &mut param_values);

    let sql = format!(
        "SELECT {ENTITY_COLUMNS} FROM entities WHERE {}",
        conditions.join(" AND ")
    );

    let mut stmt = conn.prepare(&sql).context("prepare get_entity query")?;
    let params_ref: Vec<&dyn rusqlite::types::ToSql> =
        param_values.iter().map(AsRef::as_ref).collect();

    let result = stmt.query_row(params_from_iter(params_ref), row_to_entity);
    match result {
        Ok(entity) => Ok(Some(entity)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context(format!("get_entity for '{entity_id}'")),
    }
}

/// List entities matching the filter under the given scope, newest update
/// first, with a total count computed under the same predicate.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_entities(
    conn: &Connection,
    vis: &Visibility,
    filter: &EntityFilter,
    page: PageRequest,
) -> Result<Page<WorkflowEntity>> {
    let mut conditions: Vec<String> = Vec::new();
    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if !filter.include_deleted {
        conditions.push("is_deleted = 0".to_owned());
    }
    if let Some(kind) = filter.kind {
        param_values.push(Box::new(kind.as_str().to_owned()));
        conditions.push(format!("kind = ?{}", param_values.len()));
    }
    if let Some(ref status) = filter.status {
        param_values.push(Box::new(status.clone()));
        conditions.push(format!("status = ?{}", param_values.len()));
    }
    if let Some(ref created_by) = filter.created_by {
        param_values.push(Box::new(created_by.clone()));
        conditions.push(format!("created_by = ?{}", param_values.len()));
    }
    if let Some(ref assigned_to) = filter.assigned_to {
        param_values.push(Box::new(assigned_to.clone()));
        conditions.push(format!("assigned_to = ?{}", param_values.len()));
    }
    vis.push_predicate("created_by", "assigned_to", &mut conditions, &mut param_values);

    let mut where_clause = String::new();
    if !conditions.is_empty() {
        let _ = write!(where_clause, " WHERE {}", conditions.join(" AND "));
    }

    let params_ref: Vec<&dyn rusqlite::types::ToSql> =
        param_values.iter().map(AsRef::as_ref).collect();

    let count_sql = format!("SELECT COUNT(*) FROM entities{where_clause}");
    let total: u64 = conn
        .query_row(&count_sql, params_from_iter(params_ref.clone()), |row| {
            row.get::<_, i64>(0)
        })
        .context("count list_entities rows")?
        .try_into()
        .context("negative row count")?;

    let sql = format!(
        "SELECT {ENTITY_COLUMNS} FROM entities{where_clause} \
         ORDER BY updated_at_us DESC, entity_id ASC \
         LIMIT {} OFFSET {}",
        page.per_page(),
        page.offset()
    );

    let mut stmt = conn
        .prepare(&sql)
        .with_context(|| format!("prepare list_entities query: {sql}"))?;
    let rows = stmt
        .query_map(params_from_iter(params_ref), row_to_entity)
        .context("execute list_entities query")?;

    let mut data = Vec::new();
    for row in rows {
        data.push(row.context("read list_entities row")?);
    }

    Ok(Page {
        data,
        total,
        page: page.page(),
        per_page: page.per_page(),
    })
}

/// Persist the mutable fields of an updated entity. One UPDATE statement;
/// under autocommit this is the durable commit the audit hook runs after.
///
/// Returns false when no row matched.
///
/// # Errors
///
/// Returns an error if the update fails (e.g. constraint violation).
pub fn update_entity_row(conn: &Connection, entity: &WorkflowEntity) -> Result<bool> {
    let affected = conn
        .execute(
            "UPDATE entities SET
                title = ?1, description = ?2, status = ?3, assigned_to = ?4,
                submitted_at_us = ?5, updated_at_us = ?6
             WHERE entity_id = ?7 AND kind = ?8",
            params![
                entity.title,
                entity.description,
                entity.status,
                entity.assigned_to,
                entity.submitted_at_us,
                entity.updated_at_us,
                entity.id,
                entity.kind.as_str(),
            ],
        )
        .with_context(|| format!("update {} '{}'", entity.kind, entity.id))?;
    Ok(affected > 0)
}

/// Tombstone an active entity. Returns false when no active row matched.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn tombstone_entity(conn: &Connection, kind: EntityKind, entity_id: &str) -> Result<bool> {
    let now = now_us();
    let affected = conn
        .execute(
            "UPDATE entities SET is_deleted = 1, deleted_at_us = ?1, updated_at_us = ?1
             WHERE entity_id = ?2 AND kind = ?3 AND is_deleted = 0",
            params![now, entity_id, kind.as_str()],
        )
        .with_context(|| format!("tombstone {kind} '{entity_id}'"))?;
    Ok(affected > 0)
}

/// Restore a tombstoned entity. Returns false when no tombstoned row matched.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn restore_entity(conn: &Connection, kind: EntityKind, entity_id: &str) -> Result<bool> {
    let affected = conn
        .execute(
            "UPDATE entities SET is_deleted = 0, deleted_at_us = NULL, updated_at_us = ?1
             WHERE entity_id = ?2 AND kind = ?3 AND is_deleted = 1",
            params![now_us(), entity_id, kind.as_str()],
        )
        .with_context(|| format!("restore {kind} '{entity_id}'"))?;
    Ok(affected > 0)
}

/// Permanently purge a tombstoned entity. The irreversible transition:
/// only tombstoned rows can be purged. History entries are left in place.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn purge_entity(conn: &Connection, kind: EntityKind, entity_id: &str) -> Result<bool> {
    let affected = conn
        .execute(
            "DELETE FROM entities WHERE entity_id = ?1 AND kind = ?2 AND is_deleted = 1",
            params![entity_id, kind.as_str()],
        )
        .with_context(|| format!("purge {kind} '{entity_id}'"))?;
    Ok(affected > 0)
}
