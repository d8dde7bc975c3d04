//! Read-only history queries: filterable, paginated, newest first.

use anyhow::{Context, Result};
use rusqlite::{Connection, Row, params_from_iter};
use std::fmt::Write as _;
use std::str::FromStr;

use super::{ActorDirection, HistoryEntry, HistoryFilter};
use crate::audit::detect::ChangeSet;
use crate::model::entity::EntityKind;
use crate::page::{MAX_PER_PAGE, Page, PageRequest};
use crate::scope::Visibility;

const HISTORY_COLUMNS: &str = "h.history_id, h.entity_kind, h.entity_id, h.assign_by, \
     h.assign_to, h.status, h.status_at_us, h.note, h.changes_json, \
     h.is_deleted, h.deleted_at_us, h.created_at_us";

/// Default ordering: creation time descending, insertion order as the
/// tiebreak so same-microsecond entries still read newest first.
const HISTORY_ORDER: &str = "ORDER BY h.created_at_us DESC, h.rowid DESC";

fn row_to_history(row: &Row<'_>) -> rusqlite::Result<HistoryEntry> {
    let kind_raw: String = row.get(1)?;
    let entity_kind = EntityKind::from_str(&kind_raw).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(error))
    })?;
    let changes_json: String = row.get(8)?;
    let changes: ChangeSet = serde_json::from_str(&changes_json).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(error))
    })?;
    Ok(HistoryEntry {
        id: row.get(0)?,
        entity_kind,
        entity_id: row.get(2)?,
        assign_by: row.get(3)?,
        assign_to: row.get(4)?,
        status: row.get(5)?,
        status_at_us: row.get(6)?,
        note: row.get(7)?,
        changes,
        is_deleted: row.get(9)?,
        deleted_at_us: row.get(10)?,
        created_at_us: row.get(11)?,
    })
}

/// Histories are scoped through their parent entity's creator/assignee,
/// so entity and history visibility can never disagree.
fn push_scope(
    vis: &Visibility,
    conditions: &mut Vec<String>,
    param_values: &mut Vec<Box<dyn rusqlite::types::ToSql>>,
) {
    let marker = conditions.len();
    vis.push_predicate("e.created_by", "e.assigned_to", conditions, param_values);
    if conditions.len() > marker {
        if let Some(inner) = conditions.pop() {
            conditions.push(format!(
                "EXISTS (SELECT 1 FROM entities e \
                 WHERE e.kind = h.entity_kind AND e.entity_id = h.entity_id AND {inner})"
            ));
        }
    }
}

fn push_filter(
    filter: &HistoryFilter,
    conditions: &mut Vec<String>,
    param_values: &mut Vec<Box<dyn rusqlite::types::ToSql>>,
) {
    if !filter.include_deleted {
        conditions.push("h.is_deleted = 0".to_owned());
    }
    if let Some(kind) = filter.entity_kind {
        param_values.push(Box::new(kind.as_str().to_owned()));
        conditions.push(format!("h.entity_kind = ?{}", param_values.len()));
    }
    if let Some(ref entity_id) = filter.entity_id {
        param_values.push(Box::new(entity_id.clone()));
        conditions.push(format!("h.entity_id = ?{}", param_values.len()));
    }
    if let Some(ref assign_by) = filter.assign_by {
        param_values.push(Box::new(assign_by.clone()));
        conditions.push(format!("h.assign_by = ?{}", param_values.len()));
    }
    if let Some(ref assign_to) = filter.assign_to {
        param_values.push(Box::new(assign_to.clone()));
        conditions.push(format!("h.assign_to = ?{}", param_values.len()));
    }
    if let Some(ref status) = filter.status {
        param_values.push(Box::new(status.clone()));
        conditions.push(format!("h.status = ?{}", param_values.len()));
    }
    if let Some(since_us) = filter.since_us {
        param_values.push(Box::new(since_us));
        conditions.push(format!("h.created_at_us >= ?{}", param_values.len()));
    }
    if let Some(until_us) = filter.until_us {
        param_values.push(Box::new(until_us));
        conditions.push(format!("h.created_at_us <= ?{}", param_values.len()));
    }
}

/// List history entries matching the filter under the given scope.
///
/// Default order is creation time descending (most recent first). The
/// total is counted under the same predicate as the page contents.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_histories(
    conn: &Connection,
    vis: &Visibility,
    filter: &HistoryFilter,
    page: PageRequest,
) -> Result<Page<HistoryEntry>> {
    let mut conditions: Vec<String> = Vec::new();
    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    push_filter(filter, &mut conditions, &mut param_values);
    push_scope(vis, &mut conditions, &mut param_values);

    let mut where_clause = String::new();
    if !conditions.is_empty() {
        let _ = write!(where_clause, " WHERE {}", conditions.join(" AND "));
    }

    let params_ref: Vec<&dyn rusqlite::types::ToSql> =
        param_values.iter().map(AsRef::as_ref).collect();

    let count_sql = format!("SELECT COUNT(*) FROM assign_histories h{where_clause}");
    let total: u64 = conn
        .query_row(&count_sql, params_from_iter(params_ref.clone()), |row| {
            row.get::<_, i64>(0)
        })
        .context("count list_histories rows")?
        .try_into()
        .context("negative row count")?;

    let sql = format!(
        "SELECT {HISTORY_COLUMNS} FROM assign_histories h{where_clause} \
         {HISTORY_ORDER} LIMIT {} OFFSET {}",
        page.per_page(),
        page.offset()
    );

    let mut stmt = conn
        .prepare(&sql)
        .with_context(|| format!("prepare list_histories query: {sql}"))?;
    let rows = stmt
        .query_map(params_from_iter(params_ref), row_to_history)
        .context("execute list_histories query")?;

    let mut data = Vec::new();
    for row in rows {
        data.push(row.context("read list_histories row")?);
    }

    Ok(Page {
        data,
        total,
        page: page.page(),
        per_page: page.per_page(),
    })
}

/// Fetch a single history entry by id, subject to visibility scoping.
///
/// Returns `None` for absent, tombstoned (unless `include_deleted`), or
/// out-of-scope entries alike.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_history(
    conn: &Connection,
    vis: &Visibility,
    history_id: &str,
    include_deleted: bool,
) -> Result<Option<HistoryEntry>> {
    let mut conditions: Vec<String> = Vec::new();
    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    param_values.push(Box::new(history_id.to_owned()));
    conditions.push(format!("h.history_id = ?{}", param_values.len()));
    if !include_deleted {
        conditions.push("h.is_deleted = 0".to_owned());
    }
    push_scope(vis, &mut conditions, &mut param_values);

    let sql = format!(
        "SELECT {HISTORY_COLUMNS} FROM assign_histories h WHERE {}",
        conditions.join(" AND ")
    );

    let mut stmt = conn.prepare(&sql).context("prepare get_history query")?;
    let params_ref: Vec<&dyn rusqlite::types::ToSql> =
        param_values.iter().map(AsRef::as_ref).collect();

    let result = stmt.query_row(params_from_iter(params_ref), row_to_history);
    match result {
        Ok(entry) => Ok(Some(entry)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context(format!("get_history for '{history_id}'")),
    }
}

/// The `limit` most recent entries across all entities, same ordering
/// rule as every other read. `limit` is clamped, not rejected.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn recent_histories(
    conn: &Connection,
    vis: &Visibility,
    limit: u32,
) -> Result<Vec<HistoryEntry>> {
    let page = list_histories(
        conn,
        vis,
        &HistoryFilter::default(),
        PageRequest::new(1, limit.clamp(1, MAX_PER_PAGE)),
    )?;
    Ok(page.data)
}

/// Histories scoped to one parent entity, newest first.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn histories_for_entity(
    conn: &Connection,
    vis: &Visibility,
    kind: EntityKind,
    entity_id: &str,
    page: PageRequest,
) -> Result<Page<HistoryEntry>> {
    let filter = HistoryFilter {
        entity_kind: Some(kind),
        entity_id: Some(entity_id.to_owned()),
        ..HistoryFilter::default()
    };
    list_histories(conn, vis, &filter, page)
}

/// Histories scoped to one actor, on either side of the assignment.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn histories_by_actor(
    conn: &Connection,
    vis: &Visibility,
    user_id: &str,
    direction: ActorDirection,
    page: PageRequest,
) -> Result<Page<HistoryEntry>> {
    let filter = match direction {
        ActorDirection::AssignedBy => HistoryFilter {
            assign_by: Some(user_id.to_owned()),
            ..HistoryFilter::default()
        },
        ActorDirection::AssignedTo => HistoryFilter {
            assign_to: Some(user_id.to_owned()),
            ..HistoryFilter::default()
        },
    };
    list_histories(conn, vis, &filter, page)
}
