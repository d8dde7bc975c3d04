//! History entries: the immutable audit trail of workflow entities.
//!
//! Entries are write-once facts. Nothing in this module or its children
//! ever rewrites a row's diff; the only mutations are the tombstone
//! lifecycle transitions in [`lifecycle`], used for administrative
//! cleanup and never by the automatic writer.

pub mod lifecycle;
pub mod query;

use serde::Serialize;

use crate::audit::detect::ChangeSet;
use crate::model::entity::EntityKind;

/// Id prefix for history entries.
pub const HISTORY_ID_PREFIX: &str = "ah";

/// An immutable audit record: "at time T, actor `assign_by` changed
/// entity `(entity_kind, entity_id)`'s tracked fields".
///
/// `assign_to`, `status`, and `status_at_us` snapshot the *new* values of
/// the corresponding tracked fields when they changed; `changes` carries
/// the full old/new diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub id: String,
    pub entity_kind: EntityKind,
    pub entity_id: String,
    pub assign_by: String,
    pub assign_to: Option<String>,
    pub status: Option<String>,
    pub status_at_us: Option<i64>,
    pub note: Option<String>,
    pub changes: ChangeSet,
    pub is_deleted: bool,
    pub deleted_at_us: Option<i64>,
    pub created_at_us: i64,
}

/// Which side of an assignment a per-actor history query matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorDirection {
    /// Entries recorded by the actor (`assign_by`).
    AssignedBy,
    /// Entries whose new-assignee snapshot is the actor (`assign_to`).
    AssignedTo,
}

/// Filter criteria for history listings.
///
/// All fields are optional; set fields combine with AND semantics.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub entity_kind: Option<EntityKind>,
    /// Owning entity id (exact match).
    pub entity_id: Option<String>,
    /// Acting actor id (exact match).
    pub assign_by: Option<String>,
    /// New-assignee snapshot (exact match).
    pub assign_to: Option<String>,
    /// Recorded status snapshot (exact match).
    pub status: Option<String>,
    /// Creation-time lower bound (inclusive, microseconds).
    pub since_us: Option<i64>,
    /// Creation-time upper bound (inclusive, microseconds).
    pub until_us: Option<i64>,
    /// Include tombstoned entries (default: false).
    pub include_deleted: bool,
}
