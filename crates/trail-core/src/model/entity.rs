use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::audit::tracked::{FieldMap, FieldValue, TrackedField, tracked_fields};

/// The three workflow entity kinds sharing the audit-trail subsystem.
///
/// A closed enum by design: polymorphic references are always
/// `(kind, id)` pairs, never dynamically-built type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Brief,
    Lead,
    Planner,
}

impl EntityKind {
    pub const ALL: [Self; 3] = [Self::Brief, Self::Lead, Self::Planner];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Brief => "brief",
            Self::Lead => "lead",
            Self::Planner => "planner",
        }
    }

    /// Id prefix for records of this kind (`br-...`, `ld-...`, `pl-...`).
    #[must_use]
    pub const fn id_prefix(self) -> &'static str {
        match self {
            Self::Brief => "br",
            Self::Lead => "ld",
            Self::Planner => "pl",
        }
    }

    /// Plural route segment (`briefs`, `leads`, `planners`).
    #[must_use]
    pub const fn plural(self) -> &'static str {
        match self {
            Self::Brief => "briefs",
            Self::Lead => "leads",
            Self::Planner => "planners",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown entity kind string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown entity kind '{0}': expected one of brief, lead, planner")]
pub struct UnknownKind(pub String);

impl FromStr for EntityKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "brief" | "briefs" => Ok(Self::Brief),
            "lead" | "leads" => Ok(Self::Lead),
            "planner" | "planners" => Ok(Self::Planner),
            other => Err(UnknownKind(other.to_owned())),
        }
    }
}

/// A workflow entity row: the current state of one brief, lead, or planner.
///
/// `created_by` is immutable after creation; `assigned_to` is the
/// zero-or-one current assignee. History entries reference the entity by
/// `(kind, id)` and outlive its soft deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowEntity {
    pub id: String,
    pub kind: EntityKind,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub created_by: String,
    pub assigned_to: Option<String>,
    pub submitted_at_us: Option<i64>,
    pub is_deleted: bool,
    pub deleted_at_us: Option<i64>,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

impl WorkflowEntity {
    /// Snapshot of this entity's tracked fields, keyed by field name.
    ///
    /// Only fields in the kind's allowlist appear; everything else is
    /// invisible to the audit subsystem.
    #[must_use]
    pub fn tracked_snapshot(&self) -> FieldMap {
        let mut snapshot = FieldMap::new();
        for field in tracked_fields(self.kind) {
            let value = match field {
                TrackedField::Assignee => self
                    .assigned_to
                    .clone()
                    .map_or(FieldValue::Null, FieldValue::Text),
                TrackedField::Status => FieldValue::Text(self.status.clone()),
                TrackedField::SubmittedAt => self
                    .submitted_at_us
                    .map_or(FieldValue::Null, FieldValue::Timestamp),
            };
            snapshot.insert(*field, value);
        }
        snapshot
    }
}

/// A partial update to a workflow entity.
///
/// `None` leaves a field untouched. Nullable fields use a nested option:
/// `Some(None)` clears, `Some(Some(v))` sets.
#[derive(Debug, Clone, Default)]
pub struct EntityPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub assigned_to: Option<Option<String>>,
    pub submitted_at_us: Option<Option<i64>>,
    /// Free-text note carried into the history entry, never stored on the
    /// entity itself.
    pub note: Option<String>,
}

impl EntityPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.assigned_to.is_none()
            && self.submitted_at_us.is_none()
    }
}

/// Field-level validation failure for entity writes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("status must not be empty")]
    EmptyStatus,
    #[error("unknown user '{0}'")]
    UnknownAssignee(String),
}

impl ValidationError {
    /// The offending field name, for field-level API error messages.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyTitle => "title",
            Self::EmptyStatus => "status",
            Self::UnknownAssignee(_) => "assigned_to",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EntityKind, EntityPatch, WorkflowEntity};
    use crate::audit::tracked::{FieldValue, TrackedField};
    use std::str::FromStr;

    fn brief() -> WorkflowEntity {
        WorkflowEntity {
            id: "br-0000000001".into(),
            kind: EntityKind::Brief,
            title: "Spring campaign".into(),
            description: None,
            status: "draft".into(),
            created_by: "us-creator".into(),
            assigned_to: Some("us-worker".into()),
            submitted_at_us: None,
            is_deleted: false,
            deleted_at_us: None,
            created_at_us: 1,
            updated_at_us: 1,
        }
    }

    #[test]
    fn kind_round_trips_through_str() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_str(kind.as_str()), Ok(kind));
            assert_eq!(EntityKind::from_str(kind.plural()), Ok(kind));
        }
        assert!(EntityKind::from_str("campaign").is_err());
    }

    #[test]
    fn snapshot_covers_only_tracked_fields() {
        let entity = brief();
        let snapshot = entity.tracked_snapshot();
        assert_eq!(
            snapshot.get(&TrackedField::Assignee),
            Some(&FieldValue::Text("us-worker".into()))
        );
        assert_eq!(
            snapshot.get(&TrackedField::Status),
            Some(&FieldValue::Text("draft".into()))
        );
        assert_eq!(
            snapshot.get(&TrackedField::SubmittedAt),
            Some(&FieldValue::Null)
        );
        assert_eq!(snapshot.len(), 3);
    }

    #[test]
    fn lead_snapshot_has_no_submitted_at() {
        let mut entity = brief();
        entity.kind = EntityKind::Lead;
        let snapshot = entity.tracked_snapshot();
        assert!(!snapshot.contains_key(&TrackedField::SubmittedAt));
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn note_only_patch_counts_as_empty() {
        let patch = EntityPatch {
            note: Some("just a remark".into()),
            ..EntityPatch::default()
        };
        assert!(patch.is_empty());
    }
}
