//! Per-kind allowlist of audited fields and their typed values.

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};

use crate::model::entity::EntityKind;

/// A field whose changes must be audited.
///
/// The set is fixed per entity kind (see [`tracked_fields`]); changes to
/// any other field never reach the audit subsystem, which keeps audit
/// volume bounded and avoids leaking unrelated edits.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TrackedField {
    Assignee,
    Status,
    SubmittedAt,
}

impl TrackedField {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assignee => "assignee",
            Self::Status => "status",
            Self::SubmittedAt => "submitted_at",
        }
    }
}

impl fmt::Display for TrackedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrackedField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "assignee" => Ok(Self::Assignee),
            "status" => Ok(Self::Status),
            "submitted_at" => Ok(Self::SubmittedAt),
            other => anyhow::bail!(
                "unknown tracked field '{other}': expected one of assignee, status, submitted_at"
            ),
        }
    }
}

/// The fixed allowlist of tracked fields for one entity kind.
///
/// Briefs and planners carry a submission date; leads do not.
#[must_use]
pub const fn tracked_fields(kind: EntityKind) -> &'static [TrackedField] {
    match kind {
        EntityKind::Brief | EntityKind::Planner => &[
            TrackedField::Assignee,
            TrackedField::Status,
            TrackedField::SubmittedAt,
        ],
        EntityKind::Lead => &[TrackedField::Assignee, TrackedField::Status],
    }
}

/// A typed tracked-field value. Comparison is value equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Text(String),
    Timestamp(i64),
}

impl FieldValue {
    /// The text payload, if any. `Null` and timestamps yield `None`.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Null | Self::Timestamp(_) => None,
        }
    }

    /// The timestamp payload, if any.
    #[must_use]
    pub const fn as_timestamp(&self) -> Option<i64> {
        match self {
            Self::Timestamp(us) => Some(*us),
            Self::Null | Self::Text(_) => None,
        }
    }
}

/// Snapshot of an entity's tracked fields at one point in time.
pub type FieldMap = BTreeMap<TrackedField, FieldValue>;
