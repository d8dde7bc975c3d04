//! Pure before/after diff over tracked fields.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::tracked::{FieldMap, FieldValue, TrackedField};

/// Old and new value for one changed tracked field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: FieldValue,
    pub new: FieldValue,
}

/// The tracked fields that differ between two snapshots of one entity.
pub type ChangeSet = BTreeMap<TrackedField, FieldChange>;

/// Compute which tracked fields differ between `original` and `current`.
///
/// Both snapshots must describe the same entity instance before and after
/// a single update. A field absent from a snapshot compares as `Null`.
/// Returns an empty set when nothing tracked differs — the common case,
/// which must trigger no downstream write. Pure; no side effects.
#[must_use]
pub fn detect_changes(
    original: &FieldMap,
    current: &FieldMap,
    tracked: &[TrackedField],
) -> ChangeSet {
    let mut changes = ChangeSet::new();
    for field in tracked {
        let old = original.get(field).cloned().unwrap_or(FieldValue::Null);
        let new = current.get(field).cloned().unwrap_or(FieldValue::Null);
        if old != new {
            changes.insert(*field, FieldChange { old, new });
        }
    }
    changes
}
