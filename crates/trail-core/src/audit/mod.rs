//! Automatic change tracking for workflow entities.
//!
//! The pipeline is deliberately explicit: the service layer snapshots an
//! entity's tracked fields, applies the update, re-snapshots, and hands
//! both snapshots to [`detect::detect_changes`]. A non-empty diff goes to
//! [`writer::record_change`], which persists one immutable history entry
//! and never lets a persistence failure escape to the primary write path.

pub mod detect;
pub mod tracked;
pub mod writer;
