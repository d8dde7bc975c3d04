//! Canonical SQLite schema for the trail store.
//!
//! Normalized for queryability:
//! - `entities` keeps the current state of each brief/lead/planner
//! - `assign_histories` is the append-only audit trail, referencing its
//!   parent by `(entity_kind, entity_id)` with no cascading FK so entries
//!   outlive entity purges
//! - `users` and `user_roles` back actor/role resolution

/// Migration v1: core tables.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS users (
    user_id TEXT PRIMARY KEY,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS user_roles (
    user_id TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    role TEXT NOT NULL CHECK (length(trim(role)) > 0),
    PRIMARY KEY (user_id, role)
);

CREATE TABLE IF NOT EXISTS entities (
    entity_id TEXT PRIMARY KEY,
    kind TEXT NOT NULL CHECK (kind IN ('brief', 'lead', 'planner')),
    title TEXT NOT NULL CHECK (length(trim(title)) > 0),
    description TEXT,
    status TEXT NOT NULL CHECK (length(trim(status)) > 0),
    created_by TEXT NOT NULL REFERENCES users(user_id),
    assigned_to TEXT REFERENCES users(user_id),
    submitted_at_us INTEGER,
    is_deleted INTEGER NOT NULL DEFAULT 0 CHECK (is_deleted IN (0, 1)),
    deleted_at_us INTEGER,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS assign_histories (
    history_id TEXT PRIMARY KEY CHECK (history_id LIKE 'ah-%'),
    entity_kind TEXT NOT NULL CHECK (entity_kind IN ('brief', 'lead', 'planner')),
    entity_id TEXT NOT NULL,
    assign_by TEXT NOT NULL,
    assign_to TEXT,
    status TEXT,
    status_at_us INTEGER,
    note TEXT,
    changes_json TEXT NOT NULL,
    is_deleted INTEGER NOT NULL DEFAULT 0 CHECK (is_deleted IN (0, 1)),
    deleted_at_us INTEGER,
    created_at_us INTEGER NOT NULL
);
";

/// Migration v2: read-path indexes.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_entities_kind_status
    ON entities(kind, status);

CREATE INDEX IF NOT EXISTS idx_entities_created_by
    ON entities(created_by, kind);

CREATE INDEX IF NOT EXISTS idx_entities_assigned_to
    ON entities(assigned_to, kind);

CREATE INDEX IF NOT EXISTS idx_entities_deleted_updated
    ON entities(is_deleted, updated_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_histories_entity
    ON assign_histories(entity_kind, entity_id, created_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_histories_assign_by
    ON assign_histories(assign_by, created_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_histories_assign_to
    ON assign_histories(assign_to, created_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_histories_deleted_created
    ON assign_histories(is_deleted, created_at_us DESC);
";
