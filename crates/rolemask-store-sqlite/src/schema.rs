//! SQL schema for the rolemask SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS subjects (
    subject_id  TEXT PRIMARY KEY,
    kind        TEXT NOT NULL,   -- 'group' | 'state'
    name        TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    UNIQUE (kind, name)
);

-- One row per subject. A group is referenced by id, a state by name;
-- exactly one of the two is set.
CREATE TABLE IF NOT EXISTS obfuscation_configs (
    config_id                TEXT PRIMARY KEY,
    group_id                 TEXT UNIQUE REFERENCES subjects(subject_id) ON DELETE CASCADE,
    state_name               TEXT UNIQUE,
    opt_out                  INTEGER NOT NULL DEFAULT 0,
    method                   TEXT NOT NULL,
    format                   TEXT NOT NULL DEFAULT '',
    dividers                 TEXT NOT NULL DEFAULT '',   -- comma-separated
    min_chars_before_divider INTEGER NOT NULL DEFAULT 0,
    custom_name              TEXT NOT NULL DEFAULT '',
    use_random_key           INTEGER NOT NULL DEFAULT 0,
    random_key               TEXT NOT NULL DEFAULT '',
    rotate_name              INTEGER NOT NULL DEFAULT 0,
    reposition               INTEGER NOT NULL DEFAULT 0,
    fixed_color              INTEGER,                    -- RGB or NULL
    tracked_role_id          TEXT,
    last_applied_name        TEXT NOT NULL DEFAULT '',
    created_at               TEXT NOT NULL,
    updated_at               TEXT NOT NULL,
    CHECK ((group_id IS NULL) <> (state_name IS NULL))
);

-- Creation order is the rowid; it breaks priority ties.
CREATE TABLE IF NOT EXISTS color_rules (
    rule_id        TEXT PRIMARY KEY,
    pattern        TEXT NOT NULL,
    case_sensitive INTEGER NOT NULL DEFAULT 0,
    enabled        INTEGER NOT NULL DEFAULT 1,
    priority       INTEGER NOT NULL DEFAULT 0,
    created_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS color_assignments (
    assignment_id TEXT PRIMARY KEY,
    rule_id       TEXT NOT NULL REFERENCES color_rules(rule_id) ON DELETE CASCADE,
    role_id       TEXT NOT NULL UNIQUE,
    role_name     TEXT NOT NULL,
    color         INTEGER NOT NULL UNIQUE,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS global_settings (
    id            INTEGER PRIMARY KEY CHECK (id = 1),
    settings_json TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS outbox (
    event_id     TEXT PRIMARY KEY,
    event_type   TEXT NOT NULL,
    payload_json TEXT NOT NULL,
    recorded_at  TEXT NOT NULL,
    completed_at TEXT
);

CREATE INDEX IF NOT EXISTS configs_random_key_idx ON obfuscation_configs(use_random_key);
CREATE INDEX IF NOT EXISTS outbox_pending_idx     ON outbox(completed_at);

PRAGMA user_version = 1;
";
