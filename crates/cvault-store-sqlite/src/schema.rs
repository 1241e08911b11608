//! SQL schema for the cvault SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Rows are never physically deleted; `deleted_at` marks soft deletion.
CREATE TABLE IF NOT EXISTS files (
    id                  TEXT PRIMARY KEY,
    owner_id            INTEGER NOT NULL,
    content_hash        TEXT NOT NULL,     -- lowercase hex SHA-256
    original_name       TEXT NOT NULL,
    display_name        TEXT NOT NULL,
    is_duplicate        INTEGER NOT NULL DEFAULT 0,
    duplicate_sequence  INTEGER NOT NULL DEFAULT 0,
    canonical_record_id TEXT REFERENCES files(id),
    created_at          TEXT NOT NULL,     -- RFC 3339 UTC, fixed width
    deleted_at          TEXT
);

CREATE TABLE IF NOT EXISTS credential_sessions (
    id                    TEXT PRIMARY KEY,
    owner_id              INTEGER NOT NULL UNIQUE,
    access_token          TEXT NOT NULL,
    refresh_token         TEXT,
    token_expires_at      TEXT NOT NULL,
    is_persistent         INTEGER NOT NULL DEFAULT 1,
    auto_refresh_enabled  INTEGER NOT NULL DEFAULT 1,
    is_active             INTEGER NOT NULL DEFAULT 1,
    persistent_session_id TEXT NOT NULL UNIQUE,
    refresh_attempts      INTEGER NOT NULL DEFAULT 0,
    max_refresh_failures  INTEGER NOT NULL,
    last_refresh_at       TEXT,
    deactivated_at        TEXT,
    deactivated_reason    TEXT,
    drive_quota_total     INTEGER,
    drive_quota_used      INTEGER,
    last_quota_check      TEXT,
    quota_warning_level   TEXT NOT NULL DEFAULT 'none',
    quota_warnings_sent   TEXT NOT NULL DEFAULT '[]',  -- JSON array, newest last
    last_activity_at      TEXT,
    created_at            TEXT NOT NULL,
    updated_at            TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS files_owner_hash_idx
    ON files(owner_id, content_hash, deleted_at);
CREATE INDEX IF NOT EXISTS sessions_expiry_idx
    ON credential_sessions(is_active, token_expires_at);

PRAGMA user_version = 1;
";
