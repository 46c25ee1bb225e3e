//! Database schema and migrations for devcloud.
//!
//! Migrations are applied sequentially when the database is first opened
//! or upgraded.

/// Database migrations.
///
/// Each migration is a SQL script executed in order. The schema_version
/// table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: users
    r#"
CREATE TABLE users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    username    TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password    TEXT NOT NULL,           -- Argon2 hash
    email       TEXT,
    full_name   TEXT,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    last_login  TEXT,
    is_active   INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX idx_users_username ON users(username);
"#,
    // v2: per-user cloud disk mount roots
    r#"
CREATE TABLE storage_roots (
    username    TEXT PRIMARY KEY COLLATE NOCASE,
    root_path   TEXT NOT NULL,
    updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
);
"#,
    // v3: device registry
    r#"
CREATE TABLE device_types (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE COLLATE NOCASE,
    description TEXT,
    icon        TEXT,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE devices (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    device_uid       TEXT NOT NULL UNIQUE,
    name             TEXT NOT NULL,
    device_type_id   INTEGER NOT NULL REFERENCES device_types(id),
    status           TEXT NOT NULL DEFAULT 'inactive',
    private_data     TEXT NOT NULL DEFAULT '{}',  -- JSON object
    firmware_version TEXT,
    last_online      TEXT,
    is_online        INTEGER NOT NULL DEFAULT 0,
    created_at       TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at       TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_devices_type ON devices(device_type_id);
"#,
];
