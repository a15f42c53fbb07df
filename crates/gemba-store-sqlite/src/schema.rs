//! SQL schema for the Gemba SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.
//!
//! The UNIQUE constraints below are the authoritative enforcement point for
//! the natural keys; the application-level duplicate checks are best-effort
//! early rejection only.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS roles (
    id             TEXT PRIMARY KEY,
    name           TEXT NOT NULL UNIQUE,
    description    TEXT,
    permissions    TEXT NOT NULL DEFAULT '[]',  -- JSON array of permission tokens
    is_system_role INTEGER NOT NULL DEFAULT 0,
    created_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS departments (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    code        TEXT NOT NULL UNIQUE,
    description TEXT,
    manager_id  TEXT REFERENCES users(id),
    is_active   INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id                    TEXT PRIMARY KEY,
    employee_id           TEXT NOT NULL UNIQUE,
    name                  TEXT NOT NULL,
    email                 TEXT UNIQUE,
    pin_hash              TEXT NOT NULL,
    role_id               TEXT NOT NULL REFERENCES roles(id),
    department_id         TEXT REFERENCES departments(id),
    is_active             INTEGER NOT NULL DEFAULT 1,
    failed_login_attempts INTEGER NOT NULL DEFAULT 0,
    locked_until          TEXT,
    created_at            TEXT NOT NULL,
    updated_at            TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS projects (
    id            TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    description   TEXT,
    status        TEXT NOT NULL DEFAULT 'draft',  -- draft|active|on_hold|completed|cancelled
    department_id TEXT REFERENCES departments(id),
    owner_id      TEXT REFERENCES users(id),
    start_date    TEXT,                           -- ISO date
    end_date      TEXT,
    is_active     INTEGER NOT NULL DEFAULT 1,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

-- Two conceptual levels: 'department' roots, 'area' children.
CREATE TABLE IF NOT EXISTS skill_categories (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    code        TEXT NOT NULL UNIQUE,
    slug        TEXT NOT NULL,
    description TEXT,
    color       TEXT,
    kind        TEXT NOT NULL,                    -- 'department' | 'area'
    parent_id   TEXT REFERENCES skill_categories(id),
    path        TEXT NOT NULL,                    -- slash-joined slug chain
    depth       INTEGER NOT NULL DEFAULT 0,
    sort_order  INTEGER NOT NULL DEFAULT 0,
    is_active   INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    UNIQUE (parent_id, slug)
);

-- UNIQUE(parent_id, slug) does not cover roots (NULLs compare distinct),
-- so root slugs get their own partial index.
CREATE UNIQUE INDEX IF NOT EXISTS skill_categories_root_slug_idx
    ON skill_categories(slug) WHERE parent_id IS NULL;

CREATE TABLE IF NOT EXISTS skills (
    id                            TEXT PRIMARY KEY,
    name                          TEXT NOT NULL,
    code                          TEXT NOT NULL UNIQUE,
    description                   TEXT,
    category_id                   TEXT REFERENCES skill_categories(id),
    parent_skill_id               TEXT REFERENCES skills(id),
    path                          TEXT NOT NULL,
    depth                         INTEGER NOT NULL DEFAULT 0,
    has_proficiency_levels        INTEGER NOT NULL DEFAULT 0,
    max_proficiency_level         INTEGER NOT NULL DEFAULT 3,
    requires_certification        INTEGER NOT NULL DEFAULT 0,
    certification_validity_months INTEGER,        -- NULL = never expires
    required_training_hours       INTEGER,
    allows_ojt                    INTEGER NOT NULL DEFAULT 1,
    allows_classroom              INTEGER NOT NULL DEFAULT 1,
    allows_online                 INTEGER NOT NULL DEFAULT 1,
    is_active                     INTEGER NOT NULL DEFAULT 1,
    created_at                    TEXT NOT NULL,
    updated_at                    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS skill_prerequisites (
    id                        TEXT PRIMARY KEY,
    skill_id                  TEXT NOT NULL REFERENCES skills(id) ON DELETE CASCADE,
    prerequisite_skill_id     TEXT NOT NULL REFERENCES skills(id) ON DELETE CASCADE,
    minimum_proficiency_level INTEGER NOT NULL DEFAULT 1,
    created_at                TEXT NOT NULL,
    UNIQUE (skill_id, prerequisite_skill_id),
    CHECK  (skill_id != prerequisite_skill_id)
);

CREATE TABLE IF NOT EXISTS attachments (
    id           TEXT PRIMARY KEY,
    entity_kind  TEXT NOT NULL,    -- 'user'|'project'|'skill'|'skill_category'
    entity_id    TEXT NOT NULL,
    kind         TEXT NOT NULL,    -- 'avatar'|'photo'|'document'
    filename     TEXT NOT NULL,
    content_type TEXT NOT NULL,
    size_bytes   INTEGER NOT NULL,
    storage_path TEXT NOT NULL,    -- object-storage reference, never a local file
    uploaded_by  TEXT REFERENCES users(id),
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS system_settings (
    key        TEXT PRIMARY KEY,
    value      TEXT NOT NULL,      -- JSON document
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS audit_logs (
    id          TEXT PRIMARY KEY,
    user_id     TEXT REFERENCES users(id),
    entity_kind TEXT NOT NULL,
    entity_id   TEXT NOT NULL,
    action      TEXT NOT NULL,
    details     TEXT,              -- JSON
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    token_hash TEXT PRIMARY KEY,   -- hex SHA-256 of the cookie token
    user_id    TEXT NOT NULL REFERENCES users(id),
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS skill_categories_parent_idx ON skill_categories(parent_id);
CREATE INDEX IF NOT EXISTS skill_categories_path_idx   ON skill_categories(path);
CREATE INDEX IF NOT EXISTS skills_parent_idx           ON skills(parent_skill_id);
CREATE INDEX IF NOT EXISTS skills_category_idx         ON skills(category_id);
CREATE INDEX IF NOT EXISTS skills_path_idx             ON skills(path);
CREATE INDEX IF NOT EXISTS users_department_idx        ON users(department_id);
CREATE INDEX IF NOT EXISTS users_role_idx              ON users(role_id);
CREATE INDEX IF NOT EXISTS projects_department_idx     ON projects(department_id);
CREATE INDEX IF NOT EXISTS projects_status_idx         ON projects(status);
CREATE INDEX IF NOT EXISTS attachments_entity_idx      ON attachments(entity_kind, entity_id);
CREATE INDEX IF NOT EXISTS audit_logs_entity_idx       ON audit_logs(entity_kind, entity_id);
CREATE INDEX IF NOT EXISTS audit_logs_created_idx      ON audit_logs(created_at);
CREATE INDEX IF NOT EXISTS sessions_user_idx           ON sessions(user_id);
CREATE INDEX IF NOT EXISTS sessions_expires_idx        ON sessions(expires_at);

PRAGMA user_version = 1;
";
