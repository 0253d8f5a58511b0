//! SQL schema for the NetPatrol SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS accounts (
    account_id      TEXT PRIMARY KEY,
    handle          TEXT NOT NULL UNIQUE,
    display_name    TEXT NOT NULL,
    phone           TEXT,
    credential_hash TEXT NOT NULL,
    created_at      TEXT NOT NULL
);

-- Account references are weak: no foreign keys, lookups only.
CREATE TABLE IF NOT EXISTS ghost_nets (
    net_id                 TEXT PRIMARY KEY,
    location               TEXT,
    latitude               REAL,
    longitude              REAL,
    status                 TEXT NOT NULL
        CHECK (status IN ('REPORTED', 'SALVAGE_PENDING', 'RECOVERED', 'MISSING')),
    estimated_size         TEXT,
    description            TEXT,
    created_at             TEXT,      -- NULL only on historical rows
    reported_at            TEXT,      -- never updated after insert
    reporter_id            TEXT,
    reporter_name          TEXT,
    reported_by            TEXT,      -- reporter handle
    salvor_account_id      TEXT,
    missing_reporter_name  TEXT,
    missing_reporter_phone TEXT,
    version                INTEGER NOT NULL DEFAULT 0,
    CONSTRAINT chk_missing_contact CHECK (
        status <> 'MISSING' OR (
            trim(coalesce(missing_reporter_name, ''))  <> '' AND
            trim(coalesce(missing_reporter_phone, '')) <> '' AND
            trim(coalesce(reporter_name, ''))          <> '' AND
            trim(coalesce(reported_by, ''))            <> '' AND
            reporter_id IS NOT NULL
        )
    )
);

-- Requests are an audit trail: settled rows are never updated or deleted,
-- and they outlive the net they point at.
CREATE TABLE IF NOT EXISTS reassignment_requests (
    request_id        TEXT PRIMARY KEY,
    ghost_net_id      TEXT NOT NULL,
    requester_id      TEXT NOT NULL,
    current_salvor_id TEXT NOT NULL,
    status            TEXT NOT NULL
        CHECK (status IN ('PENDING', 'ACCEPTED', 'REJECTED')),
    created_at        TEXT NOT NULL
);

-- At most one PENDING request per net.
CREATE UNIQUE INDEX IF NOT EXISTS requests_one_pending_idx
    ON reassignment_requests(ghost_net_id) WHERE status = 'PENDING';

CREATE INDEX IF NOT EXISTS nets_created_idx   ON ghost_nets(created_at);
CREATE INDEX IF NOT EXISTS nets_reported_idx  ON ghost_nets(reported_at);
CREATE INDEX IF NOT EXISTS nets_reporter_idx  ON ghost_nets(reporter_id);
CREATE INDEX IF NOT EXISTS nets_salvor_idx    ON ghost_nets(salvor_account_id, status);
CREATE INDEX IF NOT EXISTS nets_status_idx    ON ghost_nets(status);
CREATE INDEX IF NOT EXISTS requests_net_idx       ON reassignment_requests(ghost_net_id, status);
CREATE INDEX IF NOT EXISTS requests_requester_idx ON reassignment_requests(requester_id);
CREATE INDEX IF NOT EXISTS requests_salvor_idx    ON reassignment_requests(current_salvor_id, status);

PRAGMA user_version = 1;
";
