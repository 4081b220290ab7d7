//! SQL schema for the warden SQLite store.
//!
//! Executed once at connection startup. Prisoner documents carry their own
//! `schema_version`; document migrations happen on read in
//! `warden_core::record::decode`, not here.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One document per prisoner with an open hold or applied confinement.
-- Rows are upserted on every change and deleted on archival.
CREATE TABLE IF NOT EXISTS prisoners (
    subject_id     TEXT PRIMARY KEY,   -- decimal u64
    schema_version INTEGER NOT NULL,   -- version of record_json
    record_json    TEXT NOT NULL,
    updated_at     TEXT NOT NULL       -- ISO 8601 UTC
);

-- The role ledger: each member's current role set as mirrored to the chat
-- platform. Absent row = member unreachable.
CREATE TABLE IF NOT EXISTS members (
    subject_id  TEXT PRIMARY KEY,
    roles_json  TEXT NOT NULL DEFAULT '[]',
    updated_at  TEXT NOT NULL
);

PRAGMA user_version = 1;
";
