//! Database migrations

use crate::error::Result;
use rusqlite::{params, Connection};

/// Current schema version
pub const CURRENT_VERSION: i32 = 3;

/// Run all pending migrations
pub fn run(conn: &mut Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }
    if version < 3 {
        migrate_v3(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Migration to version 1: Initial schema
fn migrate_v1(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );
        -- One blob per sync identifier
        CREATE TABLE IF NOT EXISTS backups (
            sync_id TEXT PRIMARY KEY,
            payload TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );
        -- Append-only trip snapshots
        CREATE TABLE IF NOT EXISTS trip_versions (
            id TEXT PRIMARY KEY,
            trip_id TEXT NOT NULL,
            timestamp INTEGER NOT NULL,
            note TEXT NOT NULL,
            payload TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_trip_versions_trip ON trip_versions(trip_id, timestamp DESC);
        INSERT INTO schema_version (version) VALUES (1);",
    )?;
    tx.commit()?;

    tracing::info!("Migrated database to version 1");
    Ok(())
}

/// Migration to version 2: searchable trip title and append-only guard
fn migrate_v2(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(
        "ALTER TABLE trip_versions ADD COLUMN trip_title TEXT NOT NULL DEFAULT '';
        UPDATE trip_versions SET trip_title = COALESCE(json_extract(payload, '$.data.title'), '');
        CREATE TRIGGER IF NOT EXISTS trip_versions_no_update BEFORE UPDATE ON trip_versions
        BEGIN
            SELECT RAISE(ABORT, 'trip versions are append-only');
        END;
        CREATE TRIGGER IF NOT EXISTS trip_versions_no_delete BEFORE DELETE ON trip_versions
        BEGIN
            SELECT RAISE(ABORT, 'trip versions are append-only');
        END;
        INSERT INTO schema_version (version) VALUES (2);",
    )?;
    tx.commit()?;

    tracing::info!("Migrated database to version 2");
    Ok(())
}

/// Migration to version 3: Unicode-folded search columns.
///
/// `SQLite` `LOWER`/`LIKE` only fold ASCII, so the folded text is computed
/// with Rust `to_lowercase` on write and backfilled here.
fn migrate_v3(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(
        "ALTER TABLE trip_versions ADD COLUMN note_lc TEXT NOT NULL DEFAULT '';
        ALTER TABLE trip_versions ADD COLUMN trip_title_lc TEXT NOT NULL DEFAULT '';
        DROP TRIGGER IF EXISTS trip_versions_no_update;",
    )?;

    let rows = {
        let mut stmt = tx.prepare("SELECT id, note, trip_title FROM trip_versions")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows
    };
    for (id, note, trip_title) in rows {
        tx.execute(
            "UPDATE trip_versions SET note_lc = ?1, trip_title_lc = ?2 WHERE id = ?3",
            params![note.to_lowercase(), trip_title.to_lowercase(), id],
        )?;
    }

    tx.execute_batch(
        "CREATE TRIGGER IF NOT EXISTS trip_versions_no_update BEFORE UPDATE ON trip_versions
        BEGIN
            SELECT RAISE(ABORT, 'trip versions are append-only');
        END;
        INSERT INTO schema_version (version) VALUES (3);",
    )?;
    tx.commit()?;

    tracing::info!("Migrated database to version 3");
    Ok(())
}
