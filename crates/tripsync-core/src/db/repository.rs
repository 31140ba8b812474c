//! Backup repository implementation

use crate::error::{Error, Result};
use crate::models::{SyncId, TripId, TripVersion};
use rusqlite::{params, Connection, OptionalExtension};

/// Trait for backup blob and trip version storage operations
pub trait BackupRepository {
    /// Raw dataset blob stored under a sync identifier
    fn load_blob(&self, sync_id: &SyncId) -> Result<Option<String>>;

    /// Replace the dataset blob stored under a sync identifier
    fn save_blob(&self, sync_id: &SyncId, payload: &str, updated_at: i64) -> Result<()>;

    /// Append a trip version
    fn insert_version(&self, version: &TripVersion) -> Result<()>;

    /// Raw version payloads for a trip, newest first
    fn list_versions(&self, trip_id: &TripId) -> Result<Vec<serde_json::Value>>;

    /// Raw version payloads whose note or trip title contains `query`
    /// (Unicode case-insensitive), newest first. Every match is returned.
    fn search_versions(&self, query: &str) -> Result<Vec<serde_json::Value>>;

    /// Raw version payloads whose id starts with `prefix`, newest first
    fn versions_by_id_prefix(&self, prefix: &str) -> Result<Vec<serde_json::Value>>;
}

/// `SQLite` implementation of `BackupRepository`
pub struct SqliteBackupRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteBackupRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn collect_payloads(
        rows: impl Iterator<Item = rusqlite::Result<String>>,
    ) -> Result<Vec<serde_json::Value>> {
        let mut payloads = Vec::new();
        for row in rows {
            let raw = row?;
            match serde_json::from_str(&raw) {
                Ok(value) => payloads.push(value),
                Err(error) => tracing::warn!("Skipping corrupt trip version row: {}", error),
            }
        }
        Ok(payloads)
    }
}

/// Escape `LIKE` wildcards so user text matches literally
fn escape_like(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Case-folded substring pattern
fn like_pattern(query: &str) -> String {
    format!("%{}%", escape_like(query))
}

impl BackupRepository for SqliteBackupRepository<'_> {
    fn load_blob(&self, sync_id: &SyncId) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT payload FROM backups WHERE sync_id = ?",
                params![sync_id.as_str()],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn save_blob(&self, sync_id: &SyncId, payload: &str, updated_at: i64) -> Result<()> {
        self.conn.execute(
            "INSERT INTO backups (sync_id, payload, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(sync_id) DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at",
            params![sync_id.as_str(), payload, updated_at],
        )?;
        Ok(())
    }

    fn insert_version(&self, version: &TripVersion) -> Result<()> {
        let payload = serde_json::to_string(version)?;
        self.conn.execute(
            "INSERT INTO trip_versions
                (id, trip_id, timestamp, note, trip_title, note_lc, trip_title_lc, payload)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                version.id.as_str(),
                version.trip_id.as_str(),
                version.timestamp,
                version.note,
                version.trip_title(),
                version.note.to_lowercase(),
                version.trip_title().to_lowercase(),
                payload
            ],
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(failure, _)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Error::InvalidInput(format!("version {} already exists", version.id))
            }
            other => other.into(),
        })?;
        Ok(())
    }

    fn list_versions(&self, trip_id: &TripId) -> Result<Vec<serde_json::Value>> {
        let mut stmt = self.conn.prepare(
            "SELECT payload FROM trip_versions
             WHERE trip_id = ?
             ORDER BY timestamp DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![trip_id.as_str()], |row| row.get(0))?;
        Self::collect_payloads(rows)
    }

    fn search_versions(&self, query: &str) -> Result<Vec<serde_json::Value>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(
            "SELECT payload FROM trip_versions
             WHERE note_lc LIKE ?1 ESCAPE '\\' OR trip_title_lc LIKE ?1 ESCAPE '\\'
             ORDER BY timestamp DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![like_pattern(query)], |row| row.get(0))?;
        Self::collect_payloads(rows)
    }

    fn versions_by_id_prefix(&self, prefix: &str) -> Result<Vec<serde_json::Value>> {
        if prefix.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(
            "SELECT payload FROM trip_versions
             WHERE id LIKE ?1 ESCAPE '\\'
             ORDER BY timestamp DESC, id DESC",
        )?;
        let pattern = format!("{}%", escape_like(prefix));
        let rows = stmt.query_map(params![pattern], |row| row.get(0))?;
        Self::collect_payloads(rows)
    }
}
