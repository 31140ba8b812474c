//! Database layer for the self-hosted `SQLite` backup store

mod connection;
mod migrations;
mod repository;

pub use connection::Database;
pub use repository::{BackupRepository, SqliteBackupRepository};
