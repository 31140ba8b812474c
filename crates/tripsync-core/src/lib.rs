//! tripsync-core - Core library for Tripsync
//!
//! Keeps a traveller's trips in step across devices without a central
//! server. Each device holds a full dataset; a shared backup store keeps one
//! blob per sync identifier plus an append-only list of trip versions.
//!
//! This crate contains the trip models, conflict detection, merge, the sync
//! session engine, version history, and the backup store adapters used by
//! every Tripsync client.

pub mod config;
pub mod db;
pub mod error;
pub mod history;
pub mod models;
pub mod store;
pub mod sync;
pub mod util;

pub use config::StoreConfig;
pub use error::{Error, Result};
pub use history::{restore, RestoredTrip, VersionHistory};
pub use models::{
    ConflictItem, Dataset, ResolutionMap, Side, SyncId, Trip, TripField, TripId, TripVersion,
    VersionId,
};
pub use store::{AnyStore, MemoryStore, RemoteStore, UsageCounter};
pub use sync::{PendingResolution, SyncEngine, SyncOutcome};
