//! Peer sync of trip datasets through a backup store.
//!
//! A session runs in one direction only:
//!
//! 1. fetch the remote blob for the sync identifier
//! 2. diff it against the local dataset, per trip and per field
//! 3. on conflicts, pause and collect one keep-local / use-remote choice per trip
//! 4. merge, write the merged blob, and hand it back for local persistence
//!
//! Nothing is written anywhere until step 4, and at most one session per
//! identifier is open at a time.

mod diff;
mod engine;
mod in_flight;
mod merge;
mod resolution;

pub use diff::{detect_conflicts, diff_trip, ConflictReport};
pub use engine::{IdentifierCheck, SyncEngine, SyncOutcome};
pub use in_flight::{InFlight, SyncGuard};
pub use merge::{merge, missing_trip_ids, MergeSummary};
pub use resolution::PendingResolution;
