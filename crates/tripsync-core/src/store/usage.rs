//! Store call tallies, injected into the adapters that make network calls

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// Kind of store request being counted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreCall {
    Fetch,
    Write,
    AppendVersion,
    ListVersions,
    SearchVersions,
    FindVersion,
}

/// Shared request counter. Clones share the same tallies.
#[derive(Debug, Clone, Default)]
pub struct UsageCounter {
    inner: Arc<Tallies>,
}

#[derive(Debug, Default)]
struct Tallies {
    fetches: AtomicU64,
    writes: AtomicU64,
    version_appends: AtomicU64,
    version_queries: AtomicU64,
}

/// Point-in-time copy of the tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UsageSnapshot {
    pub fetches: u64,
    pub writes: u64,
    pub version_appends: u64,
    pub version_queries: u64,
}

impl UsageSnapshot {
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.fetches + self.writes + self.version_appends + self.version_queries
    }
}

impl UsageCounter {
    pub fn record(&self, call: StoreCall) {
        let tally = match call {
            StoreCall::Fetch => &self.inner.fetches,
            StoreCall::Write => &self.inner.writes,
            StoreCall::AppendVersion => &self.inner.version_appends,
            StoreCall::ListVersions | StoreCall::SearchVersions | StoreCall::FindVersion => &self.inner.version_queries,
        };
        tally.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> UsageSnapshot {
        UsageSnapshot {
            fetches: self.inner.fetches.load(Ordering::Relaxed),
            writes: self.inner.writes.load(Ordering::Relaxed),
            version_appends: self.inner.version_appends.load(Ordering::Relaxed),
            version_queries: self.inner.version_queries.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_tallies() {
        let counter = UsageCounter::default();
        let handle = counter.clone();

        handle.record(StoreCall::Fetch);
        handle.record(StoreCall::Write);
        counter.record(StoreCall::SearchVersions);
        counter.record(StoreCall::ListVersions);

        let snapshot = counter.snapshot();
        assert_eq!(snapshot.fetches, 1);
        assert_eq!(snapshot.writes, 1);
        assert_eq!(snapshot.version_queries, 2);
        assert_eq!(snapshot.total(), 4);
    }

    #[test]
    fn test_separate_counters_are_independent() {
        let first = UsageCounter::default();
        let second = UsageCounter::default();
        first.record(StoreCall::AppendVersion);
        assert_eq!(second.snapshot(), UsageSnapshot::default());
    }
}
