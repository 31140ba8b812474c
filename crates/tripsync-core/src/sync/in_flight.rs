//! Per-identifier exclusion for sync sessions

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{Error, Result};
use crate::models::SyncId;

/// Registry of identifiers with a sync in flight.
///
/// Engines that should exclude each other share one registry through clones.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    ids: Arc<Mutex<HashSet<SyncId>>>,
}

impl InFlight {
    /// Mark `sync_id` busy until the returned guard is dropped.
    pub fn acquire(&self, sync_id: &SyncId) -> Result<SyncGuard> {
        let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        if !ids.insert(sync_id.clone()) {
            return Err(Error::SyncInProgress(sync_id.to_string()));
        }
        Ok(SyncGuard {
            ids: Arc::clone(&self.ids),
            sync_id: sync_id.clone(),
        })
    }

    #[must_use]
    pub fn is_busy(&self, sync_id: &SyncId) -> bool {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(sync_id)
    }
}

/// Releases its identifier on drop
#[derive(Debug)]
pub struct SyncGuard {
    ids: Arc<Mutex<HashSet<SyncId>>>,
    sync_id: SyncId,
}

impl Drop for SyncGuard {
    fn drop(&mut self) {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.sync_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_until_release() {
        let in_flight = InFlight::default();
        let sync_id = SyncId::parse("LOCK-0001").unwrap();

        let guard = in_flight.acquire(&sync_id).unwrap();
        assert!(matches!(
            in_flight.acquire(&sync_id),
            Err(Error::SyncInProgress(_))
        ));

        drop(guard);
        assert!(!in_flight.is_busy(&sync_id));
        assert!(in_flight.acquire(&sync_id).is_ok());
    }

    #[test]
    fn test_other_identifiers_are_independent() {
        let in_flight = InFlight::default();
        let _first = in_flight
            .acquire(&SyncId::parse("LOCK-0001").unwrap())
            .unwrap();
        assert!(in_flight
            .acquire(&SyncId::parse("LOCK-0002").unwrap())
            .is_ok());
    }
}
