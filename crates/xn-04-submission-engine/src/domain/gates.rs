//! Ordering gates.
//!
//! One lock per key, created on first use and dropped with its last user.
//! Holding the submitter's gate from nonce fetch to node acceptance keeps two
//! submissions from the same account from signing with the same nonce.

use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub struct Gates<K: Eq + Hash> {
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K: Eq + Hash + Clone> Gates<K> {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Wait for exclusive use of `key`.
    pub async fn acquire(&self, key: &K) -> GateGuard<'_, K> {
        // Outlives the wait below, so an abandoned wait still evicts.
        let mut guard = GateGuard {
            gates: self,
            key: key.clone(),
            held: None,
        };
        let lock = Arc::clone(self.locks.entry(key.clone()).or_default().value());
        guard.held = Some(lock.lock_owned().await);
        guard
    }

    /// Keys currently held or waited on.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl<K: Eq + Hash + Clone> Default for Gates<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive use of one key until dropped.
pub struct GateGuard<'a, K: Eq + Hash> {
    gates: &'a Gates<K>,
    key: K,
    held: Option<OwnedMutexGuard<()>>,
}

impl<K: Eq + Hash> Drop for GateGuard<'_, K> {
    fn drop(&mut self) {
        self.held.take();
        // Only the map's own reference left: nobody holds or awaits the key.
        self.gates
            .locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}
