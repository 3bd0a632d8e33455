//! Live machine state cache
//!
//! Holds the most recent snapshot of every machine reported by the
//! virtualization hosts. The snapshot is behind a single reader/writer lock;
//! readers get a cheap `Arc` handle, point updates mutate in place
//! (copy-on-write only while an older snapshot is still held by a reader).

use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::domain::{Server, ServerKey};

/// Shared state cache type
pub type SharedStateCache = Arc<StateCache>;

#[derive(Debug, Default)]
pub struct StateCache {
    /// `None` until the first successful refresh.
    servers: RwLock<Option<Arc<Vec<Server>>>>,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedStateCache {
        Arc::new(Self::new())
    }

    /// Current snapshot, or `None` if no refresh has ever completed.
    ///
    /// `Some` with an empty vector means the hosts reported no machines.
    pub fn snapshot(&self) -> Option<Arc<Vec<Server>>> {
        self.servers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_populated(&self) -> bool {
        self.servers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Swap in a whole new snapshot. Last writer wins.
    pub fn replace(&self, servers: Vec<Server>) {
        let count = servers.len();
        *self.servers.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(servers));
        debug!(count, "State cache replaced");
    }

    /// Set the power state of the machine with `key`.
    ///
    /// Returns `false` without error when the cache is unpopulated or the
    /// machine is unknown; the next refresh reconciles it.
    pub fn update_state(&self, key: &ServerKey, state: &str) -> bool {
        self.update_with(key, |server| server.state = state.to_string())
    }

    /// Set the network state of the machine with `key`. Same rules as
    /// [`update_state`](Self::update_state).
    pub fn update_network(&self, key: &ServerKey, network: &str) -> bool {
        self.update_with(key, |server| server.network = network.to_string())
    }

    fn update_with(&self, key: &ServerKey, apply: impl FnOnce(&mut Server)) -> bool {
        let mut guard = self.servers.write().unwrap_or_else(PoisonError::into_inner);
        let Some(servers) = guard.as_mut() else {
            debug!(%key, "State cache unpopulated, update skipped");
            return false;
        };
        let Some(index) = position(servers, key) else {
            debug!(%key, "Server not in state cache, update skipped");
            return false;
        };
        apply(&mut Arc::make_mut(servers)[index]);
        true
    }
}

/// Index of the first entry matching `key`.
fn position(servers: &[Server], key: &ServerKey) -> Option<usize> {
    servers.iter().position(|s| s.matches(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{POWER_OFF, POWER_RUNNING};

    fn vm(name: &str, hv: &str) -> Server {
        Server {
            vm_id: format!("{}-id", name),
            name: name.to_string(),
            hv: hv.to_string(),
            state: POWER_RUNNING.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_unpopulated_is_distinct_from_empty() {
        let cache = StateCache::new();
        assert!(cache.snapshot().is_none());
        assert!(!cache.is_populated());

        cache.replace(Vec::new());
        let snapshot = cache.snapshot().expect("populated");
        assert!(snapshot.is_empty());
        assert!(cache.is_populated());
    }

    #[test]
    fn test_update_on_unpopulated_is_noop() {
        let cache = StateCache::new();
        let key = ServerKey::new("web01", "hv-a");
        assert!(!cache.update_state(&key, POWER_OFF));
        assert!(!cache.update_network(&key, ""));
        assert!(cache.snapshot().is_none());
    }

    #[test]
    fn test_update_matches_name_and_host() {
        let cache = StateCache::new();
        cache.replace(vec![vm("web01", "hv-a"), vm("web01", "hv-b"), vm("db01", "hv-a")]);

        assert!(cache.update_state(&ServerKey::new("web01", "hv-b"), POWER_OFF));

        let snapshot = cache.snapshot().unwrap();
        assert_eq!(snapshot[0].state, POWER_RUNNING);
        assert_eq!(snapshot[1].state, POWER_OFF);
        assert_eq!(snapshot[2].state, POWER_RUNNING);
    }

    #[test]
    fn test_unknown_key_is_noop() {
        let cache = StateCache::new();
        cache.replace(vec![vm("web01", "hv-a")]);
        assert!(!cache.update_network(&ServerKey::new("web01", "hv-z"), "LAN"));
        assert_eq!(cache.snapshot().unwrap()[0].network, "");
    }

    #[test]
    fn test_held_snapshot_is_not_mutated() {
        let cache = StateCache::new();
        cache.replace(vec![vm("web01", "hv-a")]);
        let before = cache.snapshot().unwrap();

        cache.update_state(&ServerKey::new("web01", "hv-a"), POWER_OFF);

        assert_eq!(before[0].state, POWER_RUNNING);
        assert_eq!(cache.snapshot().unwrap()[0].state, POWER_OFF);
    }

    #[test]
    fn test_concurrent_updates() {
        let cache = StateCache::shared();
        cache.replace((0..8).map(|i| vm(&format!("vm{}", i), "hv")).collect());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    cache.update_network(&ServerKey::new(format!("vm{}", i), "hv"), "LAN")
                })
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap());
        }

        assert!(cache.snapshot().unwrap().iter().all(|s| s.network == "LAN"));
    }
}
