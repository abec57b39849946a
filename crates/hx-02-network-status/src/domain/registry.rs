//! # Peer Registry
//!
//! Concurrent `peer -> value` map that remembers the order peers were first
//! registered in. Re-registering a peer updates its value in place.

use indexmap::IndexMap;
use parking_lot::Mutex;
use shared_types::{PeerId, PeerRef};

/// Insertion-ordered registry keyed by peer identity.
///
/// The registry keeps a handle to each peer so that scans can ask for its
/// latency without a second lookup, but it never owns the connection.
pub struct PeerRegistry<V> {
    entries: Mutex<IndexMap<PeerId, (PeerRef, V)>>,
}

impl<V: Clone> PeerRegistry<V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
        }
    }

    /// Record `value` for `peer`. Returns `true` if the peer was not
    /// registered before.
    pub fn upsert(&self, peer: &PeerRef, value: V) -> bool {
        let mut entries = self.entries.lock();
        match entries.get_mut(&peer.id()) {
            Some(entry) => {
                entry.1 = value;
                false
            }
            None => {
                entries.insert(peer.id(), (peer.clone(), value));
                true
            }
        }
    }

    /// Drop the peer, keeping the order of the remaining entries.
    pub fn remove(&self, peer: PeerId) -> Option<V> {
        self.entries.lock().shift_remove(&peer).map(|(_, value)| value)
    }

    pub fn get(&self, peer: PeerId) -> Option<V> {
        self.entries.lock().get(&peer).map(|(_, value)| value.clone())
    }

    pub fn contains(&self, peer: PeerId) -> bool {
        self.entries.lock().contains_key(&peer)
    }

    /// Copy of every entry in registration order.
    pub fn snapshot(&self) -> Vec<(PeerRef, V)> {
        self.entries
            .lock()
            .values()
            .map(|(peer, value)| (peer.clone(), value.clone()))
            .collect()
    }

    /// Every `(id, value)` pair in registration order.
    pub fn values(&self) -> Vec<(PeerId, V)> {
        self.entries
            .lock()
            .iter()
            .map(|(id, (_, value))| (*id, value.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<V: Clone + Ord> PeerRegistry<V> {
    /// Largest registered value.
    pub fn max_value(&self) -> Option<V> {
        self.entries.lock().values().map(|(_, v)| v).max().cloned()
    }
}

impl<V: Clone> Default for PeerRegistry<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::test_utils::RecordingPeer;

    #[test]
    fn test_upsert_keeps_first_registration_order() {
        let registry = PeerRegistry::new();
        let a = RecordingPeer::new(1, 10).handle();
        let b = RecordingPeer::new(2, 10).handle();

        assert!(registry.upsert(&a, 5u64));
        assert!(registry.upsert(&b, 7));
        assert!(!registry.upsert(&a, 9));

        assert_eq!(registry.values(), vec![(PeerId(1), 9), (PeerId(2), 7)]);
    }

    #[test]
    fn test_remove_preserves_remaining_order() {
        let registry = PeerRegistry::new();
        for id in 1..=4 {
            registry.upsert(&RecordingPeer::new(id, 10).handle(), id * 10);
        }

        assert_eq!(registry.remove(PeerId(2)), Some(20));
        assert_eq!(registry.remove(PeerId(2)), None);

        let ids: Vec<_> = registry.values().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![PeerId(1), PeerId(3), PeerId(4)]);
    }

    #[test]
    fn test_max_value() {
        let registry = PeerRegistry::new();
        assert_eq!(registry.max_value(), None);

        registry.upsert(&RecordingPeer::new(1, 10).handle(), 40u64);
        registry.upsert(&RecordingPeer::new(2, 10).handle(), 90);
        registry.upsert(&RecordingPeer::new(3, 10).handle(), 60);

        assert_eq!(registry.max_value(), Some(90));
    }
}
