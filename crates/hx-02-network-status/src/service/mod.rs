//! # Network Status Service
//!
//! Owns the peer height and version registries and the single status cell.

mod api;
#[cfg(test)]
mod tests;

use crate::domain::registry::PeerRegistry;
use crate::domain::transitions::{StatusTrigger, Transition};
use crate::ports::outbound::{ConnectedHook, TimeSource};
use parking_lot::Mutex;
use shared_bus::{EventPublisher, NodeEvent};
use shared_types::{NetworkStatus, VersionInfo};
use std::sync::Arc;
use tracing::info;

/// Dependencies for [`NetworkStatusService`].
pub struct NetworkStatusDependencies {
    /// Receives `NetworkStatusChanged`.
    pub publisher: Arc<dyn EventPublisher>,
    pub connected_hook: Arc<dyn ConnectedHook>,
    pub time_source: Arc<dyn TimeSource>,
}

/// Peer bookkeeping plus the network status state machine.
pub struct NetworkStatusService {
    pub(crate) heights: PeerRegistry<u64>,
    pub(crate) versions: PeerRegistry<VersionInfo>,
    /// Starts as `NoConnections` on every process start.
    pub(crate) status: Mutex<NetworkStatus>,
    pub(crate) offline_since: Mutex<Option<u64>>,
    publisher: Arc<dyn EventPublisher>,
    connected_hook: Arc<dyn ConnectedHook>,
    time_source: Arc<dyn TimeSource>,
}

impl NetworkStatusService {
    pub fn new(deps: NetworkStatusDependencies) -> Self {
        Self {
            heights: PeerRegistry::new(),
            versions: PeerRegistry::new(),
            status: Mutex::new(NetworkStatus::NoConnections),
            offline_since: Mutex::new(None),
            publisher: deps.publisher,
            connected_hook: deps.connected_hook,
            time_source: deps.time_source,
        }
    }

    /// Number of peers with a registered height.
    pub fn peer_count(&self) -> usize {
        self.heights.len()
    }

    /// Apply `trigger` to the locked status cell, publishing while the lock
    /// is held so that status events reach subscribers in transition order.
    pub(crate) fn transition(
        &self,
        status: &mut NetworkStatus,
        trigger: StatusTrigger,
    ) -> Transition {
        let transition = Transition::apply(*status, trigger);
        *status = transition.to;

        if transition.changed() {
            info!(
                from = %transition.from,
                to = %transition.to,
                peers = self.heights.len(),
                "[hx-02] Network status changed"
            );
        }
        if transition.notify {
            self.publisher
                .publish(NodeEvent::NetworkStatusChanged(transition.to));
        }
        transition
    }

    /// Side effects that must run with no lock held.
    pub(crate) fn after(&self, transition: Transition) {
        if transition.connected {
            self.connected_hook.on_connected();
        }
    }

    pub(crate) fn mark_offline(&self) {
        let mut offline_since = self.offline_since.lock();
        if offline_since.is_none() {
            *offline_since = Some(self.time_source.now_millis());
        }
    }
}
