use super::NetworkStatusService;
use crate::domain::selection::{select_sync_target, SyncTarget};
use crate::domain::transitions::StatusTrigger;
use crate::ports::inbound::NetworkStatusApi;
use shared_types::{NetworkStatus, PeerId, PeerRef, VersionInfo};
use tracing::debug;

impl NetworkStatusApi for NetworkStatusService {
    fn record_height(&self, peer: &PeerRef, height: u64) {
        let transition = {
            let mut status = self.status.lock();
            if self.heights.upsert(peer, height) {
                debug!(peer = %peer.id(), height, "[hx-02] Peer registered");
            }
            self.transition(&mut status, StatusTrigger::PeerObserved)
        };
        self.after(transition);
    }

    fn record_version(&self, peer: &PeerRef, version: VersionInfo) {
        let transition = {
            let mut status = self.status.lock();
            debug!(
                peer = %peer.id(),
                version = %version.version,
                build_timestamp = version.build_timestamp,
                "[hx-02] Peer version recorded"
            );
            self.versions.upsert(peer, version);
            self.transition(&mut status, StatusTrigger::PeerObserved)
        };
        self.after(transition);
    }

    fn remove_peer(&self, peer: PeerId) -> bool {
        let mut status = self.status.lock();
        let had_height = self.heights.remove(peer).is_some();
        self.versions.remove(peer);

        if !self.heights.is_empty() {
            return had_height;
        }
        let transition = self.transition(&mut status, StatusTrigger::RegistryEmptied);
        if had_height || transition.changed() {
            self.mark_offline();
        }
        drop(status);

        self.after(transition);
        had_height
    }

    fn begin_sync(&self) {
        let transition = {
            let mut status = self.status.lock();
            self.transition(&mut status, StatusTrigger::SyncStarted)
        };
        self.after(transition);
    }

    fn finish_sync(&self) -> NetworkStatus {
        let transition = {
            let mut status = self.status.lock();
            let peers_remaining = !self.heights.is_empty();
            self.transition(&mut status, StatusTrigger::SyncFinished { peers_remaining })
        };
        self.after(transition);
        transition.to
    }

    fn status(&self) -> NetworkStatus {
        *self.status.lock()
    }

    fn max_peer_height(&self) -> u64 {
        self.heights.max_value().unwrap_or(0)
    }

    fn peer_heights(&self) -> Vec<(PeerId, u64)> {
        self.heights.values()
    }

    fn height_of(&self, peer: PeerId) -> u64 {
        self.heights.get(peer).unwrap_or(0)
    }

    fn version_of(&self, peer: PeerId) -> VersionInfo {
        self.versions.get(peer).unwrap_or_default()
    }

    fn peer_versions(&self) -> Vec<(PeerId, VersionInfo)> {
        self.versions.values()
    }

    fn is_up_to_date(&self, local_height: u64) -> bool {
        self.heights
            .max_value()
            .map_or(true, |max| max <= local_height)
    }

    fn select_sync_target(&self) -> Option<SyncTarget> {
        select_sync_target(&self.heights.snapshot())
    }

    fn offline_since(&self) -> Option<u64> {
        *self.offline_since.lock()
    }

    fn clear_offline_since(&self) {
        self.offline_since.lock().take();
    }
}
