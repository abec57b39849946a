//! # Driving Ports (Inbound API)

use crate::domain::selection::SyncTarget;
use shared_types::{NetworkStatus, PeerId, PeerRef, VersionInfo};

/// Peer bookkeeping and status state machine.
///
/// Mutations serialize on the status lock. Queries take only the lock of
/// the registry they read.
pub trait NetworkStatusApi: Send + Sync {
    /// Record the height `peer` reported. Moves `NoConnections` to `Ok`.
    fn record_height(&self, peer: &PeerRef, height: u64);

    /// Record the version `peer` reported. Moves `NoConnections` to `Ok`.
    fn record_version(&self, peer: &PeerRef, version: VersionInfo);

    /// Forget the peer in both registries. Returns whether it had a
    /// registered height. Emptying the height registry moves the status to
    /// `NoConnections`.
    fn remove_peer(&self, peer: PeerId) -> bool;

    /// Enter `Synchronizing`.
    fn begin_sync(&self);

    /// Leave `Synchronizing` for `Ok` or `NoConnections`, always notifying.
    fn finish_sync(&self) -> NetworkStatus;

    fn status(&self) -> NetworkStatus;

    /// Greatest reported height, 0 when no peer has reported one.
    fn max_peer_height(&self) -> u64;

    /// Every `(peer, height)` in registration order.
    fn peer_heights(&self) -> Vec<(PeerId, u64)>;

    /// Reported height of `peer`, 0 when unknown.
    fn height_of(&self, peer: PeerId) -> u64;

    /// Reported version of `peer`, empty when unknown.
    fn version_of(&self, peer: PeerId) -> VersionInfo;

    fn peer_versions(&self) -> Vec<(PeerId, VersionInfo)>;

    /// True when no peer is registered or none is ahead of `local_height`.
    fn is_up_to_date(&self, local_height: u64) -> bool;

    /// Best peer to synchronize from, if any is still reachable.
    fn select_sync_target(&self) -> Option<SyncTarget>;

    /// When the last peer went away, in Unix milliseconds.
    fn offline_since(&self) -> Option<u64>;

    fn clear_offline_since(&self);
}
