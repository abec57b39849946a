//! # Sync Target Selection
//!
//! The best peer to pull blocks from is the one reporting the greatest
//! height. Among equal heights the lowest measured latency wins, and among
//! equal latencies the peer registered first.

use shared_types::PeerRef;
use std::time::Duration;

/// A peer chosen to synchronize from, with the height it reported.
#[derive(Debug, Clone)]
pub struct SyncTarget {
    pub peer: PeerRef,
    pub height: u64,
}

/// Pick the sync target from a registry snapshot.
///
/// A peer whose latency cannot be measured any more has disconnected since
/// the snapshot was taken and is skipped.
pub fn select_sync_target(candidates: &[(PeerRef, u64)]) -> Option<SyncTarget> {
    let mut best: Option<(SyncTarget, Duration)> = None;

    for (peer, height) in candidates {
        let Some(latency) = peer.latency() else {
            continue;
        };
        let better = match &best {
            None => true,
            Some((current, current_latency)) => {
                *height > current.height
                    || (*height == current.height && latency < *current_latency)
            }
        };
        if better {
            best = Some((
                SyncTarget {
                    peer: peer.clone(),
                    height: *height,
                },
                latency,
            ));
        }
    }

    best.map(|(target, _)| target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::test_utils::RecordingPeer;
    use shared_types::PeerId;

    #[test]
    fn test_height_dominates_then_latency() {
        let a = RecordingPeer::new(1, 50);
        let b = RecordingPeer::new(2, 30);
        let c = RecordingPeer::new(3, 5);
        let candidates = vec![(a.handle(), 100), (b.handle(), 100), (c.handle(), 90)];

        let target = select_sync_target(&candidates).unwrap();

        assert_eq!(target.peer.id(), PeerId(2));
        assert_eq!(target.height, 100);
    }

    #[test]
    fn test_equal_latency_keeps_first_registered() {
        let a = RecordingPeer::new(1, 20);
        let b = RecordingPeer::new(2, 20);
        let candidates = vec![(a.handle(), 10), (b.handle(), 10)];

        assert_eq!(select_sync_target(&candidates).unwrap().peer.id(), PeerId(1));
    }

    #[test]
    fn test_vanished_peer_is_skipped() {
        let gone = RecordingPeer::new(1, 1);
        let live = RecordingPeer::new(2, 80);
        gone.disconnect();
        let candidates = vec![(gone.handle(), 500), (live.handle(), 100)];

        let target = select_sync_target(&candidates).unwrap();
        assert_eq!(target.peer.id(), PeerId(2));
    }

    #[test]
    fn test_no_candidates() {
        assert!(select_sync_target(&[]).is_none());

        let gone = RecordingPeer::new(1, 1);
        gone.disconnect();
        assert!(select_sync_target(&[(gone.handle(), 3)]).is_none());
    }
}
