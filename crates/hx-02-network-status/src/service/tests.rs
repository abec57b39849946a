//! # Network Status Service Tests

use super::*;
use crate::ports::inbound::NetworkStatusApi;
use crate::test_utils::{CountingHook, FixedTimeSource};
use shared_bus::{EventFilter, EventHub, EventTopic, Subscription};
use shared_types::test_utils::RecordingPeer;
use shared_types::{Peer, PeerId};

struct Fixture {
    service: Arc<NetworkStatusService>,
    hook: Arc<CountingHook>,
    clock: Arc<FixedTimeSource>,
    events: Subscription,
}

fn setup() -> Fixture {
    let hub = Arc::new(EventHub::new());
    let hook = Arc::new(CountingHook::default());
    let clock = Arc::new(FixedTimeSource::new(1_000));
    let service = Arc::new(NetworkStatusService::new(NetworkStatusDependencies {
        publisher: hub.clone(),
        connected_hook: hook.clone(),
        time_source: clock.clone(),
    }));
    let mut events = hub.subscribe(EventFilter::topics(vec![EventTopic::Network]));
    // Synthetic current-status event delivered on registration.
    assert_eq!(
        events.try_recv().unwrap(),
        Some(NodeEvent::NetworkStatusChanged(NetworkStatus::NoConnections))
    );
    Fixture {
        service,
        hook,
        clock,
        events,
    }
}

fn drain(sub: &mut Subscription) -> Vec<NetworkStatus> {
    let mut seen = Vec::new();
    while let Ok(Some(event)) = sub.try_recv() {
        if let NodeEvent::NetworkStatusChanged(status) = event {
            seen.push(status);
        }
    }
    seen
}

// =============================================================================
// TEST GROUP: connecting
// =============================================================================

#[test]
fn test_starts_without_connections() {
    let f = setup();
    assert_eq!(f.service.status(), NetworkStatus::NoConnections);
    assert_eq!(f.service.max_peer_height(), 0);
}

#[test]
fn test_first_height_moves_to_ok_once() {
    let mut f = setup();
    let a = RecordingPeer::new(1, 10).handle();
    let b = RecordingPeer::new(2, 10).handle();

    f.service.record_height(&a, 10);
    f.service.record_height(&b, 12);
    f.service.record_height(&a, 11);

    assert_eq!(f.service.status(), NetworkStatus::Ok);
    assert_eq!(drain(&mut f.events), vec![NetworkStatus::Ok]);
    assert_eq!(f.hook.fired(), 1);
}

#[test]
fn test_first_version_moves_to_ok() {
    let mut f = setup();
    let a = RecordingPeer::new(1, 10).handle();

    f.service.record_version(&a, VersionInfo::new("0.26.2", 1_400_000_000_000));

    assert_eq!(f.service.status(), NetworkStatus::Ok);
    assert_eq!(drain(&mut f.events), vec![NetworkStatus::Ok]);
    assert_eq!(f.service.version_of(PeerId(1)).version, "0.26.2");
    // A version alone does not register a height.
    assert_eq!(f.service.peer_count(), 0);
}

#[test]
fn test_reconnect_fires_hook_again() {
    let f = setup();
    let a = RecordingPeer::new(1, 10).handle();

    f.service.record_height(&a, 1);
    f.service.remove_peer(PeerId(1));
    f.service.record_height(&a, 1);

    assert_eq!(f.hook.fired(), 2);
}

// =============================================================================
// TEST GROUP: disconnecting
// =============================================================================

#[test]
fn test_removing_last_peer_notifies_exactly_once() {
    let mut f = setup();
    let a = RecordingPeer::new(1, 10).handle();
    let b = RecordingPeer::new(2, 10).handle();
    f.service.record_height(&a, 5);
    f.service.record_height(&b, 6);
    drain(&mut f.events);

    assert!(f.service.remove_peer(PeerId(1)));
    assert_eq!(f.service.status(), NetworkStatus::Ok);
    assert!(drain(&mut f.events).is_empty());

    assert!(f.service.remove_peer(PeerId(2)));
    assert!(!f.service.remove_peer(PeerId(2)));

    assert_eq!(f.service.status(), NetworkStatus::NoConnections);
    assert_eq!(drain(&mut f.events), vec![NetworkStatus::NoConnections]);
}

#[test]
fn test_remove_drops_version_too() {
    let f = setup();
    let a = RecordingPeer::new(1, 10).handle();
    f.service.record_height(&a, 5);
    f.service.record_version(&a, VersionInfo::new("1.0", 7));

    f.service.remove_peer(PeerId(1));

    assert_eq!(f.service.height_of(PeerId(1)), 0);
    assert_eq!(f.service.version_of(PeerId(1)), VersionInfo::default());
    assert!(f.service.peer_versions().is_empty());
}

#[test]
fn test_offline_since_recorded_once() {
    let f = setup();
    let a = RecordingPeer::new(1, 10).handle();
    assert_eq!(f.service.offline_since(), None);

    f.service.record_height(&a, 5);
    f.service.remove_peer(PeerId(1));
    assert_eq!(f.service.offline_since(), Some(1_000));

    f.clock.set(9_000);
    f.service.record_height(&a, 5);
    f.service.remove_peer(PeerId(1));
    assert_eq!(f.service.offline_since(), Some(1_000));

    f.service.clear_offline_since();
    assert_eq!(f.service.offline_since(), None);
}

#[test]
fn test_removing_unknown_peer_while_offline_is_quiet() {
    let mut f = setup();
    assert!(!f.service.remove_peer(PeerId(42)));
    assert!(drain(&mut f.events).is_empty());
    assert_eq!(f.service.offline_since(), None);
}

// =============================================================================
// TEST GROUP: synchronizing
// =============================================================================

#[test]
fn test_sync_round_notifies_on_finish_even_if_unchanged() {
    let mut f = setup();
    let a = RecordingPeer::new(1, 10).handle();
    f.service.record_height(&a, 5);
    drain(&mut f.events);

    f.service.begin_sync();
    assert_eq!(f.service.status(), NetworkStatus::Synchronizing);
    assert_eq!(f.service.finish_sync(), NetworkStatus::Ok);
    assert_eq!(f.service.finish_sync(), NetworkStatus::Ok);

    assert_eq!(
        drain(&mut f.events),
        vec![
            NetworkStatus::Synchronizing,
            NetworkStatus::Ok,
            NetworkStatus::Ok
        ]
    );
}

#[test]
fn test_peers_lost_during_sync() {
    let mut f = setup();
    let a = RecordingPeer::new(1, 10).handle();
    f.service.record_height(&a, 5);
    f.service.begin_sync();
    drain(&mut f.events);

    f.service.remove_peer(PeerId(1));
    assert_eq!(f.service.finish_sync(), NetworkStatus::NoConnections);

    assert_eq!(
        drain(&mut f.events),
        vec![NetworkStatus::NoConnections, NetworkStatus::NoConnections]
    );
}

#[test]
fn test_height_report_during_sync_keeps_synchronizing() {
    let f = setup();
    let a = RecordingPeer::new(1, 10).handle();
    f.service.record_height(&a, 5);
    f.service.begin_sync();

    f.service.record_height(&a, 6);

    assert_eq!(f.service.status(), NetworkStatus::Synchronizing);
    assert_eq!(f.hook.fired(), 1);
}

// =============================================================================
// TEST GROUP: queries
// =============================================================================

#[test]
fn test_up_to_date_when_registry_empty() {
    let f = setup();
    for height in [0, 1, 500, u64::MAX] {
        assert!(f.service.is_up_to_date(height));
    }
}

#[test]
fn test_up_to_date_compares_max_height() {
    let f = setup();
    f.service.record_height(&RecordingPeer::new(1, 10).handle(), 40);
    f.service.record_height(&RecordingPeer::new(2, 10).handle(), 70);

    assert_eq!(f.service.max_peer_height(), 70);
    assert!(!f.service.is_up_to_date(69));
    assert!(f.service.is_up_to_date(70));
    assert!(f.service.is_up_to_date(71));
}

#[test]
fn test_peer_heights_in_registration_order() {
    let f = setup();
    for (id, height) in [(3, 30), (1, 10), (2, 20)] {
        f.service
            .record_height(&RecordingPeer::new(id, 10).handle(), height);
    }

    assert_eq!(
        f.service.peer_heights(),
        vec![(PeerId(3), 30), (PeerId(1), 10), (PeerId(2), 20)]
    );
    assert_eq!(f.service.height_of(PeerId(1)), 10);
    assert_eq!(f.service.height_of(PeerId(9)), 0);
}

#[test]
fn test_select_sync_target_prefers_height_then_latency() {
    let f = setup();
    f.service
        .record_height(&RecordingPeer::new(1, 50).handle(), 100);
    f.service
        .record_height(&RecordingPeer::new(2, 30).handle(), 100);
    f.service.record_height(&RecordingPeer::new(3, 1).handle(), 90);

    let target = f.service.select_sync_target().unwrap();
    assert_eq!(target.peer.id(), PeerId(2));
    assert_eq!(target.height, 100);
}

#[test]
fn test_selection_tolerates_concurrent_removal() {
    let f = setup();
    let peers: Vec<_> = (1..=32).map(|id| RecordingPeer::new(id, id)).collect();
    for (i, peer) in peers.iter().enumerate() {
        f.service.record_height(&peer.handle(), 100 + i as u64);
    }

    std::thread::scope(|scope| {
        scope.spawn(|| {
            for peer in &peers {
                peer.disconnect();
                f.service.remove_peer(peer.id());
            }
        });
        scope.spawn(|| {
            for _ in 0..200 {
                if let Some(target) = f.service.select_sync_target() {
                    assert!(target.height >= 100);
                }
            }
        });
    });

    assert!(f.service.select_sync_target().is_none());
    assert_eq!(f.service.status(), NetworkStatus::NoConnections);
}
