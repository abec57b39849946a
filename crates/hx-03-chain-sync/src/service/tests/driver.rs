use super::*;
use crate::domain::errors::SyncError;
use crate::ports::inbound::ChainSyncApi;
use crate::ports::outbound::ChainReader;
use crate::test_utils::PeerScript;
use hx_02_network_status::NetworkStatusApi;
use shared_types::test_utils::RecordingPeer;
use shared_types::{NetworkStatus, Peer, PeerId};

fn statuses(events: Vec<NodeEvent>) -> Vec<NetworkStatus> {
    events
        .into_iter()
        .filter_map(|e| match e {
            NodeEvent::NetworkStatusChanged(status) => Some(status),
            _ => None,
        })
        .collect()
}

fn register(h: &Harness, id: u64, latency_ms: u64, height: u64) -> Arc<RecordingPeer> {
    let peer = RecordingPeer::new(id, latency_ms);
    h.status.record_height(&peer.handle(), height);
    peer
}

// =============================================================================
// TEST GROUP: target selection and progress
// =============================================================================

#[tokio::test]
async fn test_syncs_from_highest_then_fastest_peer() {
    let h = Harness::new(10);
    register(&h, 1, 50, 100);
    register(&h, 2, 30, 100);
    register(&h, 3, 5, 90);
    h.synchronizer.script(PeerId(2), PeerScript::Serve(100));
    let mut progress = h.subscribe(EventTopic::Sync);
    let driver = h.driver();

    let report = driver.update().await.unwrap();

    assert_eq!(h.synchronizer.calls(), vec![PeerId(2)]);
    assert_eq!(h.chain.height(), 100);
    assert_eq!(report.blocks_gained(), 90);
    assert_eq!(report.rounds, 1);
    assert_eq!(report.final_status, NetworkStatus::Ok);
    assert_eq!(
        drain(&mut progress),
        vec![NodeEvent::ChainSyncProgress { height: 100 }]
    );
}

#[tokio::test]
async fn test_failed_peer_is_reported_and_target_reselected() {
    let h = Harness::new(10);
    register(&h, 1, 10, 100);
    register(&h, 2, 50, 100);
    h.network.disconnect_reported(h.status.clone());
    h.synchronizer.script(
        PeerId(1),
        PeerScript::Fail(SyncError::InvalidBlock {
            peer: PeerId(1),
            height: 11,
        }),
    );
    h.synchronizer.script(PeerId(2), PeerScript::Serve(100));
    let driver = h.driver();

    let report = driver.update().await.unwrap();

    assert_eq!(h.synchronizer.calls(), vec![PeerId(1), PeerId(2)]);
    let reports = h.network.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].0, PeerId(1));
    assert_eq!(report.failed_rounds, 1);
    assert_eq!(h.chain.height(), 100);
}

#[tokio::test]
async fn test_stalled_peer_stops_after_failure_limit_without_report() {
    let h = Harness::new(10);
    register(&h, 1, 10, 100);
    h.synchronizer.script(PeerId(1), PeerScript::Stall);
    let driver = h.driver();

    let report = driver.update().await.unwrap();

    assert_eq!(report.rounds, 4);
    assert_eq!(report.failed_rounds, 4);
    assert!(h.network.reports().is_empty());
    assert_eq!(report.final_status, NetworkStatus::Ok);
    assert!(!driver.is_running());
}

#[tokio::test]
async fn test_all_targets_vanished_ends_round() {
    let h = Harness::new(10);
    let peer = register(&h, 1, 10, 100);
    peer.disconnect();
    let driver = h.driver();

    let report = driver.update().await.unwrap();

    assert_eq!(report.rounds, 0);
    assert!(h.synchronizer.calls().is_empty());
}

// =============================================================================
// TEST GROUP: status refresh
// =============================================================================

#[tokio::test]
async fn test_update_always_refreshes_status() {
    let h = Harness::new(100);
    register(&h, 1, 10, 100);
    let mut events = h.subscribe(EventTopic::Network);
    let driver = h.driver();

    assert!(driver.is_up_to_date());
    let report = driver.update().await.unwrap();

    assert_eq!(report.rounds, 0);
    assert_eq!(
        statuses(drain(&mut events)),
        vec![NetworkStatus::Synchronizing, NetworkStatus::Ok]
    );
}

#[tokio::test]
async fn test_update_without_peers_ends_in_no_connections() {
    let h = Harness::new(3);
    let mut events = h.subscribe(EventTopic::Network);
    let driver = h.driver();

    let report = driver.update().await.unwrap();

    assert_eq!(report.final_status, NetworkStatus::NoConnections);
    assert_eq!(
        statuses(drain(&mut events)),
        vec![NetworkStatus::Synchronizing, NetworkStatus::NoConnections]
    );
}

#[tokio::test]
async fn test_is_up_to_date_tracks_local_height() {
    let h = Harness::new(5);
    let driver = h.driver();
    assert!(driver.is_up_to_date());

    register(&h, 1, 10, 6);
    assert!(!driver.is_up_to_date());

    h.chain.extend_to(6);
    assert!(driver.is_up_to_date());
}

// =============================================================================
// TEST GROUP: concurrency and shutdown
// =============================================================================

#[tokio::test]
async fn test_second_update_while_running_is_refused() {
    let h = Harness::new(0);
    register(&h, 1, 10, 20);
    h.synchronizer
        .script(PeerId(1), PeerScript::Slow(Duration::from_millis(50), 20));
    let driver = Arc::new(h.driver());

    let background = {
        let driver = driver.clone();
        tokio::spawn(async move { driver.update().await })
    };
    while !driver.is_running() {
        tokio::task::yield_now().await;
    }

    assert_eq!(driver.update().await, Err(SyncError::AlreadyRunning));

    let report = background.await.unwrap().unwrap();
    assert_eq!(report.end_height, 20);
    assert!(!driver.is_running());
}

#[tokio::test]
async fn test_shutdown_interrupts_between_steps() {
    let h = Harness::new(0);
    register(&h, 1, 10, 20);
    h.synchronizer
        .script(PeerId(1), PeerScript::Slow(Duration::from_millis(100), 20));
    let driver = Arc::new(h.driver());

    let background = {
        let driver = driver.clone();
        tokio::spawn(async move { driver.update().await })
    };
    while !driver.is_running() {
        tokio::task::yield_now().await;
    }
    h.trigger.trigger();

    let report = background.await.unwrap().unwrap();
    assert!(report.interrupted);
    assert_eq!(h.chain.height(), 0);
    assert!(h.network.reports().is_empty());
    assert_eq!(h.status.status(), NetworkStatus::Ok);
}

#[tokio::test]
async fn test_update_after_shutdown_does_nothing() {
    let h = Harness::new(0);
    register(&h, 1, 10, 20);
    h.synchronizer.script(PeerId(1), PeerScript::Serve(20));
    h.trigger.trigger();
    let driver = h.driver();

    let report = driver.update().await.unwrap();

    assert!(report.interrupted);
    assert_eq!(report.rounds, 0);
    assert!(h.synchronizer.calls().is_empty());
}
