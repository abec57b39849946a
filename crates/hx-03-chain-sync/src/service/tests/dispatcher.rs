use super::*;
use crate::domain::fees::FeeThresholds;
use crate::domain::outcome::DispatchOutcome;
use crate::ports::inbound::MessageDispatch;
use crate::test_utils::{make_block, make_transaction};
use hx_02_network_status::NetworkStatusApi;
use shared_types::test_utils::RecordingPeer;
use shared_types::{
    BlockSignature, InboundMessage, Message, MessagePayload, NetworkStatus, Peer, PeerId,
    TransactionType,
};

fn request(peer: &Arc<RecordingPeer>, id: u32, payload: MessagePayload) -> InboundMessage {
    InboundMessage::new(
        peer.handle(),
        Message {
            correlation_id: Some(id),
            payload,
        },
    )
}

fn unsolicited(peer: &Arc<RecordingPeer>, payload: MessagePayload) -> InboundMessage {
    InboundMessage::new(peer.handle(), Message::new(payload))
}

fn cheap_fees() -> DispatchConfig {
    DispatchConfig {
        fees: FeeThresholds {
            min_fee: 10,
            min_fee_per_byte: 0,
        },
        ..DispatchConfig::default()
    }
}

// =============================================================================
// TEST GROUP: request / reply
// =============================================================================

#[test]
fn test_ping_gets_pong_with_same_correlation_id() {
    let h = Harness::new(0);
    let dispatcher = h.dispatcher(DispatchConfig::default());
    let peer = RecordingPeer::new(1, 10);

    let outcome = dispatcher.dispatch(request(&peer, 77, MessagePayload::Ping));

    assert_eq!(outcome, DispatchOutcome::Replied);
    assert_eq!(
        peer.sent(),
        vec![Message {
            correlation_id: Some(77),
            payload: MessagePayload::Pong
        }]
    );
}

#[test]
fn test_get_signatures_walks_from_parent() {
    let h = Harness::new(5);
    let dispatcher = h.dispatcher(DispatchConfig {
        max_signatures: 2,
        ..DispatchConfig::default()
    });
    let peer = RecordingPeer::new(1, 10);
    let genesis = h.chain.block_at(1);

    dispatcher.dispatch(request(
        &peer,
        3,
        MessagePayload::GetSignatures {
            parent: genesis.signature,
        },
    ));

    let sent = peer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].correlation_id, Some(3));
    assert_eq!(
        sent[0].payload,
        MessagePayload::Signatures {
            signatures: vec![h.chain.block_at(2).signature, h.chain.block_at(3).signature]
        }
    );
}

#[test]
fn test_get_block_known_and_unknown() {
    let h = Harness::new(2);
    let dispatcher = h.dispatcher(DispatchConfig::default());
    let peer = RecordingPeer::new(1, 10);
    let known = h.chain.block_at(2);

    dispatcher.dispatch(request(
        &peer,
        1,
        MessagePayload::GetBlock {
            signature: known.signature,
        },
    ));
    dispatcher.dispatch(request(
        &peer,
        2,
        MessagePayload::GetBlock {
            signature: BlockSignature([0xEE; 64]),
        },
    ));

    assert_eq!(
        peer.sent_payloads(),
        vec![
            MessagePayload::BlockResponse {
                block: Some(Box::new(known))
            },
            MessagePayload::BlockResponse { block: None },
        ]
    );
}

#[test]
fn test_reply_to_disconnected_peer_is_absorbed() {
    let h = Harness::new(0);
    let dispatcher = h.dispatcher(DispatchConfig::default());
    let peer = RecordingPeer::new(1, 10);
    peer.disconnect();

    assert_eq!(
        dispatcher.dispatch(request(&peer, 1, MessagePayload::Ping)),
        DispatchOutcome::Failed
    );
}

#[test]
fn test_unsolicited_responses_are_ignored() {
    let h = Harness::new(0);
    let dispatcher = h.dispatcher(DispatchConfig::default());
    let peer = RecordingPeer::new(1, 10);

    assert_eq!(
        dispatcher.dispatch(unsolicited(&peer, MessagePayload::Pong)),
        DispatchOutcome::Ignored
    );
    assert!(peer.sent().is_empty());
    assert_eq!(h.status.peer_count(), 0);
}

// =============================================================================
// TEST GROUP: height and version
// =============================================================================

#[test]
fn test_height_and_version_update_registries() {
    let h = Harness::new(0);
    let dispatcher = h.dispatcher(DispatchConfig::default());
    let peer = RecordingPeer::new(4, 10);

    dispatcher.dispatch(unsolicited(&peer, MessagePayload::Height { height: 42 }));
    dispatcher.dispatch(unsolicited(
        &peer,
        MessagePayload::Version {
            version: "0.26.2".into(),
            build_timestamp: 99,
        },
    ));

    assert_eq!(h.status.height_of(PeerId(4)), 42);
    assert_eq!(h.status.version_of(PeerId(4)).build_timestamp, 99);
    assert_eq!(h.status.status(), NetworkStatus::Ok);
}

// =============================================================================
// TEST GROUP: blocks
// =============================================================================

#[test]
fn test_valid_block_is_applied_and_relayed_except_sender() {
    let h = Harness::new(3);
    let dispatcher = h.dispatcher(DispatchConfig::default());
    let sender = RecordingPeer::new(1, 10);
    let other = RecordingPeer::new(2, 10);
    h.network.add_peer(sender.handle());
    h.network.add_peer(other.handle());
    let tip = h.chain.block_at(3);
    let block = make_block(4, tip.signature, 0);

    let outcome = dispatcher.dispatch(unsolicited(
        &sender,
        MessagePayload::Block {
            block: Box::new(block.clone()),
            height: 4,
        },
    ));

    assert_eq!(outcome, DispatchOutcome::BlockRelayed { peers: 1 });
    assert_eq!(h.chain.applied(), vec![block.signature]);
    assert_eq!(h.status.height_of(sender.id()), 4);
    let broadcasts = h.network.broadcasts();
    assert_eq!(broadcasts.len(), 1);
    assert_eq!(broadcasts[0].1, vec![sender.id()]);
}

#[test]
fn test_invalid_block_is_neither_recorded_nor_applied() {
    let h = Harness::new(3);
    let dispatcher = h.dispatcher(DispatchConfig::default());
    h.chain.set_valid(false);
    let sender = RecordingPeer::new(1, 10);

    let outcome = dispatcher.dispatch(unsolicited(
        &sender,
        MessagePayload::Block {
            block: Box::new(make_block(9, BlockSignature::ZERO, 1)),
            height: 9,
        },
    ));

    assert_eq!(outcome, DispatchOutcome::BlockNotApplied);
    assert!(h.chain.applied().is_empty());
    assert_eq!(h.status.height_of(sender.id()), 0);
    assert!(h.network.broadcasts().is_empty());
}

#[test]
fn test_block_during_wallet_resync_records_height_only() {
    let h = Harness::new(3);
    let dispatcher = h.dispatcher(DispatchConfig::default());
    h.wallet.set_resyncing(true);
    let sender = RecordingPeer::new(1, 10);
    let block = make_block(4, h.chain.block_at(3).signature, 0);

    let outcome = dispatcher.dispatch(unsolicited(
        &sender,
        MessagePayload::Block {
            block: Box::new(block),
            height: 4,
        },
    ));

    assert_eq!(outcome, DispatchOutcome::BlockDeferred);
    assert_eq!(h.status.height_of(sender.id()), 4);
    assert!(h.chain.applied().is_empty());
    assert!(h.network.broadcasts().is_empty());
}

#[test]
fn test_block_not_newly_accepted_is_not_relayed() {
    let h = Harness::new(3);
    let dispatcher = h.dispatcher(DispatchConfig::default());
    h.chain.set_accept(false);
    let sender = RecordingPeer::new(1, 10);

    let outcome = dispatcher.dispatch(unsolicited(
        &sender,
        MessagePayload::Block {
            block: Box::new(make_block(4, h.chain.block_at(3).signature, 0)),
            height: 4,
        },
    ));

    assert_eq!(outcome, DispatchOutcome::BlockNotApplied);
    assert_eq!(h.chain.applied().len(), 1);
    assert!(h.network.broadcasts().is_empty());
}

// =============================================================================
// TEST GROUP: transactions
// =============================================================================

#[test]
fn test_invalid_signature_reported_once_and_dropped() {
    let h = Harness::new(0);
    let dispatcher = h.dispatcher(cheap_fees());
    h.policy.set_valid(false);
    let sender = RecordingPeer::new(1, 10);
    let mut events = h.subscribe(EventTopic::Transactions);

    let outcome = dispatcher.dispatch(unsolicited(
        &sender,
        MessagePayload::Transaction(Box::new(make_transaction(TransactionType::Payment, 50))),
    ));

    assert_eq!(outcome, DispatchOutcome::Dishonest);
    assert_eq!(h.network.reports().len(), 1);
    assert_eq!(h.network.reports()[0].0, sender.id());
    assert!(h.pool.admitted().is_empty());
    assert!(h.network.broadcasts().is_empty());
    assert!(drain(&mut events).is_empty());
}

#[test]
fn test_genesis_transaction_from_peer_is_dishonest() {
    let h = Harness::new(0);
    let dispatcher = h.dispatcher(cheap_fees());
    let sender = RecordingPeer::new(1, 10);

    let outcome = dispatcher.dispatch(unsolicited(
        &sender,
        MessagePayload::Transaction(Box::new(make_transaction(TransactionType::Genesis, 50))),
    ));

    assert_eq!(outcome, DispatchOutcome::Dishonest);
    assert_eq!(h.network.reports().len(), 1);
    assert!(h.pool.admitted().is_empty());
}

#[test]
fn test_valid_transaction_admitted_notified_and_relayed() {
    let h = Harness::new(0);
    let dispatcher = h.dispatcher(cheap_fees());
    let sender = RecordingPeer::new(1, 10);
    let other = RecordingPeer::new(2, 10);
    h.network.add_peer(sender.handle());
    h.network.add_peer(other.handle());
    let mut events = h.subscribe(EventTopic::Transactions);
    let tx = make_transaction(TransactionType::Payment, 50);

    let outcome = dispatcher.dispatch(unsolicited(
        &sender,
        MessagePayload::Transaction(Box::new(tx.clone())),
    ));

    assert_eq!(outcome, DispatchOutcome::TransactionAdmitted { peers: 1 });
    assert_eq!(h.pool.admitted(), vec![tx.clone()]);
    assert_eq!(drain(&mut events), vec![NodeEvent::TransactionAdded(Arc::new(tx))]);
    assert_eq!(h.network.broadcasts()[0].1, vec![sender.id()]);
    assert!(h.network.reports().is_empty());
}

#[test]
fn test_low_fee_or_confirmed_transaction_is_dropped_quietly() {
    let h = Harness::new(0);
    let dispatcher = h.dispatcher(cheap_fees());
    let sender = RecordingPeer::new(1, 10);

    let cheap = make_transaction(TransactionType::Payment, 9);
    assert_eq!(
        dispatcher.dispatch(unsolicited(&sender, MessagePayload::Transaction(Box::new(cheap)))),
        DispatchOutcome::TransactionDropped
    );

    let confirmed = make_transaction(TransactionType::Payment, 50);
    h.pool.confirm(confirmed.signature);
    assert_eq!(
        dispatcher.dispatch(unsolicited(
            &sender,
            MessagePayload::Transaction(Box::new(confirmed))
        )),
        DispatchOutcome::TransactionDropped
    );

    assert!(h.pool.admitted().is_empty());
    assert!(h.network.reports().is_empty());
    assert!(h.network.broadcasts().is_empty());
}

// =============================================================================
// TEST GROUP: serialization and close
// =============================================================================

#[test]
fn test_closed_dispatcher_rejects_messages() {
    let h = Harness::new(0);
    let dispatcher = h.dispatcher(DispatchConfig::default());
    let peer = RecordingPeer::new(1, 10);

    dispatcher.close();

    assert!(!dispatcher.is_accepting());
    assert_eq!(
        dispatcher.dispatch(unsolicited(&peer, MessagePayload::Height { height: 3 })),
        DispatchOutcome::Closed
    );
    assert_eq!(h.status.peer_count(), 0);
}

#[test]
fn test_concurrent_dispatch_keeps_every_update() {
    let h = Harness::new(0);
    let dispatcher = h.dispatcher(DispatchConfig::default());
    let peers: Vec<_> = (1..=8).map(|id| RecordingPeer::new(id, 10)).collect();

    std::thread::scope(|scope| {
        for peer in &peers {
            let dispatcher = &dispatcher;
            scope.spawn(move || {
                for height in 1..=50 {
                    dispatcher.dispatch(unsolicited(peer, MessagePayload::Height { height }));
                    dispatcher.dispatch(request(peer, height as u32, MessagePayload::Ping));
                }
            });
        }
    });

    for peer in &peers {
        assert_eq!(h.status.height_of(peer.id()), 50);
        assert_eq!(peer.sent().len(), 50);
    }
    assert_eq!(h.status.status(), NetworkStatus::Ok);
}
