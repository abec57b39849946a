//! # Chain Sync Service Tests

mod dispatcher;
mod driver;

use super::*;
use crate::domain::shutdown::{ShutdownSignal, ShutdownTrigger};
use crate::test_utils::{MockChain, MockNetwork, MockPolicy, MockPool, MockSynchronizer, MockWallet};
use hx_02_network_status::test_utils::{CountingHook, FixedTimeSource};
use hx_02_network_status::{NetworkStatusDependencies, NetworkStatusService};
use shared_bus::{EventFilter, EventHub, EventTopic, NodeEvent, Subscription};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    hub: Arc<EventHub>,
    status: Arc<NetworkStatusService>,
    chain: Arc<MockChain>,
    network: Arc<MockNetwork>,
    pool: Arc<MockPool>,
    policy: Arc<MockPolicy>,
    wallet: Arc<MockWallet>,
    synchronizer: Arc<MockSynchronizer>,
    trigger: ShutdownTrigger,
    signal: ShutdownSignal,
}

impl Harness {
    fn new(local_height: u64) -> Self {
        let hub = Arc::new(EventHub::new());
        let status = Arc::new(NetworkStatusService::new(NetworkStatusDependencies {
            publisher: hub.clone(),
            connected_hook: Arc::new(CountingHook::default()),
            time_source: Arc::new(FixedTimeSource::new(0)),
        }));
        let chain = MockChain::with_height(local_height);
        let (trigger, signal) = ShutdownTrigger::new();
        Self {
            hub,
            status,
            synchronizer: MockSynchronizer::new(chain.clone()),
            chain,
            network: MockNetwork::new(),
            pool: MockPool::new(),
            policy: MockPolicy::accepting(),
            wallet: MockWallet::new(),
            trigger,
            signal,
        }
    }

    fn dispatcher(&self, config: DispatchConfig) -> MessageDispatcher {
        MessageDispatcher::new(
            DispatcherDependencies {
                status: self.status.clone(),
                chain: self.chain.clone(),
                validator: self.chain.clone(),
                applier: self.chain.clone(),
                pool: self.pool.clone(),
                policy: self.policy.clone(),
                network: self.network.clone(),
                wallet: self.wallet.clone(),
                publisher: self.hub.clone(),
            },
            config,
        )
    }

    fn driver(&self) -> SyncDriver {
        SyncDriver::new(
            SyncDriverDependencies {
                status: self.status.clone(),
                chain: self.chain.clone(),
                synchronizer: self.synchronizer.clone(),
                network: self.network.clone(),
                publisher: self.hub.clone(),
            },
            SyncConfig {
                retry_delay: Duration::from_millis(1),
                max_failed_rounds: 4,
            },
            self.signal.clone(),
        )
    }

    fn subscribe(&self, topic: EventTopic) -> Subscription {
        let mut sub = self.hub.subscribe(EventFilter::topics(vec![topic]));
        if topic == EventTopic::Network {
            // discard the synthetic current-status event
            let _ = sub.try_recv();
        }
        sub
    }
}

fn drain(sub: &mut Subscription) -> Vec<NodeEvent> {
    let mut events = Vec::new();
    while let Ok(Some(event)) = sub.try_recv() {
        events.push(event);
    }
    events
}
