//! # Subsystem Container
//!
//! Holds the subsystem instances and wires them together.
//!
//! ## Initialization Order
//!
//! ```text
//! Level 0: Notification hub (built by the caller, the store publishes into it)
//! Level 1: Block store (opened by recovery) → LocalChain
//! Level 2: Network status (hub, post-connect hook)
//! Level 3: Dispatcher, sync driver (status, chain, collaborators)
//! ```
//!
//! ## Thread Safety
//!
//! - All subsystems wrapped in `Arc` for shared ownership
//! - The block store sits behind the `RwLock` inside `LocalChain`
//! - The status service and dispatcher lock internally

use std::sync::Arc;

use hx_02_network_status::{NetworkStatusDependencies, NetworkStatusService, SystemTimeSource};
use hx_03_chain_sync::{
    DispatchConfig, DispatcherDependencies, MessageDispatcher, NetworkGateway, ShutdownSignal,
    SyncDriver, SyncDriverDependencies, WalletMonitor,
};
use shared_bus::{EventHub, EventPublisher};
use tracing::{info, instrument};

use crate::adapters::{Collaborators, LocalChain, MeteredGateway, NodeBlockStore};
use crate::container::config::NodeConfig;
use crate::scheduler::{PostConnectTrigger, SchedulerContext};

/// Central container holding all subsystem instances.
pub struct SubsystemContainer {
    /// Notification hub every subsystem publishes into.
    pub hub: Arc<EventHub>,

    /// Block store behind the chain ports (hx-01).
    pub chain: Arc<LocalChain>,

    /// Peer registries and status state machine (hx-02).
    pub status: Arc<NetworkStatusService>,

    /// Inbound message handling (hx-03).
    pub dispatcher: Arc<MessageDispatcher>,

    /// Chain synchronization (hx-03).
    pub driver: Arc<SyncDriver>,

    /// Network gateway with dishonest-report metrics.
    pub network: Arc<dyn NetworkGateway>,

    pub wallet: Arc<dyn WalletMonitor>,

    /// Status hook that arms the post-connect timer.
    pub post_connect: Arc<PostConnectTrigger>,
}

impl SubsystemContainer {
    #[instrument(name = "subsystem_init", skip_all)]
    pub fn new(
        config: &NodeConfig,
        hub: Arc<EventHub>,
        store: NodeBlockStore,
        collaborators: Collaborators,
        shutdown: ShutdownSignal,
    ) -> Self {
        let publisher: Arc<dyn EventPublisher> = hub.clone();

        let chain = Arc::new(LocalChain::new(store).with_pool(collaborators.pool.clone()));
        info!("  [hx-01] Block store ready");

        let post_connect = Arc::new(PostConnectTrigger::new());
        let status = Arc::new(NetworkStatusService::new(NetworkStatusDependencies {
            publisher: publisher.clone(),
            connected_hook: post_connect.clone(),
            time_source: Arc::new(SystemTimeSource),
        }));
        info!("  [hx-02] Network status initialized");

        let network: Arc<dyn NetworkGateway> =
            Arc::new(MeteredGateway::new(collaborators.network));

        let dispatcher = Arc::new(MessageDispatcher::new(
            DispatcherDependencies {
                status: status.clone(),
                chain: chain.clone(),
                validator: chain.clone(),
                applier: chain.clone(),
                pool: collaborators.pool,
                policy: collaborators.policy,
                network: network.clone(),
                wallet: collaborators.wallet.clone(),
                publisher: publisher.clone(),
            },
            DispatchConfig {
                fees: config.dispatch.fee_thresholds(),
                max_signatures: config.network.max_signatures,
            },
        ));

        let driver = Arc::new(SyncDriver::new(
            SyncDriverDependencies {
                status: status.clone(),
                chain: chain.clone(),
                synchronizer: collaborators.synchronizer,
                network: network.clone(),
                publisher,
            },
            config.network.sync_config(),
            shutdown,
        ));
        info!("  [hx-03] Dispatcher and sync driver initialized");

        Self {
            hub,
            chain,
            status,
            dispatcher,
            driver,
            network,
            wallet: collaborators.wallet,
            post_connect,
        }
    }

    pub fn scheduler_context(&self) -> SchedulerContext {
        SchedulerContext {
            status: self.status.clone(),
            chain: self.chain.clone(),
            sync: self.driver.clone(),
            network: self.network.clone(),
            wallet: self.wallet.clone(),
        }
    }
}
