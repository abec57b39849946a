//! # Node
//!
//! The core object the network layer and the API layer talk to. It owns the
//! subsystem container, the data directory lock and the scheduled tasks.
//!
//! ## Lifecycle
//!
//! 1. [`Node::start`]: validate config, lock the data directory, open the
//!    block store with recovery, build the subsystems, spawn the tasks.
//! 2. Connection hooks and queries, from any thread.
//! 3. [`Node::stop_all`]: close the dispatcher, signal shutdown, wait for
//!    the tasks, flush and checkpoint the store.

use crate::adapters::Collaborators;
use crate::container::{ConfigError, NodeConfig, SubsystemContainer};
use crate::recovery::{
    Checkpoint, DataDirLock, DirectoryCheckpoint, RecoveryError, RecoveryOutcome, StoreOpener,
};
use crate::scheduler::{self, record_sync};
use hx_01_block_store::StoreError;
use hx_02_network_status::NetworkStatusApi;
use hx_03_chain_sync::{
    ChainReader, ChainSyncApi, DispatchOutcome, MessageDispatch, ShutdownTrigger, SyncError,
    SyncReport,
};
use node_telemetry::metric_inc;
use node_telemetry::metrics::{HistogramTimer, DISPATCH_DURATION, MESSAGES_DISPATCHED};
use parking_lot::Mutex;
use shared_bus::{
    EventFilter, EventHub, EventPublisher, NodeEvent, Subscription, SubscriptionId,
};
use shared_types::{
    Block, BlockSignature, ForgingStatus, InboundMessage, Message, MessagePayload, NetworkStatus,
    PeerId, PeerRef, VersionInfo,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Recovery(#[from] RecoveryError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A running Helix node.
pub struct Node {
    config: NodeConfig,
    container: SubsystemContainer,
    version: VersionInfo,
    forging: Mutex<ForgingStatus>,
    shutdown: ShutdownTrigger,
    stopped: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    checkpoint: Option<DirectoryCheckpoint>,
    recovery: RecoveryOutcome,
    _lock: DataDirLock,
}

impl Node {
    /// Open storage, build the subsystems and spawn the scheduled tasks.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: NodeConfig, collaborators: Collaborators) -> Result<Arc<Self>, NodeError> {
        config.validate()?;
        info!(
            data_dir = %config.storage.data_dir.display(),
            backend = ?config.storage.backend,
            checkpointing = config.storage.checkpointing,
            "Starting Helix node"
        );

        let lock = DataDirLock::acquire(&config.storage.data_dir)?;
        let hub = Arc::new(EventHub::new());

        let checkpoint = config
            .storage
            .checkpointing
            .then(|| DirectoryCheckpoint::new(config.storage.backup_dir()));
        let opener = StoreOpener {
            backend: config.storage.backend,
            chain_dir: config.storage.chain_dir(),
            publisher: hub.clone(),
        };
        let (store, recovery) = opener
            .open_with_recovery(checkpoint.as_ref().map(|c| c as &dyn Checkpoint))?;

        let (shutdown, signal) = ShutdownTrigger::new();
        let container = SubsystemContainer::new(&config, hub, store, collaborators, signal);

        let node = Arc::new(Self {
            version: VersionInfo::new(
                config.network.version.clone(),
                config.network.build_timestamp,
            ),
            config,
            container,
            forging: Mutex::new(ForgingStatus::default()),
            shutdown,
            stopped: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
            checkpoint,
            recovery,
            _lock: lock,
        });
        node.spawn_tasks();

        info!(
            height = node.height(),
            recovery = ?node.recovery,
            "All subsystems initialized and running"
        );
        Ok(node)
    }

    fn spawn_tasks(&self) {
        let ctx = self.container.scheduler_context();
        let network = &self.config.network;
        let signal = self.shutdown.signal();
        let events = self.container.hub.subscribe(EventFilter::all());

        let handles = vec![
            tokio::spawn(scheduler::run_post_connect(
                ctx.clone(),
                self.container.post_connect.clone(),
                network.connection_timeout(),
                signal.clone(),
            )),
            tokio::spawn(scheduler::run_height_broadcast(
                ctx.clone(),
                network.height_broadcast_interval(),
                signal.clone(),
            )),
            tokio::spawn(scheduler::run_sync_check(
                ctx.clone(),
                network.sync_check_interval(),
                signal.clone(),
            )),
            tokio::spawn(scheduler::run_metrics(ctx, events, signal)),
        ];
        self.tasks.lock().extend(handles);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.stopped.load(Ordering::SeqCst) || self.shutdown.is_triggered()
    }

    // =========================================================================
    // CONNECTION HOOKS
    // =========================================================================

    /// A connection was established: send our version and height.
    pub fn on_connect(&self, peer: &PeerRef) {
        if self.is_shutting_down() {
            debug!(peer = %peer.id(), "Ignoring connection during shutdown");
            return;
        }

        let handshake = [
            MessagePayload::Version {
                version: self.version.version.clone(),
                build_timestamp: self.version.build_timestamp,
            },
            MessagePayload::Height {
                height: self.height(),
            },
        ];
        for payload in handshake {
            if let Err(e) = peer.send(Message::new(payload)) {
                debug!(peer = %peer.id(), error = %e, "Handshake send failed");
                return;
            }
        }
        debug!(peer = %peer.id(), "Handshake sent");
    }

    pub fn on_disconnect(&self, peer: PeerId) {
        if self.container.status.remove_peer(peer) {
            debug!(peer = %peer, "Peer removed");
        }
    }

    /// A connection failed. Treated like a disconnect.
    pub fn on_error(&self, peer: PeerId, error: &str) {
        warn!(peer = %peer, error, "Connection error");
        self.on_disconnect(peer);
    }

    /// Single entry point for decoded inbound messages.
    pub fn on_message(&self, message: InboundMessage) -> DispatchOutcome {
        let kind = message.payload().kind();
        let _timer = HistogramTimer::new(&DISPATCH_DURATION);
        let outcome = self.container.dispatcher.dispatch(message);
        metric_inc!(MESSAGES_DISPATCHED, &[kind, outcome.label()]);
        outcome
    }

    // =========================================================================
    // STATUS QUERIES
    // =========================================================================

    pub fn status(&self) -> NetworkStatus {
        self.container.status.status()
    }

    pub fn max_peer_height(&self) -> u64 {
        self.container.status.max_peer_height()
    }

    pub fn peer_heights(&self) -> Vec<(PeerId, u64)> {
        self.container.status.peer_heights()
    }

    /// No peer reports a height above ours.
    pub fn is_up_to_date(&self) -> bool {
        self.container.driver.is_up_to_date()
    }

    /// Reported height of `peer`, 0 when unknown.
    pub fn height_of_peer(&self, peer: PeerId) -> u64 {
        self.container.status.height_of(peer)
    }

    /// Reported version of `peer`, empty when unknown.
    pub fn version_of_peer(&self, peer: PeerId) -> VersionInfo {
        self.container.status.version_of(peer)
    }

    pub fn peer_versions(&self) -> Vec<(PeerId, VersionInfo)> {
        self.container.status.peer_versions()
    }

    /// When the last peer went away, in Unix milliseconds.
    pub fn offline_since(&self) -> Option<u64> {
        self.container.status.offline_since()
    }

    pub fn forging_status(&self) -> ForgingStatus {
        *self.forging.lock()
    }

    pub fn recovery_outcome(&self) -> RecoveryOutcome {
        self.recovery
    }

    // =========================================================================
    // CHAIN QUERIES
    // =========================================================================

    pub fn height(&self) -> u64 {
        self.container.chain.height()
    }

    pub fn last_block(&self) -> Result<Option<Block>, StoreError> {
        self.container.chain.last_block()
    }

    pub fn block(&self, signature: &BlockSignature) -> Result<Option<Block>, StoreError> {
        self.container.chain.block(signature)
    }

    pub fn block_by_height(&self, height: u64) -> Result<Option<Block>, StoreError> {
        self.container.chain.block_by_height(height)
    }

    /// Up to `count` blocks ending at the tip, highest first.
    pub fn last_blocks(&self, count: u64) -> Result<Vec<Block>, StoreError> {
        self.container.chain.last_blocks(count)
    }

    // =========================================================================
    // NOTIFICATIONS
    // =========================================================================

    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        self.container.hub.subscribe(filter)
    }

    /// Idempotent.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.container.hub.unsubscribe(id)
    }

    pub fn forging_status_changed(&self, status: ForgingStatus) {
        *self.forging.lock() = status;
        self.container
            .hub
            .publish(NodeEvent::ForgingStatusChanged(status));
    }

    pub fn wallet_sync_progress(&self, height: u64) {
        self.container
            .hub
            .publish(NodeEvent::WalletSyncProgress { height });
    }

    // =========================================================================
    // SYNCHRONIZATION AND SHUTDOWN
    // =========================================================================

    /// Synchronize with the best peers until caught up.
    pub async fn update(&self) -> Result<SyncReport, SyncError> {
        let result = self.container.driver.update().await;
        record_sync(&result, self.is_up_to_date());
        result
    }

    /// Stop accepting messages, stop the tasks and persist the store.
    ///
    /// An in-flight dispatch or sync step finishes first. Later calls are
    /// no-ops.
    pub async fn stop_all(&self) -> Result<(), NodeError> {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        info!("Initiating graceful shutdown...");

        let dispatcher = self.container.dispatcher.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || dispatcher.close()).await {
            warn!(error = %e, "Dispatcher close did not complete");
        }

        self.shutdown.trigger();
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Scheduled task ended abnormally");
            }
        }

        let chain = &self.container.chain;
        chain.flush()?;
        match &self.checkpoint {
            Some(_) if chain.is_processing() => {
                warn!("Block store is mid-update, keeping the previous checkpoint");
            }
            Some(checkpoint) => checkpoint.save(&self.config.storage.chain_dir())?,
            None => {}
        }

        info!(height = chain.height(), "Shutdown complete");
        Ok(())
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn container(&self) -> &SubsystemContainer {
        &self.container
    }
}
