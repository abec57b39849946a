//! # Standalone Collaborators
//!
//! Implementations of the chain-sync collaborator ports for a node that runs
//! without a wallet, a forging engine or a block transport attached. The
//! host replaces any of them through [`Collaborators`].

use async_trait::async_trait;
use hx_03_chain_sync::{
    NetworkGateway, ShutdownSignal, SyncError, Synchronizer, TransactionPolicy, UnconfirmedPool,
    WalletMonitor,
};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use shared_types::{
    Block, Message, PeerId, PeerRef, Transaction, TransactionSignature, TransactionType,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// External collaborators the node is built with.
pub struct Collaborators {
    pub network: Arc<dyn NetworkGateway>,
    pub wallet: Arc<dyn WalletMonitor>,
    pub pool: Arc<dyn UnconfirmedPool>,
    pub policy: Arc<dyn TransactionPolicy>,
    pub synchronizer: Arc<dyn Synchronizer>,
}

impl Collaborators {
    /// Collaborators for a node with no attached services. The returned
    /// [`ConnectedPeers`] is the network gateway, for the host to fill.
    pub fn standalone() -> (Self, Arc<ConnectedPeers>) {
        let peers = Arc::new(ConnectedPeers::new());
        let collaborators = Self {
            network: peers.clone(),
            wallet: Arc::new(IdleWallet),
            pool: Arc::new(MemoryPool::new()),
            policy: Arc::new(StructuralSignaturePolicy),
            synchronizer: Arc::new(DetachedSynchronizer),
        };
        (collaborators, peers)
    }
}

// =============================================================================
// NETWORK
// =============================================================================

/// Network gateway over the set of connections the host registered.
///
/// Dishonest reports are remembered and logged; dropping the connection is
/// left to whoever owns it.
#[derive(Debug, Default)]
pub struct ConnectedPeers {
    peers: RwLock<IndexMap<PeerId, PeerRef>>,
    dishonest: Mutex<Vec<(PeerId, String)>>,
}

impl ConnectedPeers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, peer: PeerRef) {
        self.peers.write().insert(peer.id(), peer);
    }

    pub fn remove(&self, peer: PeerId) -> Option<PeerRef> {
        self.peers.write().shift_remove(&peer)
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }

    /// Every report made so far, oldest first.
    pub fn dishonest_reports(&self) -> Vec<(PeerId, String)> {
        self.dishonest.lock().clone()
    }
}

impl NetworkGateway for ConnectedPeers {
    fn broadcast(&self, message: Message, exclude: &[PeerId]) -> usize {
        let targets: Vec<PeerRef> = self
            .peers
            .read()
            .values()
            .filter(|peer| !exclude.contains(&peer.id()))
            .cloned()
            .collect();

        let mut sent = 0;
        for peer in targets {
            match peer.send(message.clone()) {
                Ok(()) => sent += 1,
                Err(e) => debug!(peer = %peer.id(), error = %e, "Broadcast send failed"),
            }
        }
        sent
    }

    fn report_dishonest(&self, peer: PeerId, reason: &str) {
        warn!(peer = %peer, reason, "Peer reported as dishonest");
        self.dishonest.lock().push((peer, reason.to_string()));
    }

    fn active_peers(&self) -> Vec<PeerRef> {
        self.peers.read().values().cloned().collect()
    }
}

// =============================================================================
// WALLET
// =============================================================================

/// Wallet that is never behind and never rescanning.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdleWallet;

impl WalletMonitor for IdleWallet {
    fn is_resync_in_progress(&self) -> bool {
        false
    }

    fn needs_resync(&self) -> bool {
        false
    }

    fn request_resync(&self) {
        debug!("Wallet resync requested but no wallet is attached");
    }
}

// =============================================================================
// UNCONFIRMED POOL
// =============================================================================

/// In-memory unconfirmed transaction pool.
#[derive(Debug, Default)]
pub struct MemoryPool {
    pending: Mutex<IndexMap<TransactionSignature, Transaction>>,
    confirmed: Mutex<HashSet<TransactionSignature>>,
}

impl MemoryPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    pub fn contains(&self, signature: &TransactionSignature) -> bool {
        self.pending.lock().contains_key(signature)
    }

    /// Pending transactions in admission order.
    pub fn pending(&self) -> Vec<Transaction> {
        self.pending.lock().values().cloned().collect()
    }
}

impl UnconfirmedPool for MemoryPool {
    fn is_confirmed(&self, tx: &Transaction) -> bool {
        self.confirmed.lock().contains(&tx.signature)
    }

    fn admit(&self, tx: Transaction) {
        self.pending.lock().entry(tx.signature).or_insert(tx);
    }

    fn confirm_block(&self, block: &Block) {
        let mut pending = self.pending.lock();
        let mut confirmed = self.confirmed.lock();
        for tx in &block.transactions {
            pending.shift_remove(&tx.signature);
            confirmed.insert(tx.signature);
        }
    }
}

// =============================================================================
// TRANSACTION POLICY
// =============================================================================

/// Checks the shape of a transaction signature, not its cryptography.
///
/// Rejects all-zero signatures and anything that claims the genesis type.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralSignaturePolicy;

impl TransactionPolicy for StructuralSignaturePolicy {
    fn is_signature_valid(&self, tx: &Transaction) -> bool {
        tx.tx_type != TransactionType::Genesis && tx.signature.0.iter().any(|b| *b != 0)
    }
}

// =============================================================================
// SYNCHRONIZER
// =============================================================================

/// Synchronizer for a node with no block transport. Every attempt fails, so
/// the driver reports the peer and eventually gives up.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedSynchronizer;

#[async_trait]
impl Synchronizer for DetachedSynchronizer {
    async fn synchronize(
        &self,
        peer: PeerRef,
        shutdown: ShutdownSignal,
    ) -> Result<u64, SyncError> {
        if shutdown.is_shutdown() {
            return Err(SyncError::Interrupted);
        }
        info!(peer = %peer.id(), "No block transport attached, cannot synchronize");
        Err(SyncError::Unresponsive {
            peer: peer.id(),
            reason: "no block transport attached".to_string(),
        })
    }
}
