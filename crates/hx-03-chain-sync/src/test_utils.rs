//! Mock collaborators recording every call.

use crate::domain::errors::{ChainError, SyncError};
use crate::domain::shutdown::ShutdownSignal;
use crate::ports::outbound::{
    ChainApplier, ChainReader, ChainValidator, NetworkGateway, Synchronizer, TransactionPolicy,
    UnconfirmedPool, WalletMonitor,
};
use async_trait::async_trait;
use hx_02_network_status::NetworkStatusApi;
use parking_lot::Mutex;
use shared_types::{
    Block, BlockSignature, Message, PeerId, PeerRef, Transaction, TransactionSignature,
    TransactionType, SIGNATURE_LENGTH,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Block whose signature is derived from its height and a salt.
pub fn make_block(height: u64, parent: BlockSignature, salt: u8) -> Block {
    let mut signature = [salt; SIGNATURE_LENGTH];
    signature[..8].copy_from_slice(&height.to_be_bytes());
    Block {
        signature: BlockSignature(signature),
        parent,
        height,
        timestamp: 1_700_000_000_000 + height * 60_000,
        transactions: Vec::new(),
    }
}

pub fn make_transaction(tx_type: TransactionType, fee: u64) -> Transaction {
    Transaction {
        signature: TransactionSignature([7; SIGNATURE_LENGTH]),
        tx_type,
        fee,
        timestamp: 1_700_000_000_000,
        data: vec![1, 2, 3],
    }
}

// =============================================================================
// Chain
// =============================================================================

/// Linear in-memory chain with switchable validity and acceptance.
#[derive(Debug)]
pub struct MockChain {
    blocks: Mutex<Vec<Block>>,
    valid: AtomicBool,
    accept: AtomicBool,
    applied: Mutex<Vec<BlockSignature>>,
}

impl MockChain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            blocks: Mutex::new(Vec::new()),
            valid: AtomicBool::new(true),
            accept: AtomicBool::new(true),
            applied: Mutex::new(Vec::new()),
        })
    }

    /// Chain already holding `height` blocks.
    pub fn with_height(height: u64) -> Arc<Self> {
        let chain = Self::new();
        chain.extend_to(height);
        chain
    }

    /// Append synthetic blocks until the tip reaches `height`.
    pub fn extend_to(&self, height: u64) {
        let mut blocks = self.blocks.lock();
        while (blocks.len() as u64) < height {
            let parent = blocks
                .last()
                .map(|b| b.signature)
                .unwrap_or(BlockSignature::ZERO);
            let next = blocks.len() as u64 + 1;
            blocks.push(make_block(next, parent, 0));
        }
    }

    /// Block at `height`. Panics when the chain is shorter.
    pub fn block_at(&self, height: u64) -> Block {
        self.blocks.lock()[height as usize - 1].clone()
    }

    pub fn tip(&self) -> Option<Block> {
        self.blocks.lock().last().cloned()
    }

    pub fn set_valid(&self, valid: bool) {
        self.valid.store(valid, Ordering::SeqCst);
    }

    pub fn set_accept(&self, accept: bool) {
        self.accept.store(accept, Ordering::SeqCst);
    }

    pub fn applied(&self) -> Vec<BlockSignature> {
        self.applied.lock().clone()
    }
}

impl ChainReader for MockChain {
    fn height(&self) -> u64 {
        self.blocks.lock().len() as u64
    }

    fn block(&self, signature: &BlockSignature) -> Result<Option<Block>, ChainError> {
        Ok(self
            .blocks
            .lock()
            .iter()
            .find(|b| &b.signature == signature)
            .cloned())
    }

    fn signatures_after(
        &self,
        parent: &BlockSignature,
        limit: usize,
    ) -> Result<Vec<BlockSignature>, ChainError> {
        let blocks = self.blocks.lock();
        let Some(start) = blocks.iter().position(|b| &b.signature == parent) else {
            return Ok(Vec::new());
        };
        Ok(blocks[start + 1..]
            .iter()
            .take(limit)
            .map(|b| b.signature)
            .collect())
    }
}

impl ChainValidator for MockChain {
    fn is_new_block_valid(&self, _block: &Block) -> bool {
        self.valid.load(Ordering::SeqCst)
    }
}

impl ChainApplier for MockChain {
    fn apply_block(&self, block: &Block) -> Result<bool, ChainError> {
        self.applied.lock().push(block.signature);
        if !self.accept.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.blocks.lock().push(block.clone());
        Ok(true)
    }
}

// =============================================================================
// Network
// =============================================================================

/// Records broadcasts and dishonest reports. Optionally disconnects a
/// reported peer from the status registry, as a real network layer would.
#[derive(Default)]
pub struct MockNetwork {
    broadcasts: Mutex<Vec<(Message, Vec<PeerId>)>>,
    reports: Mutex<Vec<(PeerId, String)>>,
    peers: Mutex<Vec<PeerRef>>,
    disconnect_into: Mutex<Option<Arc<dyn NetworkStatusApi>>>,
}

impl MockNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_peer(&self, peer: PeerRef) {
        self.peers.lock().push(peer);
    }

    /// Remove reported peers from `status`.
    pub fn disconnect_reported(&self, status: Arc<dyn NetworkStatusApi>) {
        *self.disconnect_into.lock() = Some(status);
    }

    pub fn broadcasts(&self) -> Vec<(Message, Vec<PeerId>)> {
        self.broadcasts.lock().clone()
    }

    pub fn reports(&self) -> Vec<(PeerId, String)> {
        self.reports.lock().clone()
    }
}

impl NetworkGateway for MockNetwork {
    fn broadcast(&self, message: Message, exclude: &[PeerId]) -> usize {
        let reached = self
            .peers
            .lock()
            .iter()
            .filter(|p| !exclude.contains(&p.id()))
            .count();
        self.broadcasts.lock().push((message, exclude.to_vec()));
        reached
    }

    fn report_dishonest(&self, peer: PeerId, reason: &str) {
        self.reports.lock().push((peer, reason.to_string()));
        self.peers.lock().retain(|p| p.id() != peer);
        let status = self.disconnect_into.lock().clone();
        if let Some(status) = status {
            status.remove_peer(peer);
        }
    }

    fn active_peers(&self) -> Vec<PeerRef> {
        self.peers.lock().clone()
    }
}

// =============================================================================
// Transactions and wallet
// =============================================================================

#[derive(Debug, Default)]
pub struct MockPool {
    confirmed: Mutex<HashSet<TransactionSignature>>,
    admitted: Mutex<Vec<Transaction>>,
}

impl MockPool {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn confirm(&self, signature: TransactionSignature) {
        self.confirmed.lock().insert(signature);
    }

    pub fn admitted(&self) -> Vec<Transaction> {
        self.admitted.lock().clone()
    }
}

impl UnconfirmedPool for MockPool {
    fn is_confirmed(&self, tx: &Transaction) -> bool {
        self.confirmed.lock().contains(&tx.signature)
    }

    fn admit(&self, tx: Transaction) {
        self.admitted.lock().push(tx);
    }

    fn confirm_block(&self, block: &Block) {
        let mut confirmed = self.confirmed.lock();
        self.admitted
            .lock()
            .retain(|tx| !block.transactions.iter().any(|c| c.signature == tx.signature));
        confirmed.extend(block.transactions.iter().map(|tx| tx.signature));
    }
}

/// Accepts or rejects every signature.
#[derive(Debug)]
pub struct MockPolicy {
    valid: AtomicBool,
}

impl MockPolicy {
    pub fn accepting() -> Arc<Self> {
        Arc::new(Self {
            valid: AtomicBool::new(true),
        })
    }

    pub fn set_valid(&self, valid: bool) {
        self.valid.store(valid, Ordering::SeqCst);
    }
}

impl TransactionPolicy for MockPolicy {
    fn is_signature_valid(&self, _tx: &Transaction) -> bool {
        self.valid.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct MockWallet {
    resyncing: AtomicBool,
    behind: AtomicBool,
    requests: Mutex<u32>,
}

impl MockWallet {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_resyncing(&self, resyncing: bool) {
        self.resyncing.store(resyncing, Ordering::SeqCst);
    }

    pub fn set_behind(&self, behind: bool) {
        self.behind.store(behind, Ordering::SeqCst);
    }

    pub fn resync_requests(&self) -> u32 {
        *self.requests.lock()
    }
}

impl WalletMonitor for MockWallet {
    fn is_resync_in_progress(&self) -> bool {
        self.resyncing.load(Ordering::SeqCst)
    }

    fn needs_resync(&self) -> bool {
        self.behind.load(Ordering::SeqCst)
    }

    fn request_resync(&self) {
        *self.requests.lock() += 1;
    }
}

// =============================================================================
// Synchronizer
// =============================================================================

/// What the mock synchronizer does when asked to sync from a peer.
#[derive(Debug, Clone)]
pub enum PeerScript {
    /// Extend the chain to this height.
    Serve(u64),
    Fail(SyncError),
    /// Return without applying anything.
    Stall,
    /// Sleep, then extend the chain unless shutdown was requested.
    Slow(Duration, u64),
}

/// Scripted synchronizer that extends a [`MockChain`].
pub struct MockSynchronizer {
    chain: Arc<MockChain>,
    scripts: Mutex<HashMap<PeerId, PeerScript>>,
    calls: Mutex<Vec<PeerId>>,
}

impl MockSynchronizer {
    pub fn new(chain: Arc<MockChain>) -> Arc<Self> {
        Arc::new(Self {
            chain,
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn script(&self, peer: PeerId, script: PeerScript) {
        self.scripts.lock().insert(peer, script);
    }

    pub fn calls(&self) -> Vec<PeerId> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Synchronizer for MockSynchronizer {
    async fn synchronize(
        &self,
        peer: PeerRef,
        shutdown: ShutdownSignal,
    ) -> Result<u64, SyncError> {
        self.calls.lock().push(peer.id());
        let script = self
            .scripts
            .lock()
            .get(&peer.id())
            .cloned()
            .unwrap_or(PeerScript::Stall);

        let before = self.chain.height();
        match script {
            PeerScript::Serve(height) => self.chain.extend_to(height),
            PeerScript::Fail(e) => return Err(e),
            PeerScript::Stall => {}
            PeerScript::Slow(delay, height) => {
                tokio::time::sleep(delay).await;
                if shutdown.is_shutdown() {
                    return Err(SyncError::Interrupted);
                }
                self.chain.extend_to(height);
            }
        }
        Ok(self.chain.height().saturating_sub(before))
    }
}
