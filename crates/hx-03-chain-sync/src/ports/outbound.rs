//! # Driven Ports (Outbound SPI)
//!
//! Collaborators the host provides. None of them may call back into the
//! dispatcher; they run inside its critical section.

use crate::domain::errors::{ChainError, SyncError};
use crate::domain::shutdown::ShutdownSignal;
use async_trait::async_trait;
use shared_types::{Block, BlockSignature, Message, PeerId, PeerRef, Transaction};

/// Read access to the local chain.
pub trait ChainReader: Send + Sync {
    /// Height of the tip, 0 before genesis.
    fn height(&self) -> u64;

    fn block(&self, signature: &BlockSignature) -> Result<Option<Block>, ChainError>;

    /// Signatures following `parent` along the chain, at most `limit`.
    fn signatures_after(
        &self,
        parent: &BlockSignature,
        limit: usize,
    ) -> Result<Vec<BlockSignature>, ChainError>;
}

/// Block validity rules.
pub trait ChainValidator: Send + Sync {
    fn is_new_block_valid(&self, block: &Block) -> bool;
}

/// Block application.
pub trait ChainApplier: Send + Sync {
    /// Apply a block received from a peer. `Ok(true)` when it was newly
    /// accepted and should be relayed.
    fn apply_block(&self, block: &Block) -> Result<bool, ChainError>;
}

/// Pulls and applies blocks from one peer.
#[async_trait]
pub trait Synchronizer: Send + Sync {
    /// Bring the local chain closer to `peer`'s chain. Returns the number of
    /// blocks applied. Implementations should stop at the next safe point
    /// once `shutdown` fires and return [`SyncError::Interrupted`].
    async fn synchronize(&self, peer: PeerRef, shutdown: ShutdownSignal)
        -> Result<u64, SyncError>;
}

/// Pool of unconfirmed transactions.
pub trait UnconfirmedPool: Send + Sync {
    /// The transaction is already included in a stored block.
    fn is_confirmed(&self, tx: &Transaction) -> bool;

    fn admit(&self, tx: Transaction);

    /// Called once `block` is stored as the new tip. Its transactions leave
    /// the pending set and count as confirmed from then on.
    fn confirm_block(&self, block: &Block);
}

/// Transaction signature rules.
pub trait TransactionPolicy: Send + Sync {
    fn is_signature_valid(&self, tx: &Transaction) -> bool;
}

/// Network layer operations beyond replying to a single peer.
pub trait NetworkGateway: Send + Sync {
    /// Send to every active peer not in `exclude`. Returns how many peers
    /// the message was handed to.
    fn broadcast(&self, message: Message, exclude: &[PeerId]) -> usize;

    /// Flag a peer that broke protocol. Disconnecting is the network
    /// layer's decision.
    fn report_dishonest(&self, peer: PeerId, reason: &str);

    fn active_peers(&self) -> Vec<PeerRef>;
}

/// Wallet synchronization state.
pub trait WalletMonitor: Send + Sync {
    fn is_resync_in_progress(&self) -> bool;

    /// The wallet has fallen behind and wants a resync.
    fn needs_resync(&self) -> bool;

    fn request_resync(&self);
}
