//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Chain**: `Block`, `BlockSignature`, `Transaction`
//! - **Network**: `PeerId`
//! - **Status**: `NetworkStatus`, `ForgingStatus`, `VersionInfo`

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::fmt;

// =============================================================================
// CLUSTER A: THE CHAIN
// =============================================================================

/// Identity of a peer connection, assigned by the network layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(pub u64);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// Length in bytes of block and transaction signatures.
pub const SIGNATURE_LENGTH: usize = 64;

/// Height of the first block of every chain.
pub const GENESIS_HEIGHT: u64 = 1;

/// A 64-byte block signature. This is the content identity of a block.
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockSignature(#[serde_as(as = "Bytes")] pub [u8; SIGNATURE_LENGTH]);

impl BlockSignature {
    /// The all-zero signature, used as the parent reference of genesis.
    pub const ZERO: Self = Self([0u8; SIGNATURE_LENGTH]);

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.0
    }

    /// Parse a signature from a byte slice of exactly [`SIGNATURE_LENGTH`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let array: [u8; SIGNATURE_LENGTH] = bytes.try_into().ok()?;
        Some(Self(array))
    }

    /// Abbreviated hex form for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..6])
    }
}

impl fmt::Display for BlockSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for BlockSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockSignature({}..)", self.short())
    }
}

/// A 64-byte transaction signature.
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionSignature(#[serde_as(as = "Bytes")] pub [u8; SIGNATURE_LENGTH]);

impl fmt::Debug for TransactionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionSignature({}..)", hex::encode(&self.0[..6]))
    }
}

impl fmt::Display for TransactionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// A block of the chain.
///
/// Immutable once stored. Competing forks are resolved by deleting and
/// re-adding blocks, never by editing one in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Content identity of the block.
    pub signature: BlockSignature,
    /// Signature of the predecessor block.
    pub parent: BlockSignature,
    /// Position in the chain, genesis is [`GENESIS_HEIGHT`].
    pub height: u64,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Transactions confirmed by this block.
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn is_genesis(&self) -> bool {
        self.height == GENESIS_HEIGHT
    }
}

/// Transaction kinds known to the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    /// Reserved for the genesis block. Never valid when relayed by a peer.
    Genesis,
    Payment,
    RegisterName,
    Arbitrary,
    Message,
}

/// A transaction as relayed between peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub signature: TransactionSignature,
    pub tx_type: TransactionType,
    /// Fee in base units.
    pub fee: u64,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub data: Vec<u8>,
}

impl Transaction {
    /// Bytes of the fixed part of an encoded transaction: type tag, fee,
    /// timestamp, signature and the data length prefix.
    pub const BASE_LENGTH: usize = 4 + 8 + 8 + SIGNATURE_LENGTH + 4;

    /// Encoded size used for fee-per-byte checks.
    pub fn size(&self) -> usize {
        Self::BASE_LENGTH + self.data.len()
    }
}

// =============================================================================
// CLUSTER B: STATUS
// =============================================================================

/// Coarse connectivity status of the node.
///
/// Reset to `NoConnections` at process start; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NetworkStatus {
    #[default]
    NoConnections,
    Synchronizing,
    Ok,
}

impl NetworkStatus {
    /// Numeric status code exposed to API consumers.
    pub fn code(self) -> u8 {
        match self {
            NetworkStatus::NoConnections => 0,
            NetworkStatus::Synchronizing => 1,
            NetworkStatus::Ok => 2,
        }
    }
}

impl fmt::Display for NetworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NetworkStatus::NoConnections => "no-connections",
            NetworkStatus::Synchronizing => "synchronizing",
            NetworkStatus::Ok => "ok",
        };
        f.write_str(name)
    }
}

/// Status of this node's own block production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ForgingStatus {
    #[default]
    Disabled,
    /// Enabled but waiting for the chain to be up to date.
    Waiting,
    Generating,
}

/// Protocol version string and build time reported by a peer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    /// Milliseconds since the Unix epoch.
    pub build_timestamp: u64,
}

impl VersionInfo {
    pub fn new(version: impl Into<String>, build_timestamp: u64) -> Self {
        Self {
            version: version.into(),
            build_timestamp,
        }
    }
}
