//! Block builders and store constructors for tests.

use crate::adapters::{BincodeBlockSerializer, InMemoryKVStore};
use crate::service::{BlockStore, BlockStoreDependencies};
use sha2::{Digest, Sha512};
use shared_bus::EventHub;
use shared_types::{Block, BlockSignature, GENESIS_HEIGHT};
use std::sync::Arc;

/// Store over the in-memory KV used throughout the tests.
pub type MemoryBlockStore = BlockStore<InMemoryKVStore, BincodeBlockSerializer>;

/// Deterministic signature derived from the parent, height and a salt.
pub fn make_signature(parent: &BlockSignature, height: u64, salt: u8) -> BlockSignature {
    let mut hasher = Sha512::new();
    hasher.update(parent.as_bytes());
    hasher.update(height.to_be_bytes());
    hasher.update([salt]);
    let digest = hasher.finalize();
    BlockSignature::from_slice(&digest).unwrap_or(BlockSignature::ZERO)
}

pub fn make_test_block(height: u64, parent: BlockSignature) -> Block {
    make_fork_block(height, parent, 0)
}

/// Like [`make_test_block`] but with a salt, for competing blocks at one height.
pub fn make_fork_block(height: u64, parent: BlockSignature, salt: u8) -> Block {
    Block {
        signature: make_signature(&parent, height, salt),
        parent,
        height,
        timestamp: 1_700_000_000_000 + height * 60_000,
        transactions: Vec::new(),
    }
}

/// `length` linked blocks starting at genesis.
pub fn make_chain(length: usize) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::with_capacity(length);
    for i in 0..length as u64 {
        let parent = blocks
            .last()
            .map(|b| b.signature)
            .unwrap_or(BlockSignature::ZERO);
        blocks.push(make_test_block(GENESIS_HEIGHT + i, parent));
    }
    blocks
}

/// Empty in-memory store publishing into `hub`.
pub fn make_memory_store(hub: Arc<EventHub>) -> MemoryBlockStore {
    open_memory_store(InMemoryKVStore::new(), hub)
}

pub fn open_memory_store(kv_store: InMemoryKVStore, hub: Arc<EventHub>) -> MemoryBlockStore {
    BlockStore::open(BlockStoreDependencies {
        kv_store,
        serializer: BincodeBlockSerializer,
        publisher: hub,
    })
    .unwrap_or_else(|e| panic!("in-memory store failed to open: {e}"))
}
