//! # Local Chain Adapter
//!
//! Backs the chain ports of the dispatcher and the sync driver with the
//! node's own block store. A block is acceptable when it extends the current
//! tip by exactly one (or is genesis on an empty store); signature and stake
//! rules belong to a consensus layer this node does not carry.

use crate::adapters::storage::NodeBlockStore;
use hx_01_block_store::{BlockStoreApi, Order, StoreError};
use hx_03_chain_sync::{ChainApplier, ChainError, ChainReader, ChainValidator, UnconfirmedPool};
use parking_lot::RwLock;
use shared_types::{Block, BlockSignature, GENESIS_HEIGHT};
use std::sync::Arc;
use tracing::{debug, info};

fn storage_error(error: StoreError) -> ChainError {
    ChainError::Storage(error.to_string())
}

/// Chain view over the shared block store.
pub struct LocalChain {
    store: Arc<RwLock<NodeBlockStore>>,
    pool: Option<Arc<dyn UnconfirmedPool>>,
}

impl LocalChain {
    pub fn new(store: NodeBlockStore) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            pool: None,
        }
    }

    /// Confirm the transactions of every applied block in `pool`.
    pub fn with_pool(mut self, pool: Arc<dyn UnconfirmedPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn last_block(&self) -> Result<Option<Block>, StoreError> {
        self.store.read().last_block()
    }

    pub fn block(&self, signature: &BlockSignature) -> Result<Option<Block>, StoreError> {
        self.store.read().get(signature)
    }

    pub fn block_by_height(&self, height: u64) -> Result<Option<Block>, StoreError> {
        self.store.read().get_by_height(height)
    }

    /// Up to `count` blocks ending at the tip, highest first.
    pub fn last_blocks(&self, count: u64) -> Result<Vec<Block>, StoreError> {
        let store = self.store.read();
        let height = store.height();
        if count == 0 || height < GENESIS_HEIGHT {
            return Ok(Vec::new());
        }
        let from = height.saturating_sub(count - 1).max(GENESIS_HEIGHT);
        store.range(from, height, Order::Descending)
    }

    pub fn block_count(&self) -> usize {
        self.store.read().len()
    }

    pub fn is_processing(&self) -> bool {
        self.store.read().is_processing()
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.store.write().flush()
    }

    fn extends_tip(store: &NodeBlockStore, block: &Block) -> Result<bool, StoreError> {
        if store.contains(&block.signature) {
            return Ok(false);
        }
        Ok(match store.last_block()? {
            Some(tip) => block.parent == tip.signature && block.height == tip.height + 1,
            None => block.is_genesis(),
        })
    }
}

impl ChainReader for LocalChain {
    fn height(&self) -> u64 {
        self.store.read().height()
    }

    fn block(&self, signature: &BlockSignature) -> Result<Option<Block>, ChainError> {
        LocalChain::block(self, signature).map_err(storage_error)
    }

    fn signatures_after(
        &self,
        parent: &BlockSignature,
        limit: usize,
    ) -> Result<Vec<BlockSignature>, ChainError> {
        self.store
            .read()
            .signatures_after(parent, limit)
            .map_err(storage_error)
    }
}

impl ChainValidator for LocalChain {
    fn is_new_block_valid(&self, block: &Block) -> bool {
        match Self::extends_tip(&self.store.read(), block) {
            Ok(valid) => valid,
            Err(e) => {
                debug!(error = %e, "[hx-01] Tip lookup failed during validation");
                false
            }
        }
    }
}

impl ChainApplier for LocalChain {
    /// Store the block and move the tip to it inside one processing scope.
    /// `Ok(false)` when the block is already stored.
    fn apply_block(&self, block: &Block) -> Result<bool, ChainError> {
        let mut store = self.store.write();
        if store.contains(&block.signature) {
            return Ok(false);
        }
        if !Self::extends_tip(&store, block).map_err(storage_error)? {
            return Err(ChainError::Rejected(format!(
                "block {} at height {} does not extend the tip at height {}",
                block.signature.short(),
                block.height,
                store.height()
            )));
        }

        let mut mutation = store.begin_mutation().map_err(storage_error)?;
        mutation.put(block).map_err(storage_error)?;
        mutation.commit_tip(block).map_err(storage_error)?;
        mutation.finish().map_err(storage_error)?;
        drop(store);

        if let Some(pool) = &self.pool {
            pool.confirm_block(block);
        }
        info!(
            height = block.height,
            signature = %block.signature.short(),
            "[hx-01] Block applied"
        );
        Ok(true)
    }
}
