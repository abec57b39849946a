//! `BlockStoreApi` implementation.

use super::BlockStore;
use crate::domain::errors::StoreError;
use crate::domain::index::Order;
use crate::domain::keys::KeyPrefix;
use crate::ports::inbound::BlockStoreApi;
use crate::ports::outbound::{BatchOperation, BlockSerializer, KeyValueStore};
use shared_bus::NodeEvent;
use shared_types::{Block, BlockSignature};
use std::sync::Arc;
use tracing::{debug, warn};

impl<KV, BS> BlockStoreApi for BlockStore<KV, BS>
where
    KV: KeyValueStore,
    BS: BlockSerializer,
{
    fn put(&mut self, block: &Block) -> Result<(), StoreError> {
        let value = self.serializer.serialize(block)?;
        let signature = &block.signature;

        let mut operations = Vec::with_capacity(5);
        if let Some(previous) = self.index.height_of(signature) {
            if previous != block.height {
                operations.push(BatchOperation::delete(KeyPrefix::ascending_key(
                    previous, signature,
                )));
                operations.push(BatchOperation::delete(KeyPrefix::descending_key(
                    previous, signature,
                )));
            }
        }
        operations.push(BatchOperation::put(KeyPrefix::block_key(signature), value));
        operations.push(BatchOperation::put(
            KeyPrefix::ascending_key(block.height, signature),
            Vec::new(),
        ));
        operations.push(BatchOperation::put(
            KeyPrefix::descending_key(block.height, signature),
            Vec::new(),
        ));

        self.kv_store.atomic_batch_write(operations)?;
        self.index.insert(block.height, *signature);

        debug!(
            block_height = block.height,
            block_signature = %signature.short(),
            "[hx-01] Block stored"
        );
        self.notify(NodeEvent::BlockAdded(Arc::new(block.clone())));
        self.notify(NodeEvent::BlockListChanged);
        Ok(())
    }

    fn delete(&mut self, signature: &BlockSignature) -> Result<bool, StoreError> {
        let Some(height) = self.index.height_of(signature) else {
            return Ok(false);
        };
        let block = self.read_block(signature)?;

        self.kv_store.atomic_batch_write(vec![
            BatchOperation::delete(KeyPrefix::block_key(signature)),
            BatchOperation::delete(KeyPrefix::ascending_key(height, signature)),
            BatchOperation::delete(KeyPrefix::descending_key(height, signature)),
        ])?;
        self.index.remove(signature);

        debug!(
            block_height = height,
            block_signature = %signature.short(),
            "[hx-01] Block removed"
        );
        match block {
            Some(block) => self.notify(NodeEvent::BlockRemoved(Arc::new(block))),
            None => warn!(
                block_signature = %signature.short(),
                "[hx-01] Index entry had no block behind it"
            ),
        }
        self.notify(NodeEvent::BlockListChanged);
        Ok(true)
    }

    fn commit_tip(&mut self, block: &Block) -> Result<(), StoreError> {
        if !self.index.contains(&block.signature) {
            return Err(StoreError::BlockNotFound {
                signature: block.signature,
            });
        }
        self.kv_store
            .put(&KeyPrefix::last_block_key(), block.signature.as_bytes())?;
        self.tip = Some(block.signature);
        debug!(
            block_height = block.height,
            block_signature = %block.signature.short(),
            "[hx-01] Tip committed"
        );
        Ok(())
    }

    fn get(&self, signature: &BlockSignature) -> Result<Option<Block>, StoreError> {
        self.read_block(signature)
    }

    fn get_by_height(&self, height: u64) -> Result<Option<Block>, StoreError> {
        match self.index.at_height(height).next() {
            Some(signature) => self.read_block(&signature),
            None => Ok(None),
        }
    }

    fn range(&self, from: u64, to: u64, order: Order) -> Result<Vec<Block>, StoreError> {
        let mut blocks = Vec::new();
        for signature in self.index.range(from, to, order) {
            if let Some(block) = self.read_block(&signature)? {
                blocks.push(block);
            }
        }
        Ok(blocks)
    }

    fn last_block(&self) -> Result<Option<Block>, StoreError> {
        match self.tip {
            Some(signature) => self.read_block(&signature),
            None => Ok(None),
        }
    }

    fn height(&self) -> u64 {
        self.tip
            .and_then(|signature| self.index.height_of(&signature))
            .unwrap_or(0)
    }

    fn signatures_after(
        &self,
        parent: &BlockSignature,
        limit: usize,
    ) -> Result<Vec<BlockSignature>, StoreError> {
        let Some(mut height) = self.index.height_of(parent) else {
            return Ok(Vec::new());
        };

        let mut current = *parent;
        let mut signatures = Vec::new();
        while signatures.len() < limit {
            height += 1;
            let mut next = None;
            for candidate in self.index.at_height(height) {
                if let Some(block) = self.read_block(&candidate)? {
                    if block.parent == current {
                        next = Some(candidate);
                        break;
                    }
                }
            }
            match next {
                Some(signature) => {
                    signatures.push(signature);
                    current = signature;
                }
                None => break,
            }
        }
        Ok(signatures)
    }

    fn is_processing(&self) -> bool {
        self.processing
    }
}
