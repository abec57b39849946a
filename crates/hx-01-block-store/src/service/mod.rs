//! # Block Store Service
//!
//! [`BlockStore`] implements [`BlockStoreApi`](crate::ports::inbound::BlockStoreApi)
//! over any `KeyValueStore` and `BlockSerializer`.

mod api;
mod mutation;

pub use mutation::ChainMutation;

use crate::domain::errors::StoreError;
use crate::domain::index::HeightIndex;
use crate::domain::keys::KeyPrefix;
use crate::ports::outbound::{BlockSerializer, KeyValueStore};
use shared_bus::{EventPublisher, NodeEvent};
use shared_types::{Block, BlockSignature};
use std::sync::Arc;
use tracing::info;

/// Dependencies for [`BlockStore`].
pub struct BlockStoreDependencies<KV, BS> {
    pub kv_store: KV,
    pub serializer: BS,
    /// Receives `BlockAdded`, `BlockRemoved` and `BlockListChanged`.
    pub publisher: Arc<dyn EventPublisher>,
}

/// The Block Store.
pub struct BlockStore<KV, BS>
where
    KV: KeyValueStore,
    BS: BlockSerializer,
{
    pub(crate) kv_store: KV,
    pub(crate) serializer: BS,
    pub(crate) publisher: Arc<dyn EventPublisher>,
    /// Mirror of the persisted height tables.
    pub(crate) index: HeightIndex,
    /// Mirror of `m:last`.
    pub(crate) tip: Option<BlockSignature>,
    /// Mirror of `m:processing`.
    pub(crate) processing: bool,
}

impl<KV, BS> BlockStore<KV, BS>
where
    KV: KeyValueStore,
    BS: BlockSerializer,
{
    /// Open the store, rebuilding the in-memory index from the persisted
    /// height tables.
    ///
    /// Fails when the two height tables disagree, an index key is
    /// malformed, or the tip names a block that is not indexed.
    pub fn open(deps: BlockStoreDependencies<KV, BS>) -> Result<Self, StoreError> {
        let kv_store = deps.kv_store;

        let ascending = kv_store.prefix_scan(KeyPrefix::HeightAscending.as_bytes())?;
        let descending = kv_store.prefix_scan(KeyPrefix::HeightDescending.as_bytes())?;
        if ascending.len() != descending.len() {
            return Err(StoreError::IndexMismatch {
                ascending: ascending.len(),
                descending: descending.len(),
            });
        }

        let mut index = HeightIndex::new();
        for (key, _) in &ascending {
            let (height, signature) =
                KeyPrefix::parse_ascending(key).ok_or(StoreError::MalformedEntry {
                    prefix: KeyPrefix::HeightAscending.name(),
                })?;
            index.insert(height, signature);
        }
        for (key, _) in &descending {
            let (height, signature) =
                KeyPrefix::parse_descending(key).ok_or(StoreError::MalformedEntry {
                    prefix: KeyPrefix::HeightDescending.name(),
                })?;
            if index.height_of(&signature) != Some(height) {
                return Err(StoreError::IndexMismatch {
                    ascending: ascending.len(),
                    descending: descending.len(),
                });
            }
        }

        let tip = match kv_store.get(&KeyPrefix::last_block_key())? {
            Some(bytes) => {
                let signature =
                    BlockSignature::from_slice(&bytes).ok_or(StoreError::MalformedEntry {
                        prefix: KeyPrefix::Metadata.name(),
                    })?;
                if !index.contains(&signature) {
                    return Err(StoreError::TipUnresolved { signature });
                }
                Some(signature)
            }
            None => None,
        };

        let processing = kv_store.exists(&KeyPrefix::processing_key())?;

        info!(
            blocks = index.len(),
            tip_height = tip.and_then(|s| index.height_of(&s)).unwrap_or(0),
            processing,
            "[hx-01] Block store opened"
        );

        Ok(Self {
            kv_store,
            serializer: deps.serializer,
            publisher: deps.publisher,
            index,
            tip,
            processing,
        })
    }

    /// Number of stored blocks.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Signature of the tip, if one was committed.
    pub fn tip(&self) -> Option<BlockSignature> {
        self.tip
    }

    pub fn contains(&self, signature: &BlockSignature) -> bool {
        self.index.contains(signature)
    }

    /// Close the store and hand back its substrate.
    pub fn into_kv_store(self) -> KV {
        self.kv_store
    }

    /// Push buffered writes of the substrate to disk.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        Ok(self.kv_store.flush()?)
    }

    pub(crate) fn read_block(&self, signature: &BlockSignature) -> Result<Option<Block>, StoreError> {
        match self.kv_store.get(&KeyPrefix::block_key(signature))? {
            Some(bytes) => Ok(Some(self.serializer.deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn notify(&self, event: NodeEvent) {
        self.publisher.publish(event);
    }
}
