//! # Chain Mutation Scope
//!
//! Multi-step chain changes (put + commit tip, fork switches) run inside a
//! [`ChainMutation`]. The durable `m:processing` flag is written before the
//! scope is handed out and removed only by [`ChainMutation::finish`]. A scope
//! that is dropped instead, or a process that dies inside one, leaves the
//! flag set for the next startup to find.

use super::BlockStore;
use crate::domain::errors::StoreError;
use crate::domain::keys::KeyPrefix;
use crate::ports::outbound::{BlockSerializer, KeyValueStore};
use std::ops::{Deref, DerefMut};
use tracing::{debug, warn};

/// Exclusive access to the store for one uninterruptible operation sequence.
pub struct ChainMutation<'a, KV, BS>
where
    KV: KeyValueStore,
    BS: BlockSerializer,
{
    store: &'a mut BlockStore<KV, BS>,
}

impl<KV, BS> BlockStore<KV, BS>
where
    KV: KeyValueStore,
    BS: BlockSerializer,
{
    /// Durably raise the processing flag and open a mutation scope.
    pub fn begin_mutation(&mut self) -> Result<ChainMutation<'_, KV, BS>, StoreError> {
        if self.processing {
            warn!("[hx-01] Processing flag already set when starting a chain mutation");
        }
        self.set_processing(true)?;
        Ok(ChainMutation { store: self })
    }

    fn set_processing(&mut self, processing: bool) -> Result<(), StoreError> {
        let key = KeyPrefix::processing_key();
        if processing {
            self.kv_store.put(&key, &[1])?;
        } else {
            self.kv_store.delete(&key)?;
        }
        self.processing = processing;
        debug!(processing, "[hx-01] Processing flag updated");
        Ok(())
    }
}

impl<KV, BS> ChainMutation<'_, KV, BS>
where
    KV: KeyValueStore,
    BS: BlockSerializer,
{
    /// Close the scope after every step succeeded, clearing the flag.
    pub fn finish(self) -> Result<(), StoreError> {
        self.store.set_processing(false)
    }
}

impl<KV, BS> Deref for ChainMutation<'_, KV, BS>
where
    KV: KeyValueStore,
    BS: BlockSerializer,
{
    type Target = BlockStore<KV, BS>;

    fn deref(&self) -> &Self::Target {
        self.store
    }
}

impl<KV, BS> DerefMut for ChainMutation<'_, KV, BS>
where
    KV: KeyValueStore,
    BS: BlockSerializer,
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.store
    }
}
