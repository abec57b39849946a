//! # Inbound Port (Driving Port)
//!
//! The Block Store API consumed by chain validation, chain application and
//! the message dispatcher.

use crate::domain::errors::StoreError;
use crate::domain::index::Order;
use shared_types::{Block, BlockSignature};

/// Primary Block Store API.
pub trait BlockStoreApi {
    /// Insert or overwrite `block` under its signature and update both
    /// height indexes. Does not move the tip.
    fn put(&mut self, block: &Block) -> Result<(), StoreError>;

    /// Remove a block and its index entries.
    ///
    /// Returns `Ok(false)` without touching anything if it is not stored.
    fn delete(&mut self, signature: &BlockSignature) -> Result<bool, StoreError>;

    /// Durably record `block` as the chain tip. The block must already be stored.
    fn commit_tip(&mut self, block: &Block) -> Result<(), StoreError>;

    fn get(&self, signature: &BlockSignature) -> Result<Option<Block>, StoreError>;

    /// Block at `height`. When forks share a height the lowest signature wins.
    fn get_by_height(&self, height: u64) -> Result<Option<Block>, StoreError>;

    /// Blocks with heights in `from..=to`, walked through the height index.
    fn range(&self, from: u64, to: u64, order: Order) -> Result<Vec<Block>, StoreError>;

    /// The tip block, resolved through `get`.
    fn last_block(&self) -> Result<Option<Block>, StoreError>;

    /// Height of the tip, 0 before genesis is committed.
    fn height(&self) -> u64;

    /// Signatures of the blocks following `parent` along parent links, in
    /// ascending height, at most `limit`. Empty if `parent` is unknown.
    fn signatures_after(
        &self,
        parent: &BlockSignature,
        limit: usize,
    ) -> Result<Vec<BlockSignature>, StoreError>;

    /// Whether a chain mutation is in flight or was interrupted.
    fn is_processing(&self) -> bool;
}
