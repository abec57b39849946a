//! # Block Store (hx-01)
//!
//! Durable map from block signature to block, with an ascending and a
//! descending height index, a chain-tip pointer and a crash-detection flag.
//!
//! ## Persisted Layout
//!
//! | Key | Value | Purpose |
//! |-----|-------|---------|
//! | `b:{signature}` | bincode `Block` | source of truth |
//! | `ha:{height BE}{signature}` | empty | ascending height index |
//! | `hd:{!height BE}{!signature}` | empty | descending height index |
//! | `m:last` | signature | chain tip |
//! | `m:processing` | `0x01` | set while a chain mutation is in flight |
//!
//! ## Guarantees
//!
//! | Guarantee | How |
//! |-----------|-----|
//! | Index consistency | block and both index entries go in one atomic batch |
//! | Visible before notified | `BlockAdded` / `BlockRemoved` are published after the batch lands |
//! | Crash detection | [`ChainMutation`] sets `m:processing` first and clears it only in `finish` |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - keys, height index, errors
//! - `ports/` - inbound API, outbound SPI (`KeyValueStore`, `BlockSerializer`)
//! - `adapters/` - in-memory and file-backed stores, bincode codec
//! - `service/` - [`BlockStore`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use adapters::{BincodeBlockSerializer, FileBackedKVStore, InMemoryKVStore};
pub use domain::errors::{KVStoreError, SerializationError, StoreError};
pub use domain::index::{HeightIndex, Order};
pub use domain::keys::KeyPrefix;
pub use ports::inbound::BlockStoreApi;
pub use ports::outbound::{BatchOperation, BlockSerializer, KeyValueStore};
pub use service::{BlockStore, BlockStoreDependencies, ChainMutation};

/// Maximum signatures returned for one `GetSignatures` request.
pub const MAX_SIGNATURES_PER_REPLY: usize = 500;
