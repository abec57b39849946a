//! # Storage Backends
//!
//! Opens the `KeyValueStore` selected by [`StorageBackend`] under a
//! directory.
//!
//! ## Usage
//!
//! The RocksDB backend needs the `rocksdb` feature:
//!
//! ```toml
//! node-runtime = { path = "...", features = ["rocksdb"] }
//! ```

#[cfg(feature = "rocksdb")]
pub mod rocksdb_adapter;

#[cfg(feature = "rocksdb")]
pub use rocksdb_adapter::{RocksDbConfig, RocksDbStore};

use crate::container::config::StorageBackend;
use hx_01_block_store::{
    BincodeBlockSerializer, BlockStore, FileBackedKVStore, KVStoreError, KeyValueStore,
};
use std::path::Path;

/// File name of the file backend's log inside the chain directory.
pub const BLOCKS_FILE_NAME: &str = "blocks.kv";

/// The block store as the runtime holds it: backend chosen at startup.
pub type NodeBlockStore = BlockStore<Box<dyn KeyValueStore>, BincodeBlockSerializer>;

/// Open the key-value backend rooted at `dir`, creating it if missing.
pub fn open_backend(
    backend: StorageBackend,
    dir: &Path,
) -> Result<Box<dyn KeyValueStore>, KVStoreError> {
    std::fs::create_dir_all(dir).map_err(|e| KVStoreError::IOError {
        message: format!("cannot create {}: {e}", dir.display()),
    })?;

    match backend {
        StorageBackend::File => Ok(Box::new(FileBackedKVStore::open(
            dir.join(BLOCKS_FILE_NAME),
        )?)),
        #[cfg(feature = "rocksdb")]
        StorageBackend::RocksDb => Ok(Box::new(RocksDbStore::open_default(dir)?)),
        #[cfg(not(feature = "rocksdb"))]
        StorageBackend::RocksDb => Err(KVStoreError::IOError {
            message: "this build has no RocksDB support; rebuild with --features rocksdb"
                .to_string(),
        }),
    }
}
