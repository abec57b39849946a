//! # Domain Errors
//!
//! Error types for the Block Store.

use shared_types::BlockSignature;
use thiserror::Error;

/// Failures of the key-value substrate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KVStoreError {
    #[error("I/O error: {message}")]
    IOError { message: String },

    /// Persisted data failed its integrity check.
    #[error("corrupted store at {path}: {reason}")]
    Corrupted { path: String, reason: String },
}

impl KVStoreError {
    pub(crate) fn io(error: impl std::fmt::Display) -> Self {
        KVStoreError::IOError {
            message: error.to_string(),
        }
    }
}

/// Block encoding or decoding failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("serialization error: {message}")]
pub struct SerializationError {
    pub message: String,
}

/// Errors from Block Store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The operation needs a block that is not stored.
    #[error("block not found: {}", .signature.short())]
    BlockNotFound { signature: BlockSignature },

    /// The two persisted height indexes disagree.
    #[error("height indexes out of step: {ascending} ascending entries, {descending} descending")]
    IndexMismatch { ascending: usize, descending: usize },

    /// A persisted key or value has an unexpected shape.
    #[error("malformed entry under key prefix {prefix}")]
    MalformedEntry { prefix: &'static str },

    /// The tip pointer names a block that is not stored.
    #[error("chain tip {} does not resolve to a stored block", .signature.short())]
    TipUnresolved { signature: BlockSignature },

    #[error(transparent)]
    Storage(#[from] KVStoreError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

impl StoreError {
    /// Whether the error means the persisted data cannot be trusted.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            StoreError::IndexMismatch { .. }
                | StoreError::MalformedEntry { .. }
                | StoreError::TipUnresolved { .. }
                | StoreError::Serialization(_)
                | StoreError::Storage(KVStoreError::Corrupted { .. })
        )
    }
}
