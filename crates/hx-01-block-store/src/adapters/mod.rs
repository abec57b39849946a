//! Adapters implementing the outbound ports.

pub mod serializer;
pub mod storage;

pub use serializer::BincodeBlockSerializer;
pub use storage::{FileBackedKVStore, InMemoryKVStore};
