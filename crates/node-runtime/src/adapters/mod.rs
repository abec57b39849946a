//! # Adapter Implementations
//!
//! Concrete implementations of the subsystem ports:
//!
//! 1. **storage**: `KeyValueStore` backends for the block store
//! 2. **chain**: chain reader, validator and applier over the block store
//! 3. **collaborators**: network, wallet, pool, policy and synchronizer
//!    stand-ins for a node without those services attached
//! 4. **metered**: metrics decorator for the network gateway
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                   OUTER LAYER (Adapters)                      │
//! │   LocalChain, ConnectedPeers, MemoryPool, RocksDbStore ...    │
//! │                         ↑ implements ↑                        │
//! │                    MIDDLE LAYER (Ports)                       │
//! │   ChainReader, NetworkGateway, UnconfirmedPool, KeyValueStore │
//! │                           ↑ uses ↑                            │
//! │                    INNER LAYER (Domain)                       │
//! │   height index, status transitions, fee thresholds            │
//! └───────────────────────────────────────────────────────────────┘
//! ```

pub mod chain;
pub mod collaborators;
pub mod metered;
pub mod storage;

pub use chain::LocalChain;
pub use collaborators::{
    Collaborators, ConnectedPeers, DetachedSynchronizer, IdleWallet, MemoryPool,
    StructuralSignaturePolicy,
};
pub use metered::MeteredGateway;
pub use storage::{open_backend, NodeBlockStore};
