//! # Chain Sync Subsystem
//!
//! Everything that turns peer traffic into chain progress.
//!
//! - [`MessageDispatcher`]: handles one decoded inbound message at a time,
//!   across every connection, so that registry updates, block application
//!   and relaying form a single linear history.
//! - [`SyncDriver`]: while some peer reports a greater height than ours,
//!   picks the best peer and lets the external [`Synchronizer`] pull and
//!   apply blocks from it.
//!
//! Block validity, block application and transaction semantics belong to
//! collaborators behind the traits in [`ports::outbound`].
//!
//! ## Message Handling
//!
//! | Message | Effect | Reply |
//! |---------|--------|-------|
//! | `Ping` | none | `Pong` |
//! | `Height` | record sender height | none |
//! | `GetSignatures` | walk the chain from `parent` | `Signatures` |
//! | `GetBlock` | look the block up | `BlockResponse` |
//! | `Block` | validate, record height, apply, relay | none |
//! | `Transaction` | check, admit, notify, relay | none |
//! | `Version` | record sender version | none |
//!
//! Replies carry the request's correlation id.

pub mod domain;
pub mod ports;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use domain::errors::{ChainError, SyncError};
pub use domain::fees::FeeThresholds;
pub use domain::outcome::{DispatchOutcome, SyncReport};
pub use domain::shutdown::{ShutdownSignal, ShutdownTrigger};
pub use ports::inbound::{ChainSyncApi, MessageDispatch};
pub use ports::outbound::{
    ChainApplier, ChainReader, ChainValidator, NetworkGateway, Synchronizer, TransactionPolicy,
    UnconfirmedPool, WalletMonitor,
};
pub use service::{
    DispatchConfig, DispatcherDependencies, MessageDispatcher, SyncConfig, SyncDriver,
    SyncDriverDependencies,
};

/// Most signatures sent in one `Signatures` reply.
pub const DEFAULT_MAX_SIGNATURES: usize = 500;
