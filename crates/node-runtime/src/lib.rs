//! # Node Runtime Library
//!
//! Builds and runs a Helix node. The `helix-node` binary in `main.rs` is a
//! thin wrapper around [`Node`].
//!
//! ## Modules
//!
//! - `container/` - configuration and the subsystem container
//! - `adapters/` - port implementations: storage backends, local chain,
//!   standalone collaborators
//! - `recovery` - data directory lock, startup recovery, checkpoints
//! - `scheduler` - post-connect timer, height broadcast, sync check, metrics
//! - `node` - the core object: hooks, queries, lifecycle

#![allow(clippy::type_complexity)]

pub mod adapters;
pub mod container;
pub mod node;
pub mod recovery;
pub mod scheduler;

pub use adapters::{Collaborators, ConnectedPeers};
pub use container::{ConfigError, NodeConfig};
pub use node::{Node, NodeError};
pub use recovery::{RecoveryError, RecoveryOutcome};
