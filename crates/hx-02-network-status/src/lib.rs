//! # Network Status Subsystem
//!
//! Tracks what every connected peer last told us about its chain and turns
//! that into the node's coarse [`NetworkStatus`](shared_types::NetworkStatus).
//!
//! ## Components
//!
//! | Component | Role |
//! |-----------|------|
//! | [`PeerRegistry`] | Insertion-ordered `peer -> value` map behind its own lock |
//! | [`select_sync_target`] | Highest height wins, lowest latency breaks ties |
//! | [`NetworkStatusService`] | Height + version registries and the status state machine |
//!
//! ## State Machine
//!
//! ```text
//!                 first height/version
//!  NoConnections ─────────────────────► Ok ◄─────────┐
//!       ▲                                │           │ finish_sync
//!       │ last peer removed              │ begin_sync│ (peers left)
//!       └────────────────────────────────┤           │
//!       ▲                                ▼           │
//!       └─────────────────────────── Synchronizing ──┘
//!              finish_sync (no peers)
//! ```
//!
//! Every actual change publishes one `NetworkStatusChanged`. The post-sync
//! refresh in [`finish_sync`](NetworkStatusService::finish_sync) publishes
//! even when the status did not change.
//!
//! ## Locking
//!
//! The status lock is always taken before a registry lock. The connected
//! hook runs after both are released.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use adapters::SystemTimeSource;
pub use domain::registry::PeerRegistry;
pub use domain::selection::{select_sync_target, SyncTarget};
pub use domain::transitions::{StatusTrigger, Transition};
pub use ports::inbound::NetworkStatusApi;
pub use ports::outbound::{ConnectedHook, TimeSource};
pub use service::{NetworkStatusDependencies, NetworkStatusService};
