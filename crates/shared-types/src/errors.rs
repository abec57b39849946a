//! # Error Types
//!
//! Errors shared across crates.

use crate::entities::PeerId;
use thiserror::Error;

/// Failure to hand a message to a peer connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeerError {
    /// The connection was closed before the message could be queued.
    #[error("peer {0} is disconnected")]
    Disconnected(PeerId),

    /// The outbound queue of the connection is full.
    #[error("send queue of peer {0} is full")]
    QueueFull(PeerId),
}
