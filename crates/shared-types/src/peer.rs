//! # Peer Handle
//!
//! The network layer owns connections. Everything in the node holds only
//! a [`PeerRef`] and never drives a connection's lifecycle.

use crate::entities::PeerId;
use crate::errors::PeerError;
use crate::messages::Message;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A live connection to a remote node.
pub trait Peer: Send + Sync + fmt::Debug {
    /// Stable identity of this connection.
    fn id(&self) -> PeerId;

    /// Round-trip latency estimate.
    ///
    /// `None` once the connection is gone, so callers scanning many peers
    /// can skip the ones that vanished under them.
    fn latency(&self) -> Option<Duration>;

    /// Queue a message for sending. Must not block.
    fn send(&self, message: Message) -> Result<(), PeerError>;
}

/// Shared handle to a peer connection.
pub type PeerRef = Arc<dyn Peer>;
