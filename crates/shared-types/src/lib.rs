//! # Shared Types Crate
//!
//! Domain entities and peer message types shared by every Helix crate.
//!
//! ## Contents
//!
//! - **Chain**: [`Block`], [`BlockSignature`], [`Transaction`]
//! - **Network**: [`PeerId`], the [`Peer`] handle trait, [`NetworkStatus`]
//! - **Messages**: [`Message`], [`MessagePayload`], [`InboundMessage`]
//!
//! Wire framing is not handled here: messages reach the node already decoded.

pub mod entities;
pub mod errors;
pub mod messages;
pub mod peer;

pub use entities::*;
pub use errors::*;
pub use messages::*;
pub use peer::*;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
