//! # Peer Messages
//!
//! Decoded peer-to-peer messages. Requests carry a correlation id which the
//! reply echoes back so the sender can match it to the pending request.

use crate::entities::{Block, BlockSignature, Transaction};
use crate::peer::PeerRef;
use serde::{Deserialize, Serialize};

/// Correlation id linking a reply to its request.
pub type CorrelationId = u32;

/// Body of a peer message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessagePayload {
    Ping,
    Pong,
    /// The sender's current chain height.
    Height { height: u64 },
    /// Request for the signatures of the blocks following `parent`.
    GetSignatures { parent: BlockSignature },
    Signatures { signatures: Vec<BlockSignature> },
    GetBlock { signature: BlockSignature },
    /// Reply to `GetBlock`; empty when the block is unknown.
    BlockResponse { block: Option<Box<Block>> },
    /// A newly forged or relayed block, with its height on the sender's chain.
    Block { block: Box<Block>, height: u64 },
    Transaction(Box<Transaction>),
    Version {
        version: String,
        build_timestamp: u64,
    },
}

impl MessagePayload {
    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            MessagePayload::Ping => "ping",
            MessagePayload::Pong => "pong",
            MessagePayload::Height { .. } => "height",
            MessagePayload::GetSignatures { .. } => "get_signatures",
            MessagePayload::Signatures { .. } => "signatures",
            MessagePayload::GetBlock { .. } => "get_block",
            MessagePayload::BlockResponse { .. } => "block_response",
            MessagePayload::Block { .. } => "block",
            MessagePayload::Transaction(_) => "transaction",
            MessagePayload::Version { .. } => "version",
        }
    }
}

/// A message with its optional correlation id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub correlation_id: Option<CorrelationId>,
    pub payload: MessagePayload,
}

impl Message {
    /// An unsolicited message.
    pub fn new(payload: MessagePayload) -> Self {
        Self {
            correlation_id: None,
            payload,
        }
    }

    /// A reply carrying the correlation id of the request it answers.
    pub fn reply_to(request: &Message, payload: MessagePayload) -> Self {
        Self {
            correlation_id: request.correlation_id,
            payload,
        }
    }
}

/// A decoded message together with the connection it arrived on.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub sender: PeerRef,
    pub message: Message,
}

impl InboundMessage {
    pub fn new(sender: PeerRef, message: Message) -> Self {
        Self { sender, message }
    }

    pub fn payload(&self) -> &MessagePayload {
        &self.message.payload
    }
}
