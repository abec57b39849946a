//! Test doubles for peer connections.

use crate::entities::PeerId;
use crate::errors::PeerError;
use crate::messages::{Message, MessagePayload};
use crate::peer::{Peer, PeerRef};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Peer that records every message sent to it.
#[derive(Debug)]
pub struct RecordingPeer {
    id: PeerId,
    latency: Duration,
    connected: AtomicBool,
    sent: Mutex<Vec<Message>>,
}

impl RecordingPeer {
    pub fn new(id: u64, latency_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            id: PeerId(id),
            latency: Duration::from_millis(latency_ms),
            connected: AtomicBool::new(true),
            sent: Mutex::new(Vec::new()),
        })
    }

    /// Simulate the connection dropping.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().clone()
    }

    pub fn sent_payloads(&self) -> Vec<MessagePayload> {
        self.sent.lock().iter().map(|m| m.payload.clone()).collect()
    }

    pub fn handle(self: &Arc<Self>) -> PeerRef {
        self.clone()
    }
}

impl Peer for RecordingPeer {
    fn id(&self) -> PeerId {
        self.id
    }

    fn latency(&self) -> Option<Duration> {
        self.connected
            .load(Ordering::SeqCst)
            .then_some(self.latency)
    }

    fn send(&self, message: Message) -> Result<(), PeerError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(PeerError::Disconnected(self.id));
        }
        self.sent.lock().push(message);
        Ok(())
    }
}
