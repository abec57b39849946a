//! # Event Subscriber
//!
//! The receiving side of the hub.

use crate::events::{EventFilter, NodeEvent};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Live subscriptions by id, shared between the hub and its handles.
pub(crate) type Registry = Arc<Mutex<HashMap<SubscriptionId, Arc<AtomicBool>>>>;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The hub was dropped.
    #[error("Notification hub closed")]
    Closed,

    /// The subscription was cancelled.
    #[error("Subscription cancelled")]
    Unsubscribed,
}

/// Identity of one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// A subscription handle for receiving events.
///
/// Dropping the handle cancels the subscription.
pub struct Subscription {
    id: SubscriptionId,
    receiver: broadcast::Receiver<NodeEvent>,
    filter: EventFilter,
    /// Synthetic status event delivered before anything from the channel.
    pending: Option<NodeEvent>,
    active: Arc<AtomicBool>,
    registry: Weak<Mutex<HashMap<SubscriptionId, Arc<AtomicBool>>>>,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriptionId,
        receiver: broadcast::Receiver<NodeEvent>,
        filter: EventFilter,
        initial: NodeEvent,
        active: Arc<AtomicBool>,
        registry: Weak<Mutex<HashMap<SubscriptionId, Arc<AtomicBool>>>>,
    ) -> Self {
        let pending = filter.matches(&initial).then_some(initial);
        Self {
            id,
            receiver,
            filter,
            pending,
            active,
            registry,
        }
    }

    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Whether the subscription has not been cancelled.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Receive the next event that matches the filter.
    ///
    /// # Returns
    ///
    /// - `Some(event)` - The next matching event
    /// - `None` - The hub was dropped or the subscription was cancelled.
    ///   A cancellation made through [`crate::EventHub::unsubscribe`] while
    ///   this call is waiting takes effect at the next published event.
    pub async fn recv(&mut self) -> Option<NodeEvent> {
        if !self.is_active() {
            return None;
        }
        if let Some(event) = self.pending.take() {
            return Some(event);
        }
        loop {
            let event = match self.receiver.recv().await {
                Ok(e) => e,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(subscription = %self.id, dropped = count, "Subscriber fell behind, oldest events dropped");
                    continue;
                }
            };
            if !self.is_active() {
                return None;
            }
            if self.filter.matches(&event) {
                return Some(event);
            }
        }
    }

    /// Try to receive the next event without waiting.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(event))` - An event was available and matched
    /// - `Ok(None)` - No event available
    /// - `Err(_)` - The hub was dropped or the subscription was cancelled
    pub fn try_recv(&mut self) -> Result<Option<NodeEvent>, SubscriptionError> {
        if !self.is_active() {
            return Err(SubscriptionError::Unsubscribed);
        }
        if let Some(event) = self.pending.take() {
            return Ok(Some(event));
        }
        loop {
            let event = match self.receiver.try_recv() {
                Ok(e) => e,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    warn!(subscription = %self.id, dropped = count, "Subscriber fell behind, oldest events dropped");
                    continue;
                }
            };
            if self.filter.matches(&event) {
                return Ok(Some(event));
            }
        }
    }

    /// Cancel this subscription. Calling it again has no effect.
    pub fn unsubscribe(&mut self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().remove(&self.id);
        }
        debug!(subscription = %self.id, "Subscription cancelled");
    }

    /// Get the filter for this subscription.
    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("filter", &self.filter)
            .field("active", &self.is_active())
            .finish()
    }
}
