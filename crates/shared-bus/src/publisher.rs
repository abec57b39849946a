//! # Event Publisher
//!
//! The publishing side of the hub.

use crate::events::{EventFilter, NodeEvent};
use crate::subscriber::{Registry, Subscription, SubscriptionId};
use crate::DEFAULT_CHANNEL_CAPACITY;
use parking_lot::Mutex;
use shared_types::NetworkStatus;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Trait for publishing events to observers.
///
/// Publishing is synchronous with the call and never waits on a subscriber.
pub trait EventPublisher: Send + Sync {
    /// Publish an event.
    ///
    /// # Returns
    ///
    /// The number of subscribers the event was queued for.
    fn publish(&self, event: NodeEvent) -> usize;

    /// Get the total number of events published.
    fn events_published(&self) -> u64;
}

/// In-process notification hub.
///
/// Uses `tokio::sync::broadcast`: every subscriber owns a bounded ring of
/// pending events, so a slow subscriber only ever loses its own backlog.
pub struct EventHub {
    sender: broadcast::Sender<NodeEvent>,

    /// Last published network status. Emission and registration both hold
    /// this lock, so the status replayed to a new subscriber is exactly the
    /// one in force before the first event it receives.
    status: Mutex<NetworkStatus>,

    registry: Registry,

    next_id: AtomicU64,

    events_published: AtomicU64,

    capacity: usize,
}

impl EventHub {
    /// Create a hub with default per-subscriber capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a hub with the given per-subscriber capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            status: Mutex::new(NetworkStatus::default()),
            registry: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            events_published: AtomicU64::new(0),
            capacity: capacity.max(1),
        }
    }

    /// Register an observer for events matching `filter`.
    ///
    /// The returned subscription yields a synthetic `NetworkStatusChanged`
    /// with the current status before anything else (when the filter lets
    /// network events through).
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        let status = self.status.lock();
        let receiver = self.sender.subscribe();
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let active = Arc::new(AtomicBool::new(true));
        self.registry.lock().insert(id, active.clone());
        let initial = NodeEvent::NetworkStatusChanged(*status);
        drop(status);

        debug!(subscription = %id, topics = ?filter.topics, "New subscription created");
        Subscription::new(
            id,
            receiver,
            filter,
            initial,
            active,
            Arc::downgrade(&self.registry),
        )
    }

    /// Cancel a subscription by id.
    ///
    /// Returns `false` if it was already cancelled or never existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        match self.registry.lock().remove(&id) {
            Some(active) => {
                active.store(false, Ordering::SeqCst);
                debug!(subscription = %id, "Subscription cancelled");
                true
            }
            None => false,
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().len()
    }

    /// Network status as of the last published status event.
    #[must_use]
    pub fn current_status(&self) -> NetworkStatus {
        *self.status.lock()
    }

    /// Get the per-subscriber capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for EventHub {
    fn publish(&self, event: NodeEvent) -> usize {
        let mut status = self.status.lock();
        if let NodeEvent::NetworkStatusChanged(new_status) = &event {
            *status = *new_status;
        }

        self.events_published.fetch_add(1, Ordering::Relaxed);
        let name = event.name();

        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(event = name, receivers, "Event published");
                receivers
            }
            Err(_) => {
                trace!(event = name, "Event published with no subscribers");
                0
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
