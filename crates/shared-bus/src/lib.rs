//! # Shared Bus - Notification Hub
//!
//! Fans node events out to every registered observer (wallet, UI, API).
//!
//! ```text
//! ┌──────────────┐   publish()   ┌──────────────┐  recv()  ┌────────────┐
//! │ Block Store  │ ────────────→ │   EventHub   │ ───────→ │ Observer A │
//! │ Status SM    │               │ (broadcast)  │ ───────→ │ Observer B │
//! │ Dispatcher   │               └──────────────┘          └────────────┘
//! └──────────────┘
//! ```
//!
//! ## Delivery Rules
//!
//! - Every subscriber sees events in emission order.
//! - A new subscriber first receives one `NetworkStatusChanged` carrying the
//!   status current at registration time.
//! - Publishing never waits on a subscriber. Each subscriber has a bounded
//!   buffer; one that falls further behind loses its oldest events.
//! - Unsubscribing is idempotent.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{EventFilter, EventTopic, NodeEvent};
pub use publisher::{EventHub, EventPublisher};
pub use subscriber::{Subscription, SubscriptionError, SubscriptionId};

/// Events buffered per subscriber before the oldest are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
