//! # Node Events
//!
//! Tagged union of everything the node announces to observers.

use shared_types::{Block, ForgingStatus, NetworkStatus, Transaction};
use std::sync::Arc;

/// An event published through the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEvent {
    /// A block became readable through the block store.
    BlockAdded(Arc<Block>),
    /// A block was removed from the block store.
    BlockRemoved(Arc<Block>),
    /// The set of stored blocks changed. Follows every add or remove.
    BlockListChanged,
    NetworkStatusChanged(NetworkStatus),
    ForgingStatusChanged(ForgingStatus),
    /// A relayed transaction was admitted to the unconfirmed pool.
    TransactionAdded(Arc<Transaction>),
    /// Wallet rescan progress, as the height processed so far.
    WalletSyncProgress { height: u64 },
    /// Chain height reached after a synchronization round.
    ChainSyncProgress { height: u64 },
}

impl NodeEvent {
    /// Get the topic for this event.
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            NodeEvent::BlockAdded(_) | NodeEvent::BlockRemoved(_) | NodeEvent::BlockListChanged => {
                EventTopic::Blocks
            }
            NodeEvent::NetworkStatusChanged(_) => EventTopic::Network,
            NodeEvent::ForgingStatusChanged(_) => EventTopic::Forging,
            NodeEvent::TransactionAdded(_) => EventTopic::Transactions,
            NodeEvent::WalletSyncProgress { .. } | NodeEvent::ChainSyncProgress { .. } => {
                EventTopic::Sync
            }
        }
    }

    /// Short label for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            NodeEvent::BlockAdded(_) => "block_added",
            NodeEvent::BlockRemoved(_) => "block_removed",
            NodeEvent::BlockListChanged => "block_list_changed",
            NodeEvent::NetworkStatusChanged(_) => "network_status_changed",
            NodeEvent::ForgingStatusChanged(_) => "forging_status_changed",
            NodeEvent::TransactionAdded(_) => "transaction_added",
            NodeEvent::WalletSyncProgress { .. } => "wallet_sync_progress",
            NodeEvent::ChainSyncProgress { .. } => "chain_sync_progress",
        }
    }
}

/// Event topics for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTopic {
    Blocks,
    Network,
    Forging,
    Transactions,
    Sync,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &NodeEvent) -> bool {
        self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic())
    }
}
