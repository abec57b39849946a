//! # Driving Ports (Inbound API)

use crate::domain::errors::SyncError;
use crate::domain::outcome::{DispatchOutcome, SyncReport};
use async_trait::async_trait;
use shared_types::InboundMessage;

/// Single entry point for decoded inbound messages.
pub trait MessageDispatch: Send + Sync {
    /// Handle one message. Per-message failures are absorbed and reported
    /// through the outcome, never returned.
    fn dispatch(&self, message: InboundMessage) -> DispatchOutcome;

    /// Stop accepting messages and wait for the one in flight to finish.
    fn close(&self);

    fn is_accepting(&self) -> bool;
}

/// Chain synchronization control.
#[async_trait]
pub trait ChainSyncApi: Send + Sync {
    /// Synchronize until caught up, out of peers, or shut down.
    async fn update(&self) -> Result<SyncReport, SyncError>;

    /// No registered peer reports a height above ours.
    fn is_up_to_date(&self) -> bool;

    fn is_running(&self) -> bool;
}
