//! Results of dispatching a message and of a synchronization round.

use shared_types::NetworkStatus;

/// What the dispatcher did with one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A reply was sent to the sender.
    Replied,
    /// The sender's height or version was recorded.
    Recorded,
    /// The block was applied and relayed to `peers` other peers.
    BlockRelayed { peers: usize },
    /// The block was invalid or not newly accepted.
    BlockNotApplied,
    /// A wallet resync is running; the block was not applied.
    BlockDeferred,
    /// The transaction entered the pool and was relayed to `peers` peers.
    TransactionAdmitted { peers: usize },
    /// The transaction was below the fee thresholds or already confirmed.
    TransactionDropped,
    /// The sender broke protocol and was reported.
    Dishonest,
    /// Response-type message with no unsolicited meaning.
    Ignored,
    /// A local collaborator or the reply send failed.
    Failed,
    /// The dispatcher no longer accepts messages.
    Closed,
}

impl DispatchOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::Replied => "replied",
            DispatchOutcome::Recorded => "recorded",
            DispatchOutcome::BlockRelayed { .. } => "block_relayed",
            DispatchOutcome::BlockNotApplied => "block_not_applied",
            DispatchOutcome::BlockDeferred => "block_deferred",
            DispatchOutcome::TransactionAdmitted { .. } => "transaction_admitted",
            DispatchOutcome::TransactionDropped => "transaction_dropped",
            DispatchOutcome::Dishonest => "dishonest",
            DispatchOutcome::Ignored => "ignored",
            DispatchOutcome::Failed => "failed",
            DispatchOutcome::Closed => "closed",
        }
    }
}

/// Summary of one `update()` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub start_height: u64,
    pub end_height: u64,
    /// Synchronizer invocations.
    pub rounds: u32,
    /// Rounds that failed or made no progress.
    pub failed_rounds: u32,
    /// Stopped because shutdown was requested.
    pub interrupted: bool,
    /// Status after the post-sync refresh.
    pub final_status: NetworkStatus,
}

impl SyncReport {
    pub fn blocks_gained(&self) -> u64 {
        self.end_height.saturating_sub(self.start_height)
    }
}
