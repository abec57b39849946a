//! # Domain Errors

use shared_types::PeerId;
use thiserror::Error;

/// Failure reported by a chain collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("chain storage failed: {0}")]
    Storage(String),

    #[error("block rejected: {0}")]
    Rejected(String),
}

/// Failure of a synchronization step or round.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The peer went away mid-step.
    #[error("{peer} disconnected during synchronization")]
    PeerDisconnected { peer: PeerId },

    /// The peer served a block that does not extend our chain.
    #[error("{peer} served an invalid block at height {height}")]
    InvalidBlock { peer: PeerId, height: u64 },

    /// The peer did not answer a request in time.
    #[error("{peer} did not answer: {reason}")]
    Unresponsive { peer: PeerId, reason: String },

    #[error(transparent)]
    Chain(#[from] ChainError),

    /// Shutdown was requested while the step was running.
    #[error("synchronization interrupted by shutdown")]
    Interrupted,

    /// Another `update()` is already in progress.
    #[error("synchronization already running")]
    AlreadyRunning,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_error_converts() {
        let err: SyncError = ChainError::Storage("disk full".into()).into();
        assert_eq!(err.to_string(), "chain storage failed: disk full");
    }

    #[test]
    fn test_display_names_peer() {
        let err = SyncError::Unresponsive {
            peer: PeerId(9),
            reason: "timeout".into(),
        };
        assert_eq!(err.to_string(), "peer-9 did not answer: timeout");
    }
}
