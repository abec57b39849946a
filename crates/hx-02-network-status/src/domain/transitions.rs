//! # Status Transitions
//!
//! The transition table of the network status state machine, kept free of
//! locks and side effects.

use shared_types::NetworkStatus;

/// Something that may move the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTrigger {
    /// A peer reported its height or version.
    PeerObserved,
    /// The height registry became empty.
    RegistryEmptied,
    /// The synchronization driver started a round.
    SyncStarted,
    /// The synchronization driver finished a round.
    SyncFinished { peers_remaining: bool },
}

/// Outcome of applying a trigger to the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: NetworkStatus,
    pub to: NetworkStatus,
    /// Whether `NetworkStatusChanged(to)` must be published.
    pub notify: bool,
    /// Whether this is the `NoConnections -> Ok` edge that arms the
    /// post-connect timer.
    pub connected: bool,
}

impl Transition {
    pub fn apply(from: NetworkStatus, trigger: StatusTrigger) -> Self {
        let to = match trigger {
            StatusTrigger::PeerObserved if from == NetworkStatus::NoConnections => {
                NetworkStatus::Ok
            }
            StatusTrigger::PeerObserved => from,
            StatusTrigger::RegistryEmptied => NetworkStatus::NoConnections,
            StatusTrigger::SyncStarted => NetworkStatus::Synchronizing,
            StatusTrigger::SyncFinished { peers_remaining: true } => NetworkStatus::Ok,
            StatusTrigger::SyncFinished { peers_remaining: false } => NetworkStatus::NoConnections,
        };

        // The post-sync refresh is published even when nothing changed.
        let forced = matches!(trigger, StatusTrigger::SyncFinished { .. });

        Self {
            from,
            to,
            notify: forced || from != to,
            connected: from == NetworkStatus::NoConnections && to == NetworkStatus::Ok,
        }
    }

    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use NetworkStatus::*;

    #[test]
    fn test_first_peer_connects() {
        let t = Transition::apply(NoConnections, StatusTrigger::PeerObserved);
        assert_eq!(t.to, Ok);
        assert!(t.notify);
        assert!(t.connected);
    }

    #[test]
    fn test_peer_observed_while_syncing_keeps_status() {
        let t = Transition::apply(Synchronizing, StatusTrigger::PeerObserved);
        assert_eq!(t.to, Synchronizing);
        assert!(!t.notify);
        assert!(!t.connected);
    }

    #[test]
    fn test_registry_emptied_notifies_once() {
        let first = Transition::apply(Ok, StatusTrigger::RegistryEmptied);
        assert!(first.notify);
        let second = Transition::apply(first.to, StatusTrigger::RegistryEmptied);
        assert!(!second.notify);
    }

    #[test]
    fn test_sync_finished_always_notifies() {
        let t = Transition::apply(Ok, StatusTrigger::SyncFinished { peers_remaining: true });
        assert!(!t.changed());
        assert!(t.notify);
        assert!(!t.connected);

        let t = Transition::apply(
            Synchronizing,
            StatusTrigger::SyncFinished { peers_remaining: false },
        );
        assert_eq!(t.to, NoConnections);
        assert!(t.notify);
    }

    #[test]
    fn test_sync_finished_from_no_connections_arms_timer() {
        let t = Transition::apply(
            NoConnections,
            StatusTrigger::SyncFinished { peers_remaining: true },
        );
        assert!(t.connected);
    }
}
