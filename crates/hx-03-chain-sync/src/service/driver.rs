//! # Synchronization Driver
//!
//! `update()` keeps choosing the best peer and handing it to the
//! [`Synchronizer`] until no registered peer is ahead of the local chain.
//! A failing peer is reported and the target is chosen again. A stalled
//! round only counts against the failure limit.

use crate::domain::errors::SyncError;
use crate::domain::outcome::SyncReport;
use crate::domain::shutdown::ShutdownSignal;
use crate::ports::inbound::ChainSyncApi;
use crate::ports::outbound::{ChainReader, NetworkGateway, Synchronizer};
use async_trait::async_trait;
use hx_02_network_status::NetworkStatusApi;
use shared_bus::{EventPublisher, NodeEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Collaborators of the driver.
pub struct SyncDriverDependencies {
    pub status: Arc<dyn NetworkStatusApi>,
    pub chain: Arc<dyn ChainReader>,
    pub synchronizer: Arc<dyn Synchronizer>,
    pub network: Arc<dyn NetworkGateway>,
    /// Receives `ChainSyncProgress`.
    pub publisher: Arc<dyn EventPublisher>,
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Pause after a failed round before choosing the next target.
    pub retry_delay: Duration,
    /// Failed rounds tolerated in one `update()` before giving up until
    /// the next call.
    pub max_failed_rounds: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(1),
            max_failed_rounds: 16,
        }
    }
}

/// Drives the local chain towards the best height any peer reports.
pub struct SyncDriver {
    deps: SyncDriverDependencies,
    config: SyncConfig,
    shutdown: ShutdownSignal,
    running: AtomicBool,
}

/// Clears the running flag however `update()` ends, including when its
/// future is dropped.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SyncDriver {
    pub fn new(deps: SyncDriverDependencies, config: SyncConfig, shutdown: ShutdownSignal) -> Self {
        Self {
            deps,
            config,
            shutdown,
            running: AtomicBool::new(false),
        }
    }

    /// Wait out the retry delay unless shutdown comes first.
    async fn back_off(&self) {
        let mut shutdown = self.shutdown.clone();
        tokio::select! {
            _ = tokio::time::sleep(self.config.retry_delay) => {}
            _ = shutdown.wait() => {}
        }
    }

    async fn run(&self) -> SyncReport {
        let start_height = self.deps.chain.height();
        let mut rounds = 0;
        let mut failed_rounds = 0;
        let mut interrupted = false;

        self.deps.status.begin_sync();

        loop {
            if self.shutdown.is_shutdown() {
                interrupted = true;
                break;
            }
            let local_height = self.deps.chain.height();
            let best_height = self.deps.status.max_peer_height();
            if local_height >= best_height {
                break;
            }
            if failed_rounds >= self.config.max_failed_rounds {
                warn!(failed_rounds, local_height, best_height, "[hx-03] Giving up this sync round");
                break;
            }
            let Some(target) = self.deps.status.select_sync_target() else {
                debug!("[hx-03] No reachable peer to synchronize from");
                break;
            };

            rounds += 1;
            let peer = target.peer.id();
            debug!(%peer, target_height = target.height, local_height, "[hx-03] Synchronizing");

            let result = self
                .deps
                .synchronizer
                .synchronize(target.peer.clone(), self.shutdown.clone())
                .await;
            let reached = self.deps.chain.height();

            match result {
                Ok(_) if reached > local_height => {
                    self.deps
                        .publisher
                        .publish(NodeEvent::ChainSyncProgress { height: reached });
                }
                Ok(_) => {
                    // Nothing past our tip yet is not a protocol violation.
                    failed_rounds += 1;
                    debug!(%peer, local_height, "[hx-03] Round made no progress");
                    self.back_off().await;
                }
                Err(SyncError::Interrupted) => {
                    interrupted = true;
                    break;
                }
                Err(e) => {
                    failed_rounds += 1;
                    warn!(%peer, error = %e, "[hx-03] Synchronization failed");
                    self.deps.network.report_dishonest(peer, &e.to_string());
                    self.back_off().await;
                }
            }
        }

        let final_status = self.deps.status.finish_sync();
        let report = SyncReport {
            start_height,
            end_height: self.deps.chain.height(),
            rounds,
            failed_rounds,
            interrupted,
            final_status,
        };
        info!(
            start_height = report.start_height,
            end_height = report.end_height,
            rounds,
            failed_rounds,
            interrupted,
            status = %final_status,
            "[hx-03] Synchronization finished"
        );
        report
    }
}

#[async_trait]
impl ChainSyncApi for SyncDriver {
    async fn update(&self) -> Result<SyncReport, SyncError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SyncError::AlreadyRunning);
        }
        let _guard = RunningGuard(&self.running);
        Ok(self.run().await)
    }

    fn is_up_to_date(&self) -> bool {
        self.deps.status.is_up_to_date(self.deps.chain.height())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
