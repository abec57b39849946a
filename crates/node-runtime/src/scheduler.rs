//! # Scheduled Tasks
//!
//! Background work that runs beside the dispatcher, each as one Tokio task
//! that exits when the shutdown signal fires:
//!
//! | Task | Trigger | Work |
//! |------|---------|------|
//! | post-connect | `connection_timeout` after `NoConnections → Ok` | status summary, wallet resync |
//! | height broadcast | every `height_broadcast_interval` | send our height to one random peer |
//! | sync check | every `sync_check_interval` | run the sync driver when behind |
//! | metrics | every hub event | keep gauges and counters current |
//!
//! None of them take the dispatcher lock.

use crate::adapters::LocalChain;
use chrono::{TimeZone, Utc};
use hx_02_network_status::{ConnectedHook, NetworkStatusApi};
use hx_03_chain_sync::{
    ChainReader, ChainSyncApi, NetworkGateway, ShutdownSignal, SyncError, SyncReport,
    WalletMonitor,
};
use node_telemetry::metric_inc;
use node_telemetry::metrics::{
    BLOCKS_REMOVED, BLOCKS_STORED, CHAIN_HEIGHT, NETWORK_STATUS, PEERS_WITH_HEIGHT, SYNC_ROUNDS,
    TRANSACTIONS_ADMITTED,
};
use rand::seq::SliceRandom;
use shared_bus::{NodeEvent, Subscription};
use shared_types::{Message, MessagePayload, NetworkStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Arms the post-connect timer. Installed as the status service's
/// [`ConnectedHook`]; arming again restarts the countdown.
#[derive(Debug, Default)]
pub struct PostConnectTrigger {
    notify: Notify,
}

impl PostConnectTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&self) {
        self.notify.notify_one();
    }

    async fn armed(&self) {
        self.notify.notified().await;
    }
}

impl ConnectedHook for PostConnectTrigger {
    fn on_connected(&self) {
        debug!("Post-connect timer armed");
        self.arm();
    }
}

/// What the scheduled tasks work on.
#[derive(Clone)]
pub struct SchedulerContext {
    pub status: Arc<dyn NetworkStatusApi>,
    pub chain: Arc<LocalChain>,
    pub sync: Arc<dyn ChainSyncApi>,
    pub network: Arc<dyn NetworkGateway>,
    pub wallet: Arc<dyn WalletMonitor>,
}

// =============================================================================
// POST-CONNECT
// =============================================================================

pub async fn run_post_connect(
    ctx: SchedulerContext,
    trigger: Arc<PostConnectTrigger>,
    timeout: Duration,
    mut shutdown: ShutdownSignal,
) {
    loop {
        tokio::select! {
            _ = trigger.armed() => {}
            _ = shutdown.wait() => return,
        }

        loop {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => {
                    post_connect(&ctx);
                    break;
                }
                _ = trigger.armed() => debug!("Post-connect timer re-armed"),
                _ = shutdown.wait() => return,
            }
        }
    }
}

/// Body of the post-connect timer.
pub fn post_connect(ctx: &SchedulerContext) {
    if ctx.status.status() != NetworkStatus::Ok {
        debug!(status = %ctx.status.status(), "Post-connect check skipped");
        return;
    }

    match ctx.chain.last_block() {
        Ok(Some(tip)) => {
            let time = i64::try_from(tip.timestamp)
                .ok()
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| tip.timestamp.to_string());
            info!(
                signature = %tip.signature.short(),
                height = tip.height,
                time = %time,
                peers = ctx.status.peer_heights().len(),
                "Connected, chain tip"
            );
        }
        Ok(None) => info!("Connected, chain is empty"),
        Err(e) => warn!(error = %e, "Connected, but the chain tip is unreadable"),
    }

    ctx.status.clear_offline_since();

    if ctx.wallet.needs_resync() && !ctx.wallet.is_resync_in_progress() {
        info!("Wallet is behind, requesting resync");
        ctx.wallet.request_resync();
    }
}

// =============================================================================
// HEIGHT BROADCAST
// =============================================================================

pub async fn run_height_broadcast(
    ctx: SchedulerContext,
    period: Duration,
    mut shutdown: ShutdownSignal,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                broadcast_height(&ctx);
            }
            _ = shutdown.wait() => return,
        }
    }
}

/// Send our height to one active peer chosen at random, while status is `Ok`.
/// Returns whether a message went out.
pub fn broadcast_height(ctx: &SchedulerContext) -> bool {
    if ctx.status.status() != NetworkStatus::Ok {
        return false;
    }
    let peers = ctx.network.active_peers();
    let Some(peer) = peers.choose(&mut rand::thread_rng()) else {
        return false;
    };

    let height = ctx.chain.height();
    match peer.send(Message::new(MessagePayload::Height { height })) {
        Ok(()) => {
            debug!(peer = %peer.id(), height, "Height announced");
            true
        }
        Err(e) => {
            debug!(peer = %peer.id(), error = %e, "Height announcement failed");
            false
        }
    }
}

// =============================================================================
// SYNC CHECK
// =============================================================================

pub async fn run_sync_check(ctx: SchedulerContext, period: Duration, mut shutdown: ShutdownSignal) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.wait() => return,
        }
        if shutdown.is_shutdown() {
            return;
        }
        if !ctx.sync.is_up_to_date() && !ctx.sync.is_running() {
            let result = ctx.sync.update().await;
            record_sync(&result, ctx.sync.is_up_to_date());
        }
    }
}

/// Count one finished `update()` by outcome.
pub fn record_sync(result: &Result<SyncReport, SyncError>, up_to_date: bool) {
    let outcome = match result {
        Ok(report) if report.interrupted => "interrupted",
        Ok(_) if up_to_date => "caught_up",
        Ok(_) => "behind",
        Err(SyncError::AlreadyRunning) => return,
        Err(_) => "failed",
    };
    metric_inc!(SYNC_ROUNDS, &[outcome]);

    match result {
        Ok(report) => info!(
            outcome,
            gained = report.blocks_gained(),
            rounds = report.rounds,
            failed_rounds = report.failed_rounds,
            status = %report.final_status,
            "Synchronization finished"
        ),
        Err(e) => warn!(outcome, error = %e, "Synchronization failed"),
    }
}

// =============================================================================
// METRICS
// =============================================================================

pub async fn run_metrics(
    ctx: SchedulerContext,
    mut events: Subscription,
    mut shutdown: ShutdownSignal,
) {
    CHAIN_HEIGHT.set(ctx.chain.height() as f64);
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => observe(&ctx, &event),
                None => return,
            },
            _ = shutdown.wait() => return,
        }
    }
}

fn observe(ctx: &SchedulerContext, event: &NodeEvent) {
    match event {
        NodeEvent::BlockAdded(_) => {
            metric_inc!(BLOCKS_STORED);
            CHAIN_HEIGHT.set(ctx.chain.height() as f64);
        }
        NodeEvent::BlockRemoved(_) => {
            metric_inc!(BLOCKS_REMOVED);
            CHAIN_HEIGHT.set(ctx.chain.height() as f64);
        }
        NodeEvent::NetworkStatusChanged(status) => {
            NETWORK_STATUS.set(f64::from(status.code()));
            PEERS_WITH_HEIGHT.set(ctx.status.peer_heights().len() as f64);
        }
        NodeEvent::TransactionAdded(_) => metric_inc!(TRANSACTIONS_ADMITTED),
        NodeEvent::BlockListChanged
        | NodeEvent::ForgingStatusChanged(_)
        | NodeEvent::WalletSyncProgress { .. }
        | NodeEvent::ChainSyncProgress { .. } => {}
    }
}
