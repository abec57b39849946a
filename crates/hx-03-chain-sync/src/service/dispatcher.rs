//! # Message Dispatcher
//!
//! Every message from every connection passes through one mutex. Nothing
//! else in the node mutates chain or registry state from network input, so
//! holding it for the whole handler gives a linear history of effects.

use crate::domain::fees::FeeThresholds;
use crate::domain::outcome::DispatchOutcome;
use crate::ports::inbound::MessageDispatch;
use crate::ports::outbound::{
    ChainApplier, ChainReader, ChainValidator, NetworkGateway, TransactionPolicy, UnconfirmedPool,
    WalletMonitor,
};
use crate::DEFAULT_MAX_SIGNATURES;
use hx_02_network_status::NetworkStatusApi;
use parking_lot::Mutex;
use shared_bus::{EventPublisher, NodeEvent};
use shared_types::{
    Block, BlockSignature, InboundMessage, Message, MessagePayload, Transaction, TransactionType,
    VersionInfo,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Collaborators of the dispatcher.
pub struct DispatcherDependencies {
    pub status: Arc<dyn NetworkStatusApi>,
    pub chain: Arc<dyn ChainReader>,
    pub validator: Arc<dyn ChainValidator>,
    pub applier: Arc<dyn ChainApplier>,
    pub pool: Arc<dyn UnconfirmedPool>,
    pub policy: Arc<dyn TransactionPolicy>,
    pub network: Arc<dyn NetworkGateway>,
    pub wallet: Arc<dyn WalletMonitor>,
    /// Receives `TransactionAdded`.
    pub publisher: Arc<dyn EventPublisher>,
}

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub fees: FeeThresholds,
    /// Cap on signatures in one `Signatures` reply.
    pub max_signatures: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            fees: FeeThresholds::default(),
            max_signatures: DEFAULT_MAX_SIGNATURES,
        }
    }
}

/// Strictly serialized handler for inbound messages.
pub struct MessageDispatcher {
    deps: DispatcherDependencies,
    config: DispatchConfig,
    /// Held for the full body of every dispatch.
    gate: Mutex<()>,
    accepting: AtomicBool,
}

impl MessageDispatcher {
    pub fn new(deps: DispatcherDependencies, config: DispatchConfig) -> Self {
        Self {
            deps,
            config,
            gate: Mutex::new(()),
            accepting: AtomicBool::new(true),
        }
    }

    fn handle(&self, inbound: &InboundMessage) -> DispatchOutcome {
        match inbound.payload() {
            MessagePayload::Ping => self.reply(inbound, MessagePayload::Pong),
            MessagePayload::Height { height } => {
                self.deps.status.record_height(&inbound.sender, *height);
                DispatchOutcome::Recorded
            }
            MessagePayload::GetSignatures { parent } => self.on_get_signatures(inbound, parent),
            MessagePayload::GetBlock { signature } => self.on_get_block(inbound, signature),
            MessagePayload::Block { block, height } => self.on_block(inbound, block, *height),
            MessagePayload::Transaction(tx) => self.on_transaction(inbound, tx),
            MessagePayload::Version {
                version,
                build_timestamp,
            } => {
                self.deps.status.record_version(
                    &inbound.sender,
                    VersionInfo::new(version.clone(), *build_timestamp),
                );
                DispatchOutcome::Recorded
            }
            MessagePayload::Pong
            | MessagePayload::Signatures { .. }
            | MessagePayload::BlockResponse { .. } => {
                debug!(
                    peer = %inbound.sender.id(),
                    kind = inbound.payload().kind(),
                    "[hx-03] Unsolicited response ignored"
                );
                DispatchOutcome::Ignored
            }
        }
    }

    fn reply(&self, inbound: &InboundMessage, payload: MessagePayload) -> DispatchOutcome {
        let response = Message::reply_to(&inbound.message, payload);
        match inbound.sender.send(response) {
            Ok(()) => DispatchOutcome::Replied,
            Err(e) => {
                warn!(peer = %inbound.sender.id(), error = %e, "[hx-03] Reply not delivered");
                DispatchOutcome::Failed
            }
        }
    }

    fn on_get_signatures(
        &self,
        inbound: &InboundMessage,
        parent: &BlockSignature,
    ) -> DispatchOutcome {
        match self
            .deps
            .chain
            .signatures_after(parent, self.config.max_signatures)
        {
            Ok(signatures) => self.reply(inbound, MessagePayload::Signatures { signatures }),
            Err(e) => {
                warn!(error = %e, parent = %parent.short(), "[hx-03] Signature lookup failed");
                DispatchOutcome::Failed
            }
        }
    }

    fn on_get_block(&self, inbound: &InboundMessage, signature: &BlockSignature) -> DispatchOutcome {
        match self.deps.chain.block(signature) {
            Ok(block) => self.reply(
                inbound,
                MessagePayload::BlockResponse {
                    block: block.map(Box::new),
                },
            ),
            Err(e) => {
                warn!(error = %e, signature = %signature.short(), "[hx-03] Block lookup failed");
                DispatchOutcome::Failed
            }
        }
    }

    fn on_block(&self, inbound: &InboundMessage, block: &Block, height: u64) -> DispatchOutcome {
        let sender = inbound.sender.id();
        let valid = self.deps.validator.is_new_block_valid(block);
        if valid {
            self.deps.status.record_height(&inbound.sender, height);
        }

        if self.deps.wallet.is_resync_in_progress() {
            debug!(peer = %sender, height, "[hx-03] Wallet resync running, block not applied");
            return DispatchOutcome::BlockDeferred;
        }
        if !valid {
            debug!(peer = %sender, height, "[hx-03] Block does not extend our chain");
            return DispatchOutcome::BlockNotApplied;
        }

        match self.deps.applier.apply_block(block) {
            Ok(true) => {
                info!(
                    peer = %sender,
                    height = block.height,
                    signature = %block.signature.short(),
                    "[hx-03] Received new valid block"
                );
                let peers = self
                    .deps
                    .network
                    .broadcast(inbound.message.clone(), &[sender]);
                DispatchOutcome::BlockRelayed { peers }
            }
            Ok(false) => DispatchOutcome::BlockNotApplied,
            Err(e) => {
                warn!(peer = %sender, error = %e, "[hx-03] Block application failed");
                DispatchOutcome::Failed
            }
        }
    }

    fn on_transaction(&self, inbound: &InboundMessage, tx: &Transaction) -> DispatchOutcome {
        let sender = inbound.sender.id();

        if tx.tx_type == TransactionType::Genesis || !self.deps.policy.is_signature_valid(tx) {
            warn!(peer = %sender, signature = %tx.signature, "[hx-03] Invalid transaction");
            self.deps
                .network
                .report_dishonest(sender, "invalid transaction signature");
            return DispatchOutcome::Dishonest;
        }

        if !self.config.fees.accepts(tx) || self.deps.pool.is_confirmed(tx) {
            debug!(peer = %sender, fee = tx.fee, "[hx-03] Transaction not relayed");
            return DispatchOutcome::TransactionDropped;
        }

        self.deps.pool.admit(tx.clone());
        self.deps
            .publisher
            .publish(NodeEvent::TransactionAdded(Arc::new(tx.clone())));
        let peers = self
            .deps
            .network
            .broadcast(inbound.message.clone(), &[sender]);
        DispatchOutcome::TransactionAdmitted { peers }
    }
}

impl MessageDispatch for MessageDispatcher {
    fn dispatch(&self, message: InboundMessage) -> DispatchOutcome {
        if !self.is_accepting() {
            return DispatchOutcome::Closed;
        }
        let _gate = self.gate.lock();
        // close() may have won the race for the gate.
        if !self.is_accepting() {
            return DispatchOutcome::Closed;
        }
        self.handle(&message)
    }

    fn close(&self) {
        self.accepting.store(false, Ordering::SeqCst);
        drop(self.gate.lock());
        debug!("[hx-03] Dispatcher closed");
    }

    fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }
}
