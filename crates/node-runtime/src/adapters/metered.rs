//! Network gateway decorator that counts dishonest-peer reports.

use hx_03_chain_sync::NetworkGateway;
use node_telemetry::metric_inc;
use node_telemetry::metrics::DISHONEST_REPORTS;
use shared_types::{Message, PeerId, PeerRef};
use std::sync::Arc;

pub struct MeteredGateway {
    inner: Arc<dyn NetworkGateway>,
}

impl MeteredGateway {
    pub fn new(inner: Arc<dyn NetworkGateway>) -> Self {
        Self { inner }
    }
}

impl NetworkGateway for MeteredGateway {
    fn broadcast(&self, message: Message, exclude: &[PeerId]) -> usize {
        self.inner.broadcast(message, exclude)
    }

    fn report_dishonest(&self, peer: PeerId, reason: &str) {
        metric_inc!(DISHONEST_REPORTS);
        self.inner.report_dishonest(peer, reason);
    }

    fn active_peers(&self) -> Vec<PeerRef> {
        self.inner.active_peers()
    }
}
