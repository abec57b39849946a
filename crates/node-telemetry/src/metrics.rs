//! Prometheus metrics for the Helix node.
//!
//! All metrics follow the naming convention: `hx_<area>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // NETWORK STATUS
    // =========================================================================

    /// Peers with a registered height
    pub static ref PEERS_WITH_HEIGHT: Gauge = Gauge::new(
        "hx_network_peers",
        "Number of peers that reported a chain height"
    ).expect("metric creation failed");

    /// Network status code (0 no connections, 1 synchronizing, 2 ok)
    pub static ref NETWORK_STATUS: Gauge = Gauge::new(
        "hx_network_status",
        "Current network status code"
    ).expect("metric creation failed");

    /// Dishonest-peer reports sent to the network layer
    pub static ref DISHONEST_REPORTS: Counter = Counter::new(
        "hx_network_dishonest_reports_total",
        "Peers reported for protocol violations"
    ).expect("metric creation failed");

    // =========================================================================
    // BLOCK STORE
    // =========================================================================

    /// Current chain height
    pub static ref CHAIN_HEIGHT: Gauge = Gauge::new(
        "hx_store_chain_height",
        "Height of the chain tip"
    ).expect("metric creation failed");

    pub static ref BLOCKS_STORED: Counter = Counter::new(
        "hx_store_blocks_added_total",
        "Blocks written to the block store"
    ).expect("metric creation failed");

    pub static ref BLOCKS_REMOVED: Counter = Counter::new(
        "hx_store_blocks_removed_total",
        "Blocks deleted from the block store"
    ).expect("metric creation failed");

    // =========================================================================
    // DISPATCH AND SYNC
    // =========================================================================

    /// Inbound messages by kind and outcome
    pub static ref MESSAGES_DISPATCHED: CounterVec = CounterVec::new(
        Opts::new("hx_dispatch_messages_total", "Inbound messages handled"),
        &["kind", "outcome"]
    ).expect("metric creation failed");

    /// Time spent inside the dispatcher critical section
    pub static ref DISPATCH_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "hx_dispatch_duration_seconds",
            "Time spent handling one inbound message"
        ).buckets(exponential_buckets(0.00001, 2.0, 16).unwrap_or_default())
    ).expect("metric creation failed");

    pub static ref TRANSACTIONS_ADMITTED: Counter = Counter::new(
        "hx_pool_transactions_admitted_total",
        "Transactions admitted to the unconfirmed pool"
    ).expect("metric creation failed");

    /// Synchronization runs by outcome
    pub static ref SYNC_ROUNDS: CounterVec = CounterVec::new(
        Opts::new("hx_sync_runs_total", "Synchronization runs"),
        &["outcome"]  // outcome: caught_up/behind/interrupted/failed
    ).expect("metric creation failed");
}

/// Keeps the registry alive.
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry. Registering twice is
/// harmless.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Network
        Box::new(PEERS_WITH_HEIGHT.clone()),
        Box::new(NETWORK_STATUS.clone()),
        Box::new(DISHONEST_REPORTS.clone()),
        // Store
        Box::new(CHAIN_HEIGHT.clone()),
        Box::new(BLOCKS_STORED.clone()),
        Box::new(BLOCKS_REMOVED.clone()),
        // Dispatch and sync
        Box::new(MESSAGES_DISPATCHED.clone()),
        Box::new(DISPATCH_DURATION.clone()),
        Box::new(TRANSACTIONS_ADMITTED.clone()),
        Box::new(SYNC_ROUNDS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_twice() {
        register_metrics().unwrap();
        register_metrics().unwrap();
    }

    #[test]
    fn test_encode_contains_registered_metric() {
        register_metrics().unwrap();
        CHAIN_HEIGHT.set(7.0);
        let text = encode_metrics().unwrap();
        assert!(text.contains("hx_store_chain_height 7"));
    }

    #[test]
    fn test_labelled_counter() {
        MESSAGES_DISPATCHED
            .with_label_values(&["ping", "replied"])
            .inc();
        assert!(
            MESSAGES_DISPATCHED
                .with_label_values(&["ping", "replied"])
                .get()
                >= 1.0
        );
    }

    #[test]
    fn test_histogram_timer() {
        let before = DISPATCH_DURATION.get_sample_count();
        drop(HistogramTimer::new(&DISPATCH_DURATION));
        assert_eq!(DISPATCH_DURATION.get_sample_count(), before + 1);
    }
}
