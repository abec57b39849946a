//! # Driven Ports (Outbound SPI)

/// Called after the status moves from `NoConnections` to `Ok`.
///
/// Runs outside every status and registry lock. Implementations must return
/// quickly; the runtime uses it to (re)arm the post-connect timer.
pub trait ConnectedHook: Send + Sync {
    fn on_connected(&self);
}

/// Wall-clock source, in milliseconds since the Unix epoch.
pub trait TimeSource: Send + Sync {
    fn now_millis(&self) -> u64;
}
