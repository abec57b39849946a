//! # Chain Sync Services

mod dispatcher;
mod driver;
#[cfg(test)]
mod tests;

pub use dispatcher::{DispatchConfig, DispatcherDependencies, MessageDispatcher};
pub use driver::{SyncConfig, SyncDriver, SyncDriverDependencies};
