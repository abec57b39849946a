//! # Subsystem Container
//!
//! Configuration and the container holding every subsystem instance.

pub mod config;
pub mod subsystems;

pub use config::{
    ConfigError, DispatchSettings, NetworkConfig, NodeConfig, StorageBackend, StorageConfig,
};
pub use subsystems::SubsystemContainer;
