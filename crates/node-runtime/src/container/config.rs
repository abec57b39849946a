//! # Node Configuration
//!
//! Unified configuration for the subsystems and runtime parameters.
//!
//! ## Sources (later wins)
//!
//! 1. Built-in defaults
//! 2. Optional TOML file (`--config`)
//! 3. `HX_*` environment variables
//! 4. Command line flags
//!
//! Every section is `#[serde(default)]`, so a file only names what it changes.

use hx_03_chain_sync::{FeeThresholds, SyncConfig, DEFAULT_MAX_SIGNATURES};
use node_telemetry::TelemetryConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Complete node configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Network configuration.
    pub network: NetworkConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Inbound message handling.
    pub dispatch: DispatchSettings,
    /// Logging configuration.
    pub telemetry: TelemetryConfig,
}

impl NodeConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Override fields from `HX_*` environment variables.
    ///
    /// - `HX_DATA_DIR`: storage data directory
    /// - `HX_CHECKPOINTING`: `true`/`false`
    /// - `HX_STORAGE_BACKEND`: `file` or `rocksdb`
    /// - plus the telemetry variables
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(dir) = std::env::var("HX_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Ok(value) = std::env::var("HX_CHECKPOINTING") {
            self.storage.checkpointing = parse_flag("HX_CHECKPOINTING", &value)?;
        }
        if let Ok(value) = std::env::var("HX_STORAGE_BACKEND") {
            self.storage.backend = value.parse()?;
        }
        self.telemetry.apply_env();
        Ok(())
    }

    /// Reject settings the scheduler cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let intervals = [
            ("network.connection_timeout_secs", self.network.connection_timeout_secs),
            (
                "network.height_broadcast_interval_secs",
                self.network.height_broadcast_interval_secs,
            ),
            ("network.sync_check_interval_secs", self.network.sync_check_interval_secs),
        ];
        for (field, value) in intervals {
            if value == 0 {
                return Err(ConfigError::ZeroInterval { field });
            }
        }
        if self.network.max_signatures == 0 {
            return Err(ConfigError::Invalid {
                field: "network.max_signatures",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.storage.backup_dir_name.is_empty() || self.storage.backup_dir_name == CHAIN_DIR_NAME
        {
            return Err(ConfigError::Invalid {
                field: "storage.backup_dir_name",
                reason: format!("must be non-empty and differ from '{CHAIN_DIR_NAME}'"),
            });
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {message}", .path.display())]
    Read { path: PathBuf, message: String },

    #[error("invalid config file: {0}")]
    Parse(String),

    /// A scheduler interval is zero.
    #[error("{field} must be greater than zero")]
    ZeroInterval { field: &'static str },

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn parse_flag(variable: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            field: variable,
            reason: format!("expected a boolean, got '{value}'"),
        }),
    }
}

/// Network configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Delay between the first peer report and the post-connect check.
    pub connection_timeout_secs: u64,
    /// Period of the random-peer height announcement.
    pub height_broadcast_interval_secs: u64,
    /// Period of the "are we behind" check that starts a sync.
    pub sync_check_interval_secs: u64,
    /// Pause after a failed sync round before choosing the next peer.
    pub sync_retry_delay_ms: u64,
    /// Failed rounds tolerated in one synchronization run.
    pub max_failed_sync_rounds: u32,
    /// Cap on signatures in one `Signatures` reply.
    pub max_signatures: usize,
    /// Version string sent in the handshake.
    pub version: String,
    /// Build time sent in the handshake, Unix milliseconds.
    pub build_timestamp: u64,
}

impl NetworkConfig {
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    pub fn height_broadcast_interval(&self) -> Duration {
        Duration::from_secs(self.height_broadcast_interval_secs)
    }

    pub fn sync_check_interval(&self) -> Duration {
        Duration::from_secs(self.sync_check_interval_secs)
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            retry_delay: Duration::from_millis(self.sync_retry_delay_ms),
            max_failed_rounds: self.max_failed_sync_rounds,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connection_timeout_secs: 60,
            height_broadcast_interval_secs: 5 * 60,
            sync_check_interval_secs: 10,
            sync_retry_delay_ms: 1_000,
            max_failed_sync_rounds: 16,
            max_signatures: DEFAULT_MAX_SIGNATURES,
            version: env!("CARGO_PKG_VERSION").to_string(),
            build_timestamp: 0,
        }
    }
}

/// Directory under `data_dir` holding the live store.
pub const CHAIN_DIR_NAME: &str = "chain";

/// Key-value backend of the block store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Append-only log file, compacted on open.
    #[default]
    File,
    /// RocksDB, available with the `rocksdb` feature.
    RocksDb,
}

impl std::str::FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(StorageBackend::File),
            "rocksdb" => Ok(StorageBackend::RocksDb),
            other => Err(ConfigError::Invalid {
                field: "storage.backend",
                reason: format!("unknown backend '{other}'"),
            }),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory: lock file, live store and checkpoint.
    pub data_dir: PathBuf,
    pub backend: StorageBackend,
    /// Copy the store aside on clean shutdown and restore it after a crash.
    pub checkpointing: bool,
    /// Checkpoint directory name under `data_dir`.
    pub backup_dir_name: String,
}

impl StorageConfig {
    /// Directory of the live store.
    pub fn chain_dir(&self) -> PathBuf {
        self.data_dir.join(CHAIN_DIR_NAME)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.data_dir.join(&self.backup_dir_name)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            backend: StorageBackend::File,
            checkpointing: true,
            backup_dir_name: "backup".to_string(),
        }
    }
}

/// Fee floors for relayed transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    pub min_fee: u64,
    pub min_fee_per_byte: u64,
}

impl DispatchSettings {
    pub fn fee_thresholds(&self) -> FeeThresholds {
        FeeThresholds {
            min_fee: self.min_fee,
            min_fee_per_byte: self.min_fee_per_byte,
        }
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        let fees = FeeThresholds::default();
        Self {
            min_fee: fees.min_fee,
            min_fee_per_byte: fees.min_fee_per_byte,
        }
    }
}
