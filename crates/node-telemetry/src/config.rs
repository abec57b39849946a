//! Telemetry configuration.

use serde::{Deserialize, Serialize};
use std::env;

/// Logging settings. Read from the `[telemetry]` section of the node
/// config, then overridden by environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Service name attached to startup logs
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or a full
    /// `EnvFilter` directive
    pub log_level: String,

    /// Whether to write logs to stdout
    pub console_output: bool,

    /// Whether to emit JSON log lines
    pub json_logs: bool,

    /// Network identifier (mainnet, testnet)
    pub network: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "helix-node".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            network: "mainnet".to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Defaults overridden by environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields from `HX_*` environment variables.
    ///
    /// - `HX_LOG_LEVEL` or `RUST_LOG`: Log level
    /// - `HX_CONSOLE_OUTPUT`: Enable console output
    /// - `HX_JSON_LOGS`: Enable JSON logs (defaults on inside containers)
    /// - `HX_NETWORK`: Network name
    pub fn apply_env(&mut self) {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        if let Ok(level) = env::var("HX_LOG_LEVEL").or_else(|_| env::var("RUST_LOG")) {
            self.log_level = level;
        }
        if let Ok(v) = env::var("HX_CONSOLE_OUTPUT") {
            self.console_output = v.to_lowercase() != "false" && v != "0";
        }
        match env::var("HX_JSON_LOGS") {
            Ok(v) => self.json_logs = v.to_lowercase() == "true" || v == "1",
            Err(_) if is_container => self.json_logs = true,
            Err(_) => {}
        }
        if let Ok(network) = env::var("HX_NETWORK") {
            self.network = network;
        }
    }
}
