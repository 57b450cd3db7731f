//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the balancer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BalancerConfig {
    /// Listener configuration (port, drain wait).
    pub listener: ListenerConfig,

    /// Backend server definitions, in round-robin order.
    pub backends: Vec<BackendConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl BalancerConfig {
    /// Backend addresses in configuration order.
    pub fn backend_addresses(&self) -> Vec<String> {
        self.backends.iter().map(|b| b.address.clone()).collect()
    }

    /// Upper bound on the shutdown drain wait.
    pub fn max_drain_wait(&self) -> Duration {
        Duration::from_secs(self.listener.max_drain_wait_secs)
    }

    /// Idle timeout applied to every relay read, if enabled.
    pub fn idle_timeout(&self) -> Option<Duration> {
        match self.timeouts.idle_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// TCP port to listen on (IPv4, all interfaces).
    pub port: u16,

    /// Seconds to wait for open connections to drain on shutdown.
    pub max_drain_wait_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            port: 1337,
            max_drain_wait_secs: 5,
        }
    }
}

/// One upstream server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Backend address (e.g., "127.0.0.1:3000").
    pub address: String,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Idle timeout for relay reads, in seconds. 0 disables it.
    pub idle_secs: u64,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-oriented log output at debug verbosity.
    pub debug: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            debug: false,
        }
    }
}
