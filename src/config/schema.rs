//! Daemon settings.
//!
//! Read once at startup from a TOML file. Every field has a default so an
//! empty file (or no file at all) yields a runnable daemon. The persisted
//! proxy configuration lives elsewhere, see [`crate::config::tree`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::stats::aggregate::DEFAULT_RATE_UNIT_SCALE;

/// Root settings for the relay control daemon.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Admin HTTP listener.
    pub listener: ListenerConfig,

    /// Persisted proxy configuration.
    pub store: StoreConfig,

    /// Traffic statistics window and retention.
    pub stats: StatsConfig,

    /// Live pool construction.
    pub pool: PoolConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:2515").
    pub bind_address: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:2515".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl ListenerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON file holding the proxy configuration tree.
    pub path: PathBuf,

    /// Reload on external edits to `path`.
    pub watch: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("relay-config.json"),
            watch: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StatsConfig {
    /// Aggregation window of the proxies view, also the counter retention.
    pub window_secs: u64,

    /// Divisor turning bytes per second into displayed units.
    pub rate_unit_scale: f64,

    /// How often closed counters past retention are dropped.
    pub prune_interval_secs: u64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            window_secs: 600,
            rate_unit_scale: DEFAULT_RATE_UNIT_SCALE,
            prune_interval_secs: 60,
        }
    }
}

impl StatsConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn prune_interval(&self) -> Duration {
        Duration::from_secs(self.prune_interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PoolConfig {
    /// Upper bound on one construction; a timed-out build leaves the pool
    /// disabled.
    pub build_timeout_secs: u64,

    /// Members materialized for each enabled public pool.
    pub public_pool_slots: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            build_timeout_secs: 60,
            public_pool_slots: 4,
        }
    }
}

impl PoolConfig {
    pub fn build_timeout(&self) -> Duration {
        Duration::from_secs(self.build_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "info,relay_control=debug".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
