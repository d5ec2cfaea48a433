//! Relay control plane library.
//!
//! Operator-facing control and telemetry for a multi-upstream traffic relay:
//! persisted proxy definitions, feature flags, the live proxy pool, and
//! windowed per-upstream throughput.

pub mod admin;
pub mod config;
pub mod features;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pool;
pub mod stats;
pub mod upstream;

pub use admin::AdminService;
pub use config::{ConfigStore, ConfigTree, Settings};
pub use features::{FeatureFlag, FeatureFlags};
pub use http::AdminServer;
pub use lifecycle::Shutdown;
pub use pool::ProxyPool;
pub use stats::{CounterRegistry, StatsPresenter};
