//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! config store, pool, counter registry, admin API
//!     → logging.rs (tracing events to stdout)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout / journald
//!     → Prometheus scrape endpoint
//! ```

pub mod logging;
pub mod metrics;
