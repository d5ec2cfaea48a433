//! Traffic statistics subsystem.
//!
//! # Data Flow
//! ```text
//! Connection layer:
//!     registry.open(public_name) → CounterGuard
//!     → record_rx / record_tx on every read/write
//!     → guard dropped on close (counter stays readable)
//!
//! Operator request:
//!     presenter.rs
//!     → registry.rs (snapshot groups, scan counters over the window)
//!     → aggregate.rs (bytes, active seconds, rate)
//!     → format.rs (labels)
//!     → merged with the live proxy list
//! ```

pub mod aggregate;
pub mod counter;
pub mod format;
pub mod presenter;
pub mod registry;

pub use aggregate::{AggregateStat, Direction, TrafficStat};
pub use counter::{Counter, CounterGuard};
pub use presenter::{ProxyStatsView, StatsPresenter, ViewRow};
pub use registry::CounterRegistry;
