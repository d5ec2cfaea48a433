//! Live proxy pool.
//!
//! # Data Flow
//! ```text
//! Config committed
//!     → lifecycle.rs disable() (clear live list + counters)
//!     → lifecycle.rs enable(config) (new generation, spawn build)
//!     → factory.rs ProxyFactory::build (async, may fail or time out)
//!     → lifecycle.rs publishes the list if the generation is still current
//!
//! Readers:
//!     routing subsystem → live_proxies() (ArcSwap snapshot)
//!     stats presenter   → live_proxies()
//! ```

pub mod factory;
pub mod lifecycle;
pub mod live;

pub use factory::{DefinitionFactory, PoolError, ProxyFactory};
pub use lifecycle::{PoolPhase, PoolStatus, ProxyPool};
pub use live::LiveProxy;
