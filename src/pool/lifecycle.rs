//! Live proxy pool lifecycle.
//!
//! # States
//! ```text
//! Disabled --enable()--> Initializing --build ok--> Enabled
//!     ^                       |                        |
//!     |                  build failed                  |
//!     +-----------------------+------disable()---------+
//! ```
//!
//! # Design Decisions
//! - Every `disable()` and every accepted `enable()` stamps a new generation;
//!   a finished construction publishes only if its generation is still current,
//!   so a slow stale rebuild can never overwrite a newer one
//! - Construction runs as a spawned task, including the factory call itself;
//!   callers (and the config store lock they may hold) never wait for it
//! - `enable()` while Initializing or Enabled is a no-op
//! - Teardown also clears the counter registry so old traffic never leaks
//!   into the next configuration's numbers

use arc_swap::ArcSwap;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::config::tree::ConfigTree;
use crate::observability::metrics;
use crate::pool::factory::{PoolError, ProxyFactory};
use crate::pool::live::LiveProxy;
use crate::stats::CounterRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolPhase {
    Disabled,
    Initializing,
    Enabled,
}

/// Externally visible pool state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub phase: PoolPhase,
    pub generation: u64,
    pub live: usize,
}

#[derive(Debug)]
struct PoolState {
    phase: PoolPhase,
    generation: u64,
}

pub struct ProxyPool {
    factory: Arc<dyn ProxyFactory>,
    registry: Arc<CounterRegistry>,
    build_timeout: Duration,
    state: Mutex<PoolState>,
    live: ArcSwap<Vec<Arc<LiveProxy>>>,
    status_tx: watch::Sender<PoolStatus>,
}

impl std::fmt::Debug for ProxyPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyPool")
            .field("status", &self.status())
            .field("build_timeout", &self.build_timeout)
            .finish()
    }
}

impl ProxyPool {
    /// Create a disabled pool.
    pub fn new(
        factory: Arc<dyn ProxyFactory>,
        registry: Arc<CounterRegistry>,
        build_timeout: Duration,
    ) -> Self {
        let (status_tx, _) = watch::channel(PoolStatus {
            phase: PoolPhase::Disabled,
            generation: 0,
            live: 0,
        });
        Self {
            factory,
            registry,
            build_timeout,
            state: Mutex::new(PoolState {
                phase: PoolPhase::Disabled,
                generation: 0,
            }),
            live: ArcSwap::from_pointee(Vec::new()),
            status_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish_status(&self, state: &PoolState) {
        let live = self.live.load().len();
        metrics::record_live_proxies(live);
        self.status_tx.send_replace(PoolStatus {
            phase: state.phase,
            generation: state.generation,
            live,
        });
    }

    pub fn status(&self) -> PoolStatus {
        self.status_tx.borrow().clone()
    }

    pub fn phase(&self) -> PoolPhase {
        self.lock().phase
    }

    /// Watch phase changes, e.g. to wait for a rebuild to land.
    pub fn subscribe(&self) -> watch::Receiver<PoolStatus> {
        self.status_tx.subscribe()
    }

    /// Snapshot of the current pool for the routing subsystem.
    pub fn live_proxies(&self) -> Arc<Vec<Arc<LiveProxy>>> {
        self.live.load_full()
    }

    pub fn registry(&self) -> &Arc<CounterRegistry> {
        &self.registry
    }

    /// Tear the pool down: empty live list, cleared counters.
    pub fn disable(&self) {
        let mut state = self.lock();
        state.generation += 1;
        state.phase = PoolPhase::Disabled;
        self.live.store(Arc::new(Vec::new()));
        self.registry.clear();
        tracing::info!(generation = state.generation, "Proxy pool disabled");
        self.publish_status(&state);
    }

    /// Schedule construction from `config`. Returns the generation it runs
    /// under, or `None` if the pool was not disabled.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn enable(self: &Arc<Self>, config: ConfigTree) -> Option<u64> {
        let generation = {
            let mut state = self.lock();
            if state.phase != PoolPhase::Disabled {
                tracing::debug!(phase = ?state.phase, "Proxy pool enable ignored");
                return None;
            }
            state.generation += 1;
            state.phase = PoolPhase::Initializing;
            self.publish_status(&state);
            state.generation
        };

        tracing::info!(generation, "Proxy pool initializing");
        let timeout = self.build_timeout;
        let pool = Arc::clone(self);
        tokio::spawn(async move {
            let started = Instant::now();
            let build = pool.factory.build(config);
            let result = match tokio::time::timeout(timeout, build).await {
                Ok(result) => result,
                Err(_) => Err(PoolError::Timeout(timeout)),
            };
            pool.complete(generation, result, started.elapsed());
        });

        Some(generation)
    }

    /// Full teardown and rebuild.
    pub fn restart(self: &Arc<Self>, config: ConfigTree) -> Option<u64> {
        metrics::record_pool_restart();
        self.disable();
        self.enable(config)
    }

    /// Revive every live proxy; re-enable if the last construction failed.
    pub fn refresh(self: &Arc<Self>, config: ConfigTree) -> Option<u64> {
        let live = self.live_proxies();
        for proxy in live.iter() {
            proxy.revive();
        }
        tracing::info!(revived = live.len(), "Proxy states cleared");
        if self.phase() == PoolPhase::Disabled {
            self.enable(config)
        } else {
            None
        }
    }

    fn complete(&self, generation: u64, result: Result<Vec<Arc<LiveProxy>>, PoolError>, took: Duration) {
        let mut state = self.lock();
        if state.generation != generation {
            tracing::debug!(
                generation,
                current = state.generation,
                "Discarding stale proxy pool construction"
            );
            metrics::record_pool_build("stale", took);
            return;
        }

        match result {
            Ok(proxies) => {
                let count = proxies.len();
                self.live.store(Arc::new(proxies));
                state.phase = PoolPhase::Enabled;
                metrics::record_pool_build("ok", took);
                tracing::info!(generation, live = count, took_ms = took.as_millis() as u64, "Proxy pool enabled");
            }
            Err(e) => {
                state.phase = PoolPhase::Disabled;
                metrics::record_pool_build("error", took);
                tracing::error!(generation, error = %e, "Proxy pool construction failed");
            }
        }
        self.publish_status(&state);
    }
}
