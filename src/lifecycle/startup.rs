//! Startup orchestration.
//!
//! Subsystems come up in dependency order: store, flags, counter registry,
//! pool, admin service. Background tasks start last. The listener is bound
//! by the caller once this returns.

use notify::RecommendedWatcher;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::admin::AdminService;
use crate::config::{ConfigStore, ConfigWatcher, Settings, StoreError};
use crate::features::FeatureFlags;
use crate::lifecycle::Shutdown;
use crate::pool::{DefinitionFactory, ProxyFactory, ProxyPool};
use crate::stats::{CounterRegistry, StatsPresenter};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to watch config file: {0}")]
    Watch(#[from] notify::Error),
}

/// Running core subsystems. Dropping this stops the file watcher.
pub struct Started {
    pub service: Arc<AdminService>,
    pub tasks: Vec<JoinHandle<()>>,
    _watcher: Option<RecommendedWatcher>,
}

/// Start with the bundled [`DefinitionFactory`].
pub async fn start(settings: &Settings, shutdown: &Shutdown) -> Result<Started, StartupError> {
    let factory = Arc::new(DefinitionFactory::new(settings.pool.public_pool_slots));
    start_with_factory(settings, factory, shutdown).await
}

pub async fn start_with_factory(
    settings: &Settings,
    factory: Arc<dyn ProxyFactory>,
    shutdown: &Shutdown,
) -> Result<Started, StartupError> {
    let store = Arc::new(ConfigStore::open(&settings.store.path).await?);
    let tree = store.snapshot().await;

    let flags = Arc::new(FeatureFlags::from_tree(&tree));
    let registry = Arc::new(CounterRegistry::new(settings.stats.window()));
    let pool = Arc::new(ProxyPool::new(
        factory,
        Arc::clone(&registry),
        settings.pool.build_timeout(),
    ));
    pool.enable(tree);

    let presenter = StatsPresenter::new(settings.stats.window(), settings.stats.rate_unit_scale);
    let service = Arc::new(AdminService::new(store, flags, pool, presenter));

    let mut tasks = Vec::new();
    tasks.push(tokio::spawn(
        registry.run_pruner(settings.stats.prune_interval(), shutdown.subscribe()),
    ));

    let watcher = if settings.store.watch {
        let (watcher, mut changes) = ConfigWatcher::new(&settings.store.path);
        let handle = watcher.run()?;
        let svc = Arc::clone(&service);
        let mut stop = shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    change = changes.recv() => {
                        if change.is_none() {
                            break;
                        }
                        if let Err(e) = svc.reload_from_disk().await {
                            tracing::error!(error = %e, "Failed to reload config. Keeping current configuration.");
                        }
                    }
                    _ = stop.recv() => {
                        tracing::info!("Config watcher received shutdown signal, exiting loop");
                        break;
                    }
                }
            }
        }));
        Some(handle)
    } else {
        None
    };

    tracing::info!(
        config = %settings.store.path.display(),
        watch = settings.store.watch,
        window_secs = settings.stats.window_secs,
        "Core subsystems started"
    );

    Ok(Started {
        service,
        tasks,
        _watcher: watcher,
    })
}
