//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use relay_control::config::schema::Settings;
use relay_control::pool::factory::BuildFuture;
use relay_control::pool::{DefinitionFactory, PoolError, ProxyFactory};
use relay_control::{AdminServer, AdminService, ConfigTree, Shutdown};

/// Settings pointing at a scratch directory, with an ephemeral listener.
pub fn test_settings(dir: &tempfile::TempDir) -> Settings {
    let mut settings = Settings::default();
    settings.listener.bind_address = "127.0.0.1:0".into();
    settings.store.path = dir.path().join("config.json");
    settings.store.watch = false;
    settings.pool.public_pool_slots = 1;
    settings.pool.build_timeout_secs = 5;
    settings
}

/// Serve the admin API on an ephemeral port.
pub async fn spawn_admin_server(service: Arc<AdminService>, shutdown: &Shutdown) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = AdminServer::new(service, Duration::from_secs(5));
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, rx).await.unwrap();
    });
    addr
}

/// Poll `check` until it holds or `timeout` elapses.
pub async fn eventually<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Factory whose constructions finish only when the test releases them.
#[derive(Default)]
pub struct GatedFactory {
    gates: Mutex<Vec<oneshot::Sender<Result<(), PoolError>>>>,
}

impl GatedFactory {
    pub fn pending(&self) -> usize {
        self.gates.lock().unwrap().len()
    }

    /// Let build number `index` (in start order) finish with `outcome`.
    pub fn release(&self, index: usize, outcome: Result<(), PoolError>) {
        let gate = {
            let mut gates = self.gates.lock().unwrap();
            std::mem::replace(&mut gates[index], oneshot::channel().0)
        };
        let _ = gate.send(outcome);
    }
}

impl ProxyFactory for GatedFactory {
    fn build(&self, config: ConfigTree) -> BuildFuture {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().push(tx);
        let proxies = DefinitionFactory::new(1).materialize(&config);
        Box::pin(async move {
            match rx.await {
                Ok(Ok(())) => Ok(proxies),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(PoolError::Build("gate dropped".into())),
            }
        })
    }
}
