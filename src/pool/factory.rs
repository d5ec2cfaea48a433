//! Construction of the live proxy pool from a config tree.
//!
//! [`ProxyFactory`] is the seam to the concrete proxy implementations; the
//! lifecycle only knows that construction is asynchronous and may fail.

use futures_util::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;

use crate::config::tree::ConfigTree;
use crate::pool::live::LiveProxy;
use crate::upstream::definition::MAX_CONNECTIONS_COUNT;

pub const PUBLIC_GOAGENT_NAME: &str = "Public GoAgent";
pub const PUBLIC_SHADOWSOCKS_NAME: &str = "Public Shadowsocks";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("proxy pool construction failed: {0}")]
    Build(String),
    #[error("proxy pool construction timed out after {0:?}")]
    Timeout(Duration),
}

pub type BuildFuture = BoxFuture<'static, Result<Vec<Arc<LiveProxy>>, PoolError>>;

/// Builds every live proxy a config tree describes.
pub trait ProxyFactory: Send + Sync + 'static {
    fn build(&self, config: ConfigTree) -> BuildFuture;
}

/// Materializes pool identities straight from the config tree.
///
/// SSH and SPDY definitions get `connections_count` instances (capped at
/// [`MAX_CONNECTIONS_COUNT`]) sharing one public name; each enabled public pool gets `public_pool_slots` members.
#[derive(Debug, Clone)]
pub struct DefinitionFactory {
    public_pool_slots: usize,
}

impl DefinitionFactory {
    pub fn new(public_pool_slots: usize) -> Self {
        Self { public_pool_slots }
    }

    pub fn materialize(&self, config: &ConfigTree) -> Vec<Arc<LiveProxy>> {
        let mut proxies = Vec::new();

        for (proxy_id, definition) in &config.private_servers {
            let public_name = definition.public_name();
            // Hand-edited files bypass validation.
            let copies = definition.connections_count().clamp(1, MAX_CONNECTIONS_COUNT);
            for _ in 0..copies {
                proxies.push(Arc::new(LiveProxy::new(Some(proxy_id.clone()), public_name.clone())));
            }
        }

        if config.public_servers.goagent_enabled {
            for _ in 0..self.public_pool_slots {
                proxies.push(Arc::new(LiveProxy::new(None, PUBLIC_GOAGENT_NAME)));
            }
        }
        if config.public_servers.ss_enabled {
            for _ in 0..self.public_pool_slots {
                proxies.push(Arc::new(LiveProxy::new(None, PUBLIC_SHADOWSOCKS_NAME)));
            }
        }

        proxies
    }
}

impl ProxyFactory for DefinitionFactory {
    fn build(&self, config: ConfigTree) -> BuildFuture {
        let factory = self.clone();
        Box::pin(async move { Ok::<_, PoolError>(factory.materialize(&config)) })
    }
}
