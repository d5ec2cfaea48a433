//! Operator operations, independent of the HTTP binding.
//!
//! # Responsibilities
//! - Validate proxy submissions before anything is written
//! - Route every mutation through [`ConfigStore::update_and`]
//! - Apply the in-memory effect (flag value, pool restart) from the commit
//!   hook, so it follows the persisted write and never precedes it
//!
//! # Restart policy
//! | operation | effect after commit |
//! |---|---|
//! | add / update / delete proxy | full pool restart |
//! | goagent / shadowsocks public servers | flag + full pool restart |
//! | other feature flags | flag only |
//! | DNS bypass hosts | host list pushed into [`FeatureFlags`] |
//! | refresh | revive died proxies, re-enable a disabled pool |

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::store::{ConfigStore, StoreError};
use crate::config::transforms;
use crate::config::tree::ConfigTree;
use crate::features::{FeatureFlag, FeatureFlags, FlagSnapshot};
use crate::pool::{PoolStatus, ProxyPool};
use crate::stats::{ProxyStatsView, StatsPresenter};
use crate::upstream::validator::INTERNAL_ERROR;
use crate::upstream::{validate, Lang, ProxyDefinition, RawFields, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("proxy_id is required")]
    MissingProxyId,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AdminError {
    /// Operator-facing text. Persistence faults are reported verbatim.
    pub fn message(&self, lang: Lang) -> String {
        match self {
            AdminError::Validation(e) => e.message(lang).to_string(),
            AdminError::MissingProxyId => INTERNAL_ERROR.select(lang).to_string(),
            AdminError::Store(e) => e.to_string(),
        }
    }

    /// Whether the operator can fix this by editing the submission.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, AdminError::Store(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub version: &'static str,
    pub config_path: PathBuf,
    pub pool: PoolStatus,
    pub flags: FlagSnapshot,
}

pub struct AdminService {
    store: Arc<ConfigStore>,
    flags: Arc<FeatureFlags>,
    pool: Arc<ProxyPool>,
    presenter: StatsPresenter,
}

impl AdminService {
    pub fn new(
        store: Arc<ConfigStore>,
        flags: Arc<FeatureFlags>,
        pool: Arc<ProxyPool>,
        presenter: StatsPresenter,
    ) -> Self {
        Self {
            store,
            flags,
            pool,
            presenter,
        }
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    pub fn flags(&self) -> &Arc<FeatureFlags> {
        &self.flags
    }

    pub fn pool(&self) -> &Arc<ProxyPool> {
        &self.pool
    }

    /// Clear the died state of every live proxy.
    pub async fn refresh_proxies(&self) {
        let config = self.store.snapshot().await;
        if let Some(generation) = self.pool.refresh(config) {
            tracing::info!(generation, "Refresh re-enabled the proxy pool");
        }
    }

    pub fn list_proxy_stats(&self) -> ProxyStatsView {
        self.presenter
            .present(self.pool.registry(), &self.pool.live_proxies())
    }

    pub async fn set_feature_flag(&self, flag: FeatureFlag, enabled: bool) -> Result<(), AdminError> {
        self.store
            .update_and(
                |tree| transforms::set_feature_flag(tree, flag, enabled),
                |tree| {
                    self.flags.set(flag, enabled);
                    if flag.requires_restart() {
                        self.restart_pool(tree);
                    }
                },
            )
            .await?;
        Ok(())
    }

    /// Validate and store a new private server. Returns its generated id.
    pub async fn add_proxy(&self, proxy_type: &str, fields: &RawFields) -> Result<String, AdminError> {
        let definition = validate(proxy_type, fields)?;
        let proxy_id = uuid::Uuid::new_v4().to_string();
        let public_name = definition.public_name();

        self.store
            .update_and(
                |tree| transforms::add_proxy(tree, &proxy_id, definition),
                |tree| self.restart_pool(tree),
            )
            .await?;

        tracing::info!(proxy_id = %proxy_id, public_name = %public_name, "Proxy added");
        Ok(proxy_id)
    }

    /// Validate and store `proxy_id`, inserting it if it does not exist yet.
    pub async fn update_proxy(
        &self,
        proxy_id: &str,
        proxy_type: &str,
        fields: &RawFields,
    ) -> Result<(), AdminError> {
        if proxy_id.is_empty() {
            return Err(AdminError::MissingProxyId);
        }
        let definition = validate(proxy_type, fields)?;

        self.store
            .update_and(
                |tree| transforms::put_proxy(tree, proxy_id, definition),
                |tree| self.restart_pool(tree),
            )
            .await?;

        tracing::info!(proxy_id = %proxy_id, "Proxy updated");
        Ok(())
    }

    pub async fn delete_proxy(&self, proxy_id: &str) -> Result<(), AdminError> {
        if proxy_id.is_empty() {
            return Err(AdminError::MissingProxyId);
        }
        self.store
            .update_and(
                |tree| transforms::delete_proxy(tree, proxy_id),
                |tree| self.restart_pool(tree),
            )
            .await?;

        tracing::info!(proxy_id = %proxy_id, "Proxy deleted");
        Ok(())
    }

    pub async fn get_proxy(&self, proxy_id: &str) -> Result<Option<ProxyDefinition>, AdminError> {
        let mut tree = self.store.read().await?;
        Ok(tree.private_servers.remove(proxy_id))
    }

    pub async fn set_dns_bypass_hosts(&self, content: &str) -> Result<(), AdminError> {
        self.store
            .update_and(
                |tree| transforms::set_dns_bypass_hosts(tree, content),
                |tree| self.flags.set_dns_bypass_hosts(&tree.dns_bypass_hosts),
            )
            .await?;
        Ok(())
    }

    pub fn status(&self) -> ServiceStatus {
        ServiceStatus {
            version: env!("CARGO_PKG_VERSION"),
            config_path: self.store.path().to_path_buf(),
            pool: self.pool.status(),
            flags: self.flags.snapshot(),
        }
    }

    /// Adopt an externally edited config file. Returns `false` when the file
    /// still matches what this process last wrote.
    pub async fn reload_from_disk(&self) -> Result<bool, AdminError> {
        let changed = self
            .store
            .reload_and(|tree| {
                self.flags.load_from(tree);
                self.restart_pool(tree);
            })
            .await?;
        Ok(changed.is_some())
    }

    fn restart_pool(&self, tree: &ConfigTree) {
        if let Some(generation) = self.pool.restart(tree.clone()) {
            tracing::debug!(generation, "Proxy pool restart scheduled");
        }
    }
}

impl std::fmt::Debug for AdminService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminService")
            .field("config_path", &self.store.path())
            .field("pool", &self.pool)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{DefinitionFactory, PoolPhase};
    use crate::stats::CounterRegistry;
    use std::time::Duration;

    async fn service(dir: &tempfile::TempDir) -> AdminService {
        let store = Arc::new(ConfigStore::open(dir.path().join("config.json")).await.unwrap());
        let tree = store.snapshot().await;
        let flags = Arc::new(FeatureFlags::from_tree(&tree));
        let registry = Arc::new(CounterRegistry::new(Duration::from_secs(600)));
        let pool = Arc::new(ProxyPool::new(
            Arc::new(DefinitionFactory::new(1)),
            registry,
            Duration::from_secs(5),
        ));
        AdminService::new(store, flags, pool, StatsPresenter::new(Duration::from_secs(600), 1000.0))
    }

    fn fields(pairs: &[(&str, &str)]) -> RawFields {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[tokio::test]
    async fn test_add_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir).await;

        let id = svc
            .add_proxy("SSH", &fields(&[("host", "h"), ("port", " 22 "), ("username", "u")]))
            .await
            .unwrap();
        assert!(uuid::Uuid::parse_str(&id).is_ok());

        let def = svc.get_proxy(&id).await.unwrap().unwrap();
        assert_eq!(def.public_name(), "SSH h:22");
        assert_eq!(def.connections_count(), 4);
        assert!(svc.get_proxy("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejected_submission_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir).await;
        let before = svc.pool.status();

        let err = svc
            .add_proxy("Shadowsocks", &fields(&[("host", "h"), ("port", "8388"), ("encrypt_method", "aes-256-cfb")]))
            .await
            .unwrap_err();
        assert!(err.is_rejection());
        assert_eq!(err.message(Lang::En), "Password must not be empty");
        assert_eq!(err.message(Lang::Zh), "密码必填");

        assert_eq!(svc.store.read().await.unwrap(), ConfigTree::default());
        assert_eq!(svc.pool.status(), before);
    }

    #[tokio::test]
    async fn test_scrambler_toggle_keeps_pool() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir).await;
        let before = svc.pool.status().generation;

        svc.set_feature_flag(FeatureFlag::TcpScrambler, false).await.unwrap();
        assert!(!svc.flags.is_enabled(FeatureFlag::TcpScrambler));
        assert!(!svc.store.read().await.unwrap().tcp_scrambler_enabled);
        assert_eq!(svc.pool.status().generation, before);

        svc.set_feature_flag(FeatureFlag::GoagentPublicServers, false).await.unwrap();
        assert!(svc.pool.status().generation > before);
        assert!(!svc.store.read().await.unwrap().public_servers.goagent_enabled);
    }

    #[tokio::test]
    async fn test_delete_and_update_restart() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir).await;
        let id = svc.add_proxy("GoAgent", &fields(&[("appid", "a")])).await.unwrap();

        let mut rx = svc.pool.subscribe();
        rx.wait_for(|s| s.phase == PoolPhase::Enabled).await.unwrap();
        assert_eq!(svc.pool.live_proxies().len(), 3);

        svc.update_proxy(&id, "GoAgent", &fields(&[("appid", "b")])).await.unwrap();
        let def = svc.get_proxy(&id).await.unwrap().unwrap();
        assert_eq!(def.public_name(), "GoAgent b");

        svc.delete_proxy(&id).await.unwrap();
        assert!(svc.get_proxy(&id).await.unwrap().is_none());
        assert!(matches!(svc.delete_proxy("").await, Err(AdminError::MissingProxyId)));
    }

    #[tokio::test]
    async fn test_dns_bypass_hosts() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir).await;
        svc.set_dns_bypass_hosts("  a.example\n\nb.example \n").await.unwrap();
        assert_eq!(svc.store.read().await.unwrap().dns_bypass_hosts, "a.example\n\nb.example");
        assert_eq!(svc.flags.dns_bypass_hosts().len(), 2);
    }

    #[tokio::test]
    async fn test_reload_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir).await;
        svc.set_feature_flag(FeatureFlag::ChinaShortcut, true).await.unwrap();
        assert!(!svc.reload_from_disk().await.unwrap());

        let path = svc.store.path().to_path_buf();
        tokio::fs::write(&path, r#"{"direct_access_enabled": false}"#).await.unwrap();
        assert!(svc.reload_from_disk().await.unwrap());
        assert!(!svc.flags.is_enabled(FeatureFlag::DirectAccess));
    }
}
