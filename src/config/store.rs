//! Versioned read/apply/write access to the persisted config tree.
//!
//! # Responsibilities
//! - Serialize every read-modify-write cycle behind one async mutex
//! - Write atomically (temp file, fsync, rename) so a crash never leaves a torn file
//! - Run commit hooks while still holding the lock, so in-memory state
//!   follows disk in the same order writes happened
//!
//! # Design Decisions
//! - The critical section is load + transform + write + commit, not just the write
//! - A failed write returns the error and skips the commit hook
//! - Missing file reads as the default tree (first start)

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::config::tree::ConfigTree;
use crate::observability::metrics;

/// Persistence fault while reading or writing the config tree.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("config I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("config serialize error: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Single-writer gateway to the persisted config file.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    /// Last tree known to match the file; the mutex doubles as the writer lock.
    last: Mutex<ConfigTree>,
}

impl ConfigStore {
    /// Open the store, loading whatever is on disk now.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let tree = load(&path).await?;
        tracing::info!(
            path = %path.display(),
            private_servers = tree.private_servers.len(),
            "Config store opened"
        );
        Ok(Self {
            path,
            last: Mutex::new(tree),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current persisted snapshot, read from disk.
    pub async fn read(&self) -> Result<ConfigTree, StoreError> {
        load(&self.path).await
    }

    /// Last tree this store loaded or wrote.
    pub async fn snapshot(&self) -> ConfigTree {
        self.last.lock().await.clone()
    }

    /// Apply `transform` to the persisted tree and return the committed result.
    pub async fn update<F>(&self, transform: F) -> Result<ConfigTree, StoreError>
    where
        F: FnOnce(ConfigTree) -> ConfigTree,
    {
        self.update_and(transform, ConfigTree::clone).await
    }

    /// Apply `transform`, persist, then run `on_commit` before releasing the lock.
    pub async fn update_and<F, C, R>(&self, transform: F, on_commit: C) -> Result<R, StoreError>
    where
        F: FnOnce(ConfigTree) -> ConfigTree,
        C: FnOnce(&ConfigTree) -> R,
    {
        let mut last = self.last.lock().await;

        let result = async {
            let current = load(&self.path).await?;
            let next = transform(current);
            persist(&self.path, &next).await?;
            Ok::<_, StoreError>(next)
        }
        .await;

        match result {
            Ok(next) => {
                metrics::record_config_update("ok");
                let out = on_commit(&next);
                *last = next;
                Ok(out)
            }
            Err(e) => {
                metrics::record_config_update("error");
                tracing::error!(path = %self.path.display(), error = %e, "Config update failed");
                Err(e)
            }
        }
    }

    /// Re-read the file and adopt it if it changed behind our back.
    ///
    /// Returns `None` when the file still matches the last known tree, which is
    /// the case for every change this store wrote itself.
    pub async fn reload_and<C, R>(&self, on_change: C) -> Result<Option<R>, StoreError>
    where
        C: FnOnce(&ConfigTree) -> R,
    {
        let mut last = self.last.lock().await;
        let current = load(&self.path).await?;
        if current == *last {
            return Ok(None);
        }
        tracing::info!(path = %self.path.display(), "Config changed on disk, adopting");
        let out = on_change(&current);
        *last = current;
        Ok(Some(out))
    }
}

async fn load(path: &Path) -> Result<ConfigTree, StoreError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ConfigTree::default()),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(ConfigTree::default());
    }
    serde_json::from_slice(&bytes).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

async fn persist(path: &Path, tree: &ConfigTree) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let bytes = serde_json::to_vec_pretty(tree).map_err(StoreError::Serialize)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let mut file = tokio::fs::File::create(&tmp).await.map_err(io_err)?;
    file.write_all(&bytes).await.map_err(io_err)?;
    file.sync_all().await.map_err(io_err)?;
    drop(file);

    tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::transforms;
    use crate::features::FeatureFlag;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_missing_file_reads_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::open(dir.path().join("config.json")).await.unwrap();
        assert_eq!(store.read().await.unwrap(), ConfigTree::default());
    }

    #[tokio::test]
    async fn test_update_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = ConfigStore::open(&path).await.unwrap();

        let tree = store
            .update(|t| transforms::set_feature_flag(t, FeatureFlag::ChinaShortcut, false))
            .await
            .unwrap();
        assert!(!tree.china_shortcut_enabled);

        let reopened = ConfigStore::open(&path).await.unwrap();
        assert!(!reopened.read().await.unwrap().china_shortcut_enabled);
        assert!(!path.with_file_name("config.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_concurrent_updates_do_not_lose_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ConfigStore::open(dir.path().join("config.json")).await.unwrap());

        let mut tasks = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store
                    .update(move |mut t| {
                        t.extra.insert(format!("key{}", i), serde_json::json!(i));
                        t
                    })
                    .await
                    .unwrap();
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }

        let tree = store.read().await.unwrap();
        assert_eq!(tree.extra.len(), 16);
    }

    #[tokio::test]
    async fn test_parse_failure_skips_commit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = ConfigStore::open(&path).await.unwrap();
        std::fs::write(&path, b"{ not json").unwrap();

        let mut committed = false;
        let err = store
            .update_and(
                |t| transforms::set_feature_flag(t, FeatureFlag::TcpScrambler, false),
                |_| committed = true,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
        assert!(!committed);
        assert_eq!(std::fs::read(&path).unwrap(), b"{ not json");
    }

    #[tokio::test]
    async fn test_reload_ignores_own_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = ConfigStore::open(&path).await.unwrap();

        store
            .update(|t| transforms::set_dns_bypass_hosts(t, "a.com"))
            .await
            .unwrap();
        assert!(store.reload_and(|_| ()).await.unwrap().is_none());

        let mut external = store.read().await.unwrap();
        external.direct_access_enabled = false;
        std::fs::write(&path, serde_json::to_vec(&external).unwrap()).unwrap();

        let seen = store.reload_and(|t| t.direct_access_enabled).await.unwrap();
        assert_eq!(seen, Some(false));
        assert!(!store.snapshot().await.direct_access_enabled);
    }
}
