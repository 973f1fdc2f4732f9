//! Persistence trait for the group configuration documents
//!
//! The persisted configuration is one [`CacheConfig`] document per group.
//! Reads need no lock; every write goes through [`ConfigurationPersistence::update_cache_config`]
//! and must present the [`LockToken`] of the current lock holder.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::warn;

use cairn_api::CacheConfig;

use crate::lock::LockToken;
use crate::model::StorageMode;

/// A mutation applied to a copy of a group document
///
/// The copy is written back only when the mutator returns `Ok`.
pub type CacheConfigMutator = Box<dyn FnOnce(&mut CacheConfig) -> anyhow::Result<()> + Send>;

/// Storage of per-group configuration documents plus the configuration lock
#[async_trait]
pub trait ConfigurationPersistence: Send + Sync {
    /// Get the backend kind
    fn storage_mode(&self) -> StorageMode;

    /// Whether cluster configuration is enabled on this store
    fn is_enabled(&self) -> bool {
        true
    }

    /// All known groups. The `cluster` group is always present.
    async fn groups(&self) -> anyhow::Result<BTreeSet<String>>;

    /// Read a group document
    ///
    /// A missing document is `None`, or an empty document when
    /// `create_if_absent` is set. Reading never creates the group.
    async fn cache_config(
        &self,
        group: &str,
        create_if_absent: bool,
    ) -> anyhow::Result<Option<CacheConfig>>;

    /// Apply `mutator` to the group document and persist the result
    ///
    /// Fails with an illegal-state error unless `token` currently holds the
    /// configuration lock. The write is durable once this returns.
    async fn update_cache_config(
        &self,
        token: &LockToken,
        group: &str,
        mutator: CacheConfigMutator,
    ) -> anyhow::Result<()>;

    /// Acquire the configuration lock, waiting a bounded time for a busy holder
    async fn lock(&self) -> Option<LockToken>;

    /// Release the configuration lock if `token` still holds it
    fn unlock(&self, token: &LockToken);

    /// Restart the lock TTL; `false` when `token` no longer holds the lock
    fn renew_lock(&self, token: &LockToken) -> bool;

    /// How long an acquisition lasts without renewal
    fn lock_ttl(&self) -> Duration;

    /// Whether any holder currently has the configuration lock
    fn is_locked(&self) -> bool;
}

/// Scoped hold on the configuration lock
///
/// The lock is renewed in the background while the guard lives and released
/// on drop.
pub struct ConfigurationLockGuard {
    persistence: Arc<dyn ConfigurationPersistence>,
    token: LockToken,
    keepalive: JoinHandle<()>,
}

impl ConfigurationLockGuard {
    /// Acquire the lock; `None` when it could not be taken in time
    ///
    /// Must be called from within a tokio runtime.
    pub async fn acquire(persistence: &Arc<dyn ConfigurationPersistence>) -> Option<Self> {
        let token = persistence.lock().await?;
        let keepalive = spawn_keepalive(persistence.clone(), token.clone());
        Some(Self {
            persistence: persistence.clone(),
            token,
            keepalive,
        })
    }

    pub fn token(&self) -> &LockToken {
        &self.token
    }

    pub async fn update(&self, group: &str, mutator: CacheConfigMutator) -> anyhow::Result<()> {
        self.persistence
            .update_cache_config(&self.token, group, mutator)
            .await
    }
}

impl Drop for ConfigurationLockGuard {
    fn drop(&mut self) {
        self.keepalive.abort();
        self.persistence.unlock(&self.token);
    }
}

fn spawn_keepalive(
    persistence: Arc<dyn ConfigurationPersistence>,
    token: LockToken,
) -> JoinHandle<()> {
    let every = (persistence.lock_ttl() / 3).max(Duration::from_millis(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            if !persistence.renew_lock(&token) {
                warn!(token = %token, "Configuration lock lost before release");
                break;
            }
        }
    })
}

pub(crate) fn lock_not_held() -> anyhow::Error {
    cairn_common::error::CairnError::IllegalState(
        "configuration lock is not held by this token".to_string(),
    )
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LockOptions, LockService, MemoryPersistService};
    use cairn_api::RegionConfig;

    #[tokio::test]
    async fn test_guard_releases_on_drop() {
        let persistence: Arc<dyn ConfigurationPersistence> = Arc::new(MemoryPersistService::new());

        {
            let guard = ConfigurationLockGuard::acquire(&persistence).await.unwrap();
            assert!(persistence.is_locked());
            guard
                .update(
                    "cluster",
                    Box::new(|doc: &mut CacheConfig| {
                        doc.regions.push(RegionConfig::new("orders"));
                        Ok(())
                    }),
                )
                .await
                .unwrap();
        }

        assert!(!persistence.is_locked());
        let doc = persistence.cache_config("cluster", false).await.unwrap().unwrap();
        assert!(doc.find_region("orders").is_some());
    }

    #[tokio::test]
    async fn test_guard_releases_on_error_path() {
        let persistence: Arc<dyn ConfigurationPersistence> = Arc::new(MemoryPersistService::new());

        let attempt = async {
            let guard = ConfigurationLockGuard::acquire(&persistence).await.unwrap();
            guard
                .update("cluster", Box::new(|_: &mut CacheConfig| Err(anyhow::anyhow!("rejected"))))
                .await
        };
        assert!(attempt.await.is_err());
        assert!(!persistence.is_locked());
    }

    #[tokio::test]
    async fn test_guard_outlives_lock_ttl() {
        let options = LockOptions {
            ttl: Duration::from_millis(40),
            wait_timeout: Duration::from_millis(20),
            poll_interval: Duration::from_millis(5),
        };
        let persistence: Arc<dyn ConfigurationPersistence> = Arc::new(
            MemoryPersistService::with_lock(Arc::new(LockService::new()), options),
        );

        let guard = ConfigurationLockGuard::acquire(&persistence).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(ConfigurationLockGuard::acquire(&persistence).await.is_none());
        guard
            .update("cluster", Box::new(|_: &mut CacheConfig| Ok(())))
            .await
            .unwrap();

        drop(guard);
        assert!(!persistence.is_locked());
        assert!(ConfigurationLockGuard::acquire(&persistence).await.is_some());
    }
}
