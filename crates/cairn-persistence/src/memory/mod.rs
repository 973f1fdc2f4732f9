// In-memory persistence backend
// Group documents live in a DashMap and are lost on restart

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use cairn_api::CacheConfig;
use cairn_common::CLUSTER_GROUP;

use crate::lock::{ConfigurationLock, LockOptions, LockService, LockToken};
use crate::model::StorageMode;
use crate::traits::{CacheConfigMutator, ConfigurationPersistence, lock_not_held};

/// Group documents held in process memory
pub struct MemoryPersistService {
    documents: DashMap<String, CacheConfig>,
    lock: ConfigurationLock,
}

impl Default for MemoryPersistService {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPersistService {
    pub fn new() -> Self {
        Self::with_lock(Arc::new(LockService::new()), LockOptions::default())
    }

    /// Create a store that takes the configuration lock from `lock_service`
    pub fn with_lock(lock_service: Arc<LockService>, options: LockOptions) -> Self {
        Self {
            documents: DashMap::new(),
            lock: ConfigurationLock::new(lock_service, options),
        }
    }
}

#[async_trait]
impl ConfigurationPersistence for MemoryPersistService {
    fn storage_mode(&self) -> StorageMode {
        StorageMode::Memory
    }

    async fn groups(&self) -> anyhow::Result<BTreeSet<String>> {
        let mut groups: BTreeSet<String> =
            self.documents.iter().map(|e| e.key().clone()).collect();
        groups.insert(CLUSTER_GROUP.to_string());
        Ok(groups)
    }

    async fn cache_config(
        &self,
        group: &str,
        create_if_absent: bool,
    ) -> anyhow::Result<Option<CacheConfig>> {
        let doc = self.documents.get(group).map(|d| d.value().clone());
        Ok(match doc {
            Some(doc) => Some(doc),
            None if create_if_absent => Some(CacheConfig::default()),
            None => None,
        })
    }

    async fn update_cache_config(
        &self,
        token: &LockToken,
        group: &str,
        mutator: CacheConfigMutator,
    ) -> anyhow::Result<()> {
        if !self.lock.is_held(token) {
            return Err(lock_not_held());
        }

        let mut doc = self
            .documents
            .get(group)
            .map(|d| d.value().clone())
            .unwrap_or_default();
        mutator(&mut doc)?;
        self.documents.insert(group.to_string(), doc);

        debug!(group = %group, "Group configuration updated");
        Ok(())
    }

    async fn lock(&self) -> Option<LockToken> {
        self.lock.lock().await
    }

    fn unlock(&self, token: &LockToken) {
        self.lock.unlock(token);
    }

    fn renew_lock(&self, token: &LockToken) -> bool {
        self.lock.renew(token)
    }

    fn lock_ttl(&self) -> Duration {
        self.lock.options().ttl
    }

    fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_api::{GatewayReceiverConfig, RegionConfig};
    use cairn_common::error::find_cairn_error;

    #[tokio::test]
    async fn test_cluster_group_always_known() {
        let svc = MemoryPersistService::new();
        let groups = svc.groups().await.unwrap();
        assert_eq!(groups.len(), 1);
        assert!(groups.contains("cluster"));
    }

    #[tokio::test]
    async fn test_read_does_not_create_group() {
        let svc = MemoryPersistService::new();

        assert!(svc.cache_config("group1", false).await.unwrap().is_none());
        let doc = svc.cache_config("group1", true).await.unwrap().unwrap();
        assert!(doc.is_empty());
        assert!(!svc.groups().await.unwrap().contains("group1"));
    }

    #[tokio::test]
    async fn test_update_requires_lock() {
        let svc = MemoryPersistService::new();
        let token = svc.lock().await.unwrap();
        svc.unlock(&token);

        let err = svc
            .update_cache_config(&token, "cluster", Box::new(|_: &mut CacheConfig| Ok(())))
            .await
            .unwrap_err();
        assert!(find_cairn_error(&err).unwrap().is_illegal_state());
    }

    #[tokio::test]
    async fn test_update_and_read_back() {
        let svc = MemoryPersistService::new();
        let token = svc.lock().await.unwrap();

        svc.update_cache_config(
            &token,
            "group1",
            Box::new(|doc: &mut CacheConfig| {
                doc.regions.push(RegionConfig::new("orders"));
                doc.gateway_receiver = Some(GatewayReceiverConfig::default());
                Ok(())
            }),
        )
        .await
        .unwrap();
        svc.unlock(&token);

        let doc = svc.cache_config("group1", false).await.unwrap().unwrap();
        assert_eq!(doc.regions.len(), 1);
        assert!(doc.gateway_receiver.is_some());
        assert!(svc.groups().await.unwrap().contains("group1"));
    }

    #[tokio::test]
    async fn test_failed_mutator_leaves_document_unchanged() {
        let svc = MemoryPersistService::new();
        let token = svc.lock().await.unwrap();
        svc.update_cache_config(
            &token,
            "cluster",
            Box::new(|doc: &mut CacheConfig| {
                doc.regions.push(RegionConfig::new("orders"));
                Ok(())
            }),
        )
        .await
        .unwrap();

        let result = svc
            .update_cache_config(
                &token,
                "cluster",
                Box::new(|doc: &mut CacheConfig| {
                    doc.regions.clear();
                    Err(anyhow::anyhow!("abort"))
                }),
            )
            .await;
        assert!(result.is_err());

        let doc = svc.cache_config("cluster", false).await.unwrap().unwrap();
        assert_eq!(doc.regions.len(), 1);
    }

    #[tokio::test]
    async fn test_lock_is_exclusive_per_store() {
        let lock_service = Arc::new(LockService::new());
        let options = LockOptions {
            wait_timeout: Duration::from_millis(20),
            ..LockOptions::default()
        };
        let first = MemoryPersistService::with_lock(lock_service.clone(), options.clone());
        let second = MemoryPersistService::with_lock(lock_service, options);

        let token = first.lock().await.unwrap();
        assert!(second.lock().await.is_none());
        assert!(second.is_locked());

        // A token from one store does not authorize writes through the other
        first.unlock(&token);
        let next = second.lock().await.unwrap();
        let err = first
            .update_cache_config(&token, "cluster", Box::new(|_: &mut CacheConfig| Ok(())))
            .await
            .unwrap_err();
        assert!(find_cairn_error(&err).unwrap().is_illegal_state());

        second.unlock(&next);
        assert!(!first.is_locked());
    }
}
