// In-process member cache
// Realizes configuration elements into per-member caches held in this process

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use cairn_api::{
    CacheConfig, CacheElement, CacheElementOperation, GatewayReceiverConfig, Member,
    RealizationResult, RegionConfig,
};

/// Running configuration of one member
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LocalCache {
    pub regions: BTreeMap<String, RegionConfig>,
    pub gateway_receiver: Option<GatewayReceiverConfig>,
}

/// Member function that applies changes to in-process member caches
#[derive(Debug, Default)]
pub struct LocalCacheFunction {
    caches: DashMap<String, LocalCache>,
}

impl LocalCacheFunction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a persisted group document into a member's cache
    pub fn apply_document(&self, member_name: &str, doc: &CacheConfig) {
        let mut cache = self.caches.entry(member_name.to_string()).or_default();
        for region in &doc.regions {
            cache
                .regions
                .entry(region.name.clone())
                .or_insert_with(|| region.clone());
        }
        if cache.gateway_receiver.is_none() {
            cache.gateway_receiver = doc.gateway_receiver.clone();
        }
    }

    /// A copy of a member's cache
    pub fn snapshot(&self, member_name: &str) -> Option<LocalCache> {
        self.caches.get(member_name).map(|c| c.value().clone())
    }

    fn create(cache: &mut LocalCache, element: &CacheElement) -> Result<String, String> {
        match element {
            CacheElement::Region(region) => {
                if cache.regions.contains_key(&region.name) {
                    return Err(format!("Region '{}' already exists", region.name));
                }
                let mut stored = region.clone();
                stored.group = None;
                stored.groups.clear();
                cache.regions.insert(region.name.clone(), stored);
                Ok(format!("Region '{}' created", region.name))
            }
            CacheElement::GatewayReceiver(receiver) => {
                if cache.gateway_receiver.is_some() {
                    return Err("Gateway receiver already exists".to_string());
                }
                let mut stored = receiver.clone();
                stored.group = None;
                stored.groups.clear();
                cache.gateway_receiver = Some(stored);
                Ok("Gateway receiver created".to_string())
            }
            CacheElement::Member(_) => Err("MemberConfig is not supported".to_string()),
        }
    }

    fn delete(cache: &mut LocalCache, element: &CacheElement) -> Result<String, String> {
        match element {
            CacheElement::Region(region) => Ok(match cache.regions.remove(&region.name) {
                Some(_) => format!("Region '{}' destroyed", region.name),
                None => format!("Region '{}' does not exist", region.name),
            }),
            CacheElement::GatewayReceiver(_) => Ok(match cache.gateway_receiver.take() {
                Some(_) => "Gateway receiver destroyed".to_string(),
                None => "Gateway receiver does not exist".to_string(),
            }),
            CacheElement::Member(_) => Err("MemberConfig is not supported".to_string()),
        }
    }
}

#[async_trait]
impl crate::service::realization::MemberFunction for LocalCacheFunction {
    async fn execute(
        &self,
        member: &Member,
        operation: CacheElementOperation,
        element: &CacheElement,
    ) -> anyhow::Result<RealizationResult> {
        let mut cache = self.caches.entry(member.name.clone()).or_default();
        let outcome = match operation {
            CacheElementOperation::Create => Self::create(&mut cache, element),
            CacheElementOperation::Delete => Self::delete(&mut cache, element),
        };

        debug!(member = %member.name, operation = %operation, element = %element.id(), ok = outcome.is_ok(), "Local realization");
        Ok(match outcome {
            Ok(message) => RealizationResult::success(&member.name).with_message(message),
            Err(message) => RealizationResult::failure(&member.name, message),
        })
    }

    async fn contains(&self, member: &Member, element: &CacheElement) -> anyhow::Result<bool> {
        let Some(cache) = self.caches.get(&member.name) else {
            return Ok(false);
        };
        Ok(match element {
            CacheElement::Region(region) => cache.regions.contains_key(&region.name),
            CacheElement::GatewayReceiver(_) => cache.gateway_receiver.is_some(),
            CacheElement::Member(_) => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::realization::MemberFunction;
    use cairn_api::RegionType;

    fn member() -> Member {
        Member::new("server-1", "10.0.0.1:40404")
    }

    #[tokio::test]
    async fn test_create_then_delete_region() {
        let function = LocalCacheFunction::new();
        let region: CacheElement = RegionConfig::new("orders")
            .with_type(RegionType::Partition)
            .with_group("group1")
            .into();

        let result = function
            .execute(&member(), CacheElementOperation::Create, &region)
            .await
            .unwrap();
        assert!(result.success);
        assert!(function.contains(&member(), &region).await.unwrap());

        let cached = function.snapshot("server-1").unwrap();
        assert_eq!(cached.regions["orders"].group, None);

        let again = function
            .execute(&member(), CacheElementOperation::Create, &region)
            .await
            .unwrap();
        assert!(!again.success);
        assert_eq!(again.message.as_deref(), Some("Region 'orders' already exists"));

        let deleted = function
            .execute(&member(), CacheElementOperation::Delete, &region)
            .await
            .unwrap();
        assert!(deleted.success);
        assert!(!function.contains(&member(), &region).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_missing_is_success() {
        let function = LocalCacheFunction::new();
        let receiver: CacheElement = GatewayReceiverConfig::default().into();

        let result = function
            .execute(&member(), CacheElementOperation::Delete, &receiver)
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.message.as_deref(), Some("Gateway receiver does not exist"));
    }

    #[tokio::test]
    async fn test_apply_document() {
        let function = LocalCacheFunction::new();
        let doc = CacheConfig {
            regions: vec![RegionConfig::new("orders"), RegionConfig::new("customers")],
            gateway_receiver: Some(GatewayReceiverConfig::default().with_ports(5000, 5100)),
        };

        function.apply_document("server-1", &doc);
        let cache = function.snapshot("server-1").unwrap();
        assert_eq!(cache.regions.len(), 2);
        assert_eq!(cache.gateway_receiver.unwrap().start_port, Some(5000));
        assert!(function.snapshot("server-2").is_none());
    }
}
