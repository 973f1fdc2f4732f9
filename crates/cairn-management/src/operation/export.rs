// Export of the persisted cluster configuration

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use cairn_api::CacheConfig;
use cairn_persistence::ConfigurationPersistence;

use super::OperationPerformer;

pub const EXPORT_ENDPOINT: &str = "/operations/export";

/// Dumps every group document, or only `{"group": "<name>"}` when given
pub struct ExportConfigurationPerformer {
    persistence: Arc<dyn ConfigurationPersistence>,
}

impl ExportConfigurationPerformer {
    pub fn new(persistence: Arc<dyn ConfigurationPersistence>) -> Self {
        Self { persistence }
    }
}

#[async_trait]
impl OperationPerformer for ExportConfigurationPerformer {
    fn endpoint(&self) -> &str {
        EXPORT_ENDPOINT
    }

    async fn perform(&self, payload: Value) -> anyhow::Result<Value> {
        let groups = match payload.get("group").and_then(Value::as_str) {
            Some(group) => vec![group.to_string()],
            None => self.persistence.groups().await?.into_iter().collect(),
        };

        let mut documents: BTreeMap<String, CacheConfig> = BTreeMap::new();
        for group in groups {
            if let Some(doc) = self.persistence.cache_config(&group, false).await? {
                documents.insert(group, doc);
            }
        }

        debug!(groups = documents.len(), "Cluster configuration exported");
        Ok(serde_json::json!({ "groups": documents }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_api::{RegionConfig, RegionType};
    use cairn_persistence::MemoryPersistService;

    async fn store() -> Arc<MemoryPersistService> {
        let store = Arc::new(MemoryPersistService::new());
        let token = store.lock().await.unwrap();
        for group in ["cluster", "group1"] {
            store
                .update_cache_config(
                    &token,
                    group,
                    Box::new(|doc: &mut CacheConfig| {
                        doc.regions
                            .push(RegionConfig::new("orders").with_type(RegionType::Replicate));
                        Ok(())
                    }),
                )
                .await
                .unwrap();
        }
        store.unlock(&token);
        store
    }

    #[tokio::test]
    async fn test_export_all_groups() {
        let performer = ExportConfigurationPerformer::new(store().await);
        let exported = performer.perform(Value::Null).await.unwrap();

        assert_eq!(exported["groups"]["cluster"]["regions"][0]["name"], "orders");
        assert_eq!(exported["groups"]["group1"]["regions"][0]["type"], "REPLICATE");
    }

    #[tokio::test]
    async fn test_export_one_group() {
        let performer = ExportConfigurationPerformer::new(store().await);
        let exported = performer
            .perform(serde_json::json!({"group": "group1"}))
            .await
            .unwrap();

        let groups = exported["groups"].as_object().unwrap();
        assert_eq!(groups.len(), 1);
        assert!(groups.contains_key("group1"));
    }
}
