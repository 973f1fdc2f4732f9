// Region document editing

use cairn_api::{CacheConfig, CacheElement, ElementKind};
use cairn_common::error::CairnError;

use super::{ConfigurationManager, unexpected_kind};

/// Regions form an ordered list per group, unique by name
#[derive(Clone, Copy, Debug, Default)]
pub struct RegionConfigManager;

impl ConfigurationManager for RegionConfigManager {
    fn kind(&self) -> ElementKind {
        ElementKind::Region
    }

    fn add(&self, doc: &mut CacheConfig, element: CacheElement) -> anyhow::Result<()> {
        let region = match element {
            CacheElement::Region(region) => region,
            other => return Err(unexpected_kind(ElementKind::Region, &other)),
        };
        if doc.find_region(&region.name).is_some() {
            return Err(CairnError::IllegalArgument(format!(
                "region '{}' already exists",
                region.name
            ))
            .into());
        }
        doc.regions.push(region);
        Ok(())
    }

    fn delete(&self, doc: &mut CacheConfig, element: &CacheElement) -> anyhow::Result<()> {
        let CacheElement::Region(region) = element else {
            return Err(unexpected_kind(ElementKind::Region, element));
        };
        let before = doc.regions.len();
        doc.regions.retain(|r| r.name != region.name);
        if doc.regions.len() == before {
            return Err(CairnError::NotFound(region.name.clone()).into());
        }
        Ok(())
    }

    fn list(&self, doc: &CacheConfig, filter: &CacheElement) -> Vec<CacheElement> {
        let name = match filter {
            CacheElement::Region(r) if !r.name.is_empty() => Some(r.name.as_str()),
            _ => None,
        };
        doc.regions
            .iter()
            .filter(|r| name.is_none_or(|n| r.name == n))
            .cloned()
            .map(CacheElement::from)
            .collect()
    }

    fn get(&self, doc: &CacheConfig, element: &CacheElement) -> Option<CacheElement> {
        let CacheElement::Region(region) = element else {
            return None;
        };
        doc.find_region(&region.name).cloned().map(CacheElement::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_api::{GatewayReceiverConfig, RegionConfig, RegionType};

    fn doc_with(names: &[&str]) -> CacheConfig {
        CacheConfig {
            regions: names
                .iter()
                .map(|n| RegionConfig::new(*n).with_type(RegionType::Replicate))
                .collect(),
            gateway_receiver: None,
        }
    }

    #[test]
    fn test_add_appends_and_rejects_duplicate() {
        let mut doc = doc_with(&["orders"]);
        RegionConfigManager
            .add(&mut doc, RegionConfig::new("customers").into())
            .unwrap();
        assert_eq!(doc.regions[1].name, "customers");

        assert!(RegionConfigManager
            .add(&mut doc, RegionConfig::new("orders").into())
            .is_err());
        assert_eq!(doc.regions.len(), 2);
    }

    #[test]
    fn test_delete_by_name() {
        let mut doc = doc_with(&["orders", "customers"]);
        RegionConfigManager
            .delete(&mut doc, &RegionConfig::new("orders").into())
            .unwrap();
        assert_eq!(doc.regions.len(), 1);

        let err = RegionConfigManager
            .delete(&mut doc, &RegionConfig::new("orders").into())
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_list_filters_by_name() {
        let doc = doc_with(&["orders", "customers"]);

        let all = RegionConfigManager.list(&doc, &RegionConfig::default().into());
        assert_eq!(all.len(), 2);

        let one = RegionConfigManager.list(&doc, &RegionConfig::new("customers").into());
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].id(), "customers");
    }

    #[test]
    fn test_wrong_kind() {
        let mut doc = CacheConfig::default();
        assert!(RegionConfigManager
            .add(&mut doc, GatewayReceiverConfig::default().into())
            .is_err());
        assert!(RegionConfigManager
            .get(&doc, &GatewayReceiverConfig::default().into())
            .is_none());
    }
}
