// Gateway receiver document editing

use cairn_api::{CacheConfig, CacheElement, ElementKind};
use cairn_common::error::CairnError;

use super::{ConfigurationManager, unexpected_kind};

/// At most one gateway receiver per group; adding replaces it
#[derive(Clone, Copy, Debug, Default)]
pub struct GatewayReceiverConfigManager;

impl ConfigurationManager for GatewayReceiverConfigManager {
    fn kind(&self) -> ElementKind {
        ElementKind::GatewayReceiver
    }

    fn add(&self, doc: &mut CacheConfig, element: CacheElement) -> anyhow::Result<()> {
        let receiver = match element {
            CacheElement::GatewayReceiver(receiver) => receiver,
            other => return Err(unexpected_kind(ElementKind::GatewayReceiver, &other)),
        };
        doc.gateway_receiver = Some(receiver);
        Ok(())
    }

    fn delete(&self, doc: &mut CacheConfig, element: &CacheElement) -> anyhow::Result<()> {
        if !matches!(element, CacheElement::GatewayReceiver(_)) {
            return Err(unexpected_kind(ElementKind::GatewayReceiver, element));
        }
        match doc.gateway_receiver.take() {
            Some(_) => Ok(()),
            None => Err(CairnError::NotFound("gateway receiver".to_string()).into()),
        }
    }

    fn list(&self, doc: &CacheConfig, _filter: &CacheElement) -> Vec<CacheElement> {
        doc.gateway_receiver
            .iter()
            .cloned()
            .map(CacheElement::from)
            .collect()
    }

    fn get(&self, doc: &CacheConfig, element: &CacheElement) -> Option<CacheElement> {
        if !matches!(element, CacheElement::GatewayReceiver(_)) {
            return None;
        }
        doc.gateway_receiver.clone().map(CacheElement::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_api::GatewayReceiverConfig;

    #[test]
    fn test_add_overwrites() {
        let mut doc = CacheConfig::default();
        GatewayReceiverConfigManager
            .add(&mut doc, GatewayReceiverConfig::default().with_ports(5000, 5100).into())
            .unwrap();
        GatewayReceiverConfigManager
            .add(&mut doc, GatewayReceiverConfig::default().with_ports(6000, 6100).into())
            .unwrap();
        assert_eq!(doc.gateway_receiver.unwrap().start_port, Some(6000));
    }

    #[test]
    fn test_delete_and_list() {
        let mut doc = CacheConfig {
            regions: vec![],
            gateway_receiver: Some(GatewayReceiverConfig::default()),
        };
        let filter: CacheElement = GatewayReceiverConfig::default().into();

        assert_eq!(GatewayReceiverConfigManager.list(&doc, &filter).len(), 1);
        GatewayReceiverConfigManager.delete(&mut doc, &filter).unwrap();
        assert!(GatewayReceiverConfigManager.list(&doc, &filter).is_empty());
        assert!(GatewayReceiverConfigManager.delete(&mut doc, &filter).is_err());
    }
}
