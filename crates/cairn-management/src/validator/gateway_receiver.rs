// Gateway receiver validation

use validator::ValidationError;

use cairn_api::{CacheElement, CacheElementOperation, ElementKind, validate_port_range};

use super::{ElementValidator, wrong_kind};

#[derive(Clone, Copy, Debug, Default)]
pub struct GatewayReceiverConfigValidator;

impl ElementValidator for GatewayReceiverConfigValidator {
    fn kind(&self) -> ElementKind {
        ElementKind::GatewayReceiver
    }

    fn validate(
        &self,
        operation: CacheElementOperation,
        element: &CacheElement,
    ) -> Result<(), ValidationError> {
        let CacheElement::GatewayReceiver(receiver) = element else {
            return Err(wrong_kind(ElementKind::GatewayReceiver, element));
        };
        if operation == CacheElementOperation::Delete {
            return Ok(());
        }

        match (receiver.start_port, receiver.end_port) {
            (Some(start), Some(end)) => validate_port_range(start, end)?,
            (Some(port), None) | (None, Some(port)) => validate_port_range(port, port)?,
            (None, None) => {}
        }

        if receiver.maximum_time_between_pings == Some(0) {
            return Err(ValidationError::new("pings_invalid").with_message(
                "Maximum time between pings must be greater than 0.".into(),
            ));
        }
        if receiver.socket_buffer_size == Some(0) {
            return Err(ValidationError::new("socket_buffer_invalid")
                .with_message("Socket buffer size must be greater than 0.".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_api::{GatewayReceiverConfig, validation_message};

    fn validate(receiver: GatewayReceiverConfig) -> Result<(), ValidationError> {
        GatewayReceiverConfigValidator.validate(CacheElementOperation::Create, &receiver.into())
    }

    #[test]
    fn test_port_range() {
        assert!(validate(GatewayReceiverConfig::default()).is_ok());
        assert!(validate(GatewayReceiverConfig::default().with_ports(5000, 5100)).is_ok());

        let err = validate(GatewayReceiverConfig::default().with_ports(5100, 5000)).unwrap_err();
        assert_eq!(
            validation_message(&err),
            "Start port must not be greater than end port."
        );
    }

    #[test]
    fn test_positive_sizes() {
        let receiver = GatewayReceiverConfig {
            socket_buffer_size: Some(0),
            ..Default::default()
        };
        assert!(validate(receiver).is_err());

        let receiver = GatewayReceiverConfig {
            maximum_time_between_pings: Some(0),
            ..Default::default()
        };
        assert!(validate(receiver).is_err());
    }

    #[test]
    fn test_delete_skips_attribute_checks() {
        let receiver = GatewayReceiverConfig::default().with_ports(5100, 5000);
        assert!(GatewayReceiverConfigValidator
            .validate(CacheElementOperation::Delete, &receiver.into())
            .is_ok());
    }
}
