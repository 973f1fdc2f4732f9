// Region validation

use validator::ValidationError;

use cairn_api::{CacheElement, CacheElementOperation, ElementKind};

use super::{ElementValidator, PersistedElement, already_exists, wrong_kind};

/// Prefix reserved for internal regions
const INTERNAL_REGION_PREFIX: &str = "__";

#[derive(Clone, Copy, Debug, Default)]
pub struct RegionConfigValidator;

impl ElementValidator for RegionConfigValidator {
    fn kind(&self) -> ElementKind {
        ElementKind::Region
    }

    fn validate(
        &self,
        operation: CacheElementOperation,
        element: &CacheElement,
    ) -> Result<(), ValidationError> {
        let CacheElement::Region(region) = element else {
            return Err(wrong_kind(ElementKind::Region, element));
        };

        if operation == CacheElementOperation::Create {
            if region.name.starts_with(INTERNAL_REGION_PREFIX) {
                return Err(ValidationError::new("region_name_reserved").with_message(
                    format!(
                        "Region names may not begin with a double-underscore: {}",
                        region.name
                    )
                    .into(),
                ));
            }
            if region.region_type.is_none() {
                return Err(ValidationError::new("region_type_required")
                    .with_message("Region type is required.".into()));
            }
        }

        Ok(())
    }

    /// A region name is unique across the cluster: the same definition may be
    /// added to further groups, a different one may not.
    fn validate_existing(
        &self,
        element: &CacheElement,
        existing: &[PersistedElement],
    ) -> Result<(), ValidationError> {
        let CacheElement::Region(region) = element else {
            return Err(wrong_kind(ElementKind::Region, element));
        };
        let group = element.config_group();

        for persisted in existing {
            if persisted.group == group {
                return Err(already_exists(element, group));
            }
            if let CacheElement::Region(other) = &persisted.element
                && !other.same_definition(region)
            {
                return Err(ValidationError::new("region_definition_conflict").with_message(
                    format!(
                        "Region '{}' already exists in group {} with a different definition.",
                        region.name, persisted.group
                    )
                    .into(),
                ));
            }
        }

        Ok(())
    }
}
