//! Validation of configuration elements
//!
//! Validation runs in layers: [`CacheElementValidator`] applies the rules shared
//! by every element type, a per-type [`ElementValidator`] applies the rules of its
//! type, and [`MemberValidator`] checks the request against the persisted documents
//! and the live members.

pub mod gateway_receiver;
pub mod member;
pub mod region;

pub use gateway_receiver::GatewayReceiverConfigValidator;
pub use member::{MemberValidator, PersistedElement};
pub use region::RegionConfigValidator;

use validator::ValidationError;

use cairn_api::{
    CacheElement, CacheElementOperation, ElementKind, validate_element_name, validate_group,
};
use cairn_common::is_cluster_group;

/// Rules specific to one element type
pub trait ElementValidator: Send + Sync {
    fn kind(&self) -> ElementKind;

    /// Structural checks on the request alone
    fn validate(
        &self,
        operation: CacheElementOperation,
        element: &CacheElement,
    ) -> Result<(), ValidationError>;

    /// Checks of a CREATE against the persisted copies sharing the element's identity
    ///
    /// The default rejects a second element with the same identity in the target group.
    fn validate_existing(
        &self,
        element: &CacheElement,
        existing: &[PersistedElement],
    ) -> Result<(), ValidationError> {
        let group = element.config_group();
        if existing.iter().any(|e| e.group == group) {
            return Err(already_exists(element, group));
        }
        Ok(())
    }
}

pub(crate) fn already_exists(element: &CacheElement, group: &str) -> ValidationError {
    ValidationError::new("element_exists").with_message(
        format!(
            "{} '{}' already exists in group {}.",
            element.kind().type_name(),
            element.id(),
            group
        )
        .into(),
    )
}

pub(crate) fn wrong_kind(expected: ElementKind, element: &CacheElement) -> ValidationError {
    ValidationError::new("wrong_kind").with_message(
        format!(
            "Expected {} but got {}.",
            expected.type_name(),
            element.kind().type_name()
        )
        .into(),
    )
}

/// Rules shared by every element type
#[derive(Clone, Copy, Debug, Default)]
pub struct CacheElementValidator;

impl CacheElementValidator {
    pub fn validate(
        &self,
        operation: CacheElementOperation,
        element: &CacheElement,
    ) -> Result<(), ValidationError> {
        if element.kind() == ElementKind::Region {
            validate_element_name(&element.id())?;
        }

        if operation == CacheElementOperation::Create
            && let Some(group) = element.group()
        {
            validate_group(group)?;
            if is_cluster_group(group) {
                return Err(ValidationError::new("group_reserved").with_message(
                    "'cluster' is a reserved group name. Do not use it for member groups.".into(),
                ));
            }
        }

        Ok(())
    }
}
