//! Per-type editing of group documents

pub mod gateway_receiver;
pub mod region;

pub use gateway_receiver::GatewayReceiverConfigManager;
pub use region::RegionConfigManager;

use cairn_api::{CacheConfig, CacheElement, ElementKind};
use cairn_common::error::CairnError;

/// Adds, removes and lists the elements of one type in a group document
pub trait ConfigurationManager: Send + Sync {
    fn kind(&self) -> ElementKind;

    /// Insert the element, honoring the type's cardinality
    fn add(&self, doc: &mut CacheConfig, element: CacheElement) -> anyhow::Result<()>;

    /// Remove the element by identity; an absent element is an error
    fn delete(&self, doc: &mut CacheConfig, element: &CacheElement) -> anyhow::Result<()>;

    /// Elements of this type matching the filter
    fn list(&self, doc: &CacheConfig, filter: &CacheElement) -> Vec<CacheElement>;

    /// The persisted element with the same identity, if any
    fn get(&self, doc: &CacheConfig, element: &CacheElement) -> Option<CacheElement>;
}

pub(crate) fn unexpected_kind(expected: ElementKind, element: &CacheElement) -> anyhow::Error {
    CairnError::IllegalArgument(format!(
        "{} manager cannot handle {}",
        expected.type_name(),
        element.kind().type_name()
    ))
    .into()
}
