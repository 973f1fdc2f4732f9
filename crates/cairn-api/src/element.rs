//! Configuration elements and group documents
//!
//! A configuration element is a named, typed unit of cluster configuration.
//! Each group's persisted configuration is a [`CacheConfig`] document holding
//! the elements scoped to that group.

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use cairn_common::{CLUSTER_GROUP, effective_group, is_cluster_group};

/// The type of a configuration element
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElementKind {
    Region,
    GatewayReceiver,
    Member,
}

impl ElementKind {
    /// Type name used in status messages
    pub fn type_name(&self) -> &'static str {
        match self {
            ElementKind::Region => "RegionConfig",
            ElementKind::GatewayReceiver => "GatewayReceiverConfig",
            ElementKind::Member => "MemberConfig",
        }
    }

    /// Lower-case human name used in argument errors
    pub fn display_name(&self) -> &'static str {
        match self {
            ElementKind::Region => "region",
            ElementKind::GatewayReceiver => "gateway receiver",
            ElementKind::Member => "member",
        }
    }

    /// Whether the identity is unique across all groups, so the owning groups
    /// of an existing element are discovered rather than chosen by the caller.
    pub fn has_cluster_unique_identity(&self) -> bool {
        matches!(self, ElementKind::Region)
    }
}

impl Display for ElementKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Region data policy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegionType {
    Replicate,
    ReplicatePersistent,
    Partition,
    PartitionPersistent,
    PartitionRedundant,
    Local,
}

impl RegionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionType::Replicate => "REPLICATE",
            RegionType::ReplicatePersistent => "REPLICATE_PERSISTENT",
            RegionType::Partition => "PARTITION",
            RegionType::PartitionPersistent => "PARTITION_PERSISTENT",
            RegionType::PartitionRedundant => "PARTITION_REDUNDANT",
            RegionType::Local => "LOCAL",
        }
    }
}

impl Display for RegionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RegionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "REPLICATE" => Ok(RegionType::Replicate),
            "REPLICATE_PERSISTENT" => Ok(RegionType::ReplicatePersistent),
            "PARTITION" => Ok(RegionType::Partition),
            "PARTITION_PERSISTENT" => Ok(RegionType::PartitionPersistent),
            "PARTITION_REDUNDANT" => Ok(RegionType::PartitionRedundant),
            "LOCAL" => Ok(RegionType::Local),
            _ => Err(format!("Invalid region type: {}", s)),
        }
    }
}

/// A data region. Identity is the region name, unique across the cluster.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub region_type: Option<RegionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_constraint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_constraint: Option<String>,
}

impl RegionConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, region_type: RegionType) -> Self {
        self.region_type = Some(region_type);
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Whether two regions with the same name describe the same definition
    pub fn same_definition(&self, other: &RegionConfig) -> bool {
        self.name == other.name
            && self.region_type == other.region_type
            && self.key_constraint == other.key_constraint
            && self.value_constraint == other.value_constraint
    }
}

/// A gateway receiver. At most one per group; identity is the effective group.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayReceiverConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname_for_senders: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_time_between_pings: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_buffer_size: Option<u32>,
    #[serde(default)]
    pub manual_start: bool,
}

impl GatewayReceiverConfig {
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_ports(mut self, start_port: u16, end_port: u16) -> Self {
        self.start_port = Some(start_port);
        self.end_port = Some(end_port);
        self
    }
}

/// Member-scoped settings. Recognized but not managed through this service.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberConfig {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
}

/// A typed configuration element
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheElement {
    Region(RegionConfig),
    GatewayReceiver(GatewayReceiverConfig),
    Member(MemberConfig),
}

impl CacheElement {
    pub fn kind(&self) -> ElementKind {
        match self {
            CacheElement::Region(_) => ElementKind::Region,
            CacheElement::GatewayReceiver(_) => ElementKind::GatewayReceiver,
            CacheElement::Member(_) => ElementKind::Member,
        }
    }

    /// Identity of the element within its type
    pub fn id(&self) -> String {
        match self {
            CacheElement::Region(r) => r.name.clone(),
            CacheElement::GatewayReceiver(g) => effective_group(g.group.as_deref()).to_string(),
            CacheElement::Member(m) => m.id.clone(),
        }
    }

    /// The group filter carried by the request, if any
    ///
    /// Any casing of `cluster` comes back as [`CLUSTER_GROUP`].
    pub fn group(&self) -> Option<&str> {
        let group = match self {
            CacheElement::Region(r) => r.group.as_deref(),
            CacheElement::GatewayReceiver(g) => g.group.as_deref(),
            CacheElement::Member(m) => m.group.as_deref(),
        };
        group
            .filter(|g| !g.trim().is_empty())
            .map(|g| if is_cluster_group(g) { CLUSTER_GROUP } else { g })
    }

    /// The group whose document this element is persisted in
    pub fn config_group(&self) -> &str {
        effective_group(self.group())
    }

    pub fn set_group(&mut self, group: Option<String>) {
        match self {
            CacheElement::Region(r) => r.group = group,
            CacheElement::GatewayReceiver(g) => g.group = group,
            CacheElement::Member(m) => m.group = group,
        }
    }

    /// Applicable groups, populated on list results
    pub fn groups(&self) -> &[String] {
        match self {
            CacheElement::Region(r) => &r.groups,
            CacheElement::GatewayReceiver(g) => &g.groups,
            CacheElement::Member(m) => &m.groups,
        }
    }

    fn groups_mut(&mut self) -> &mut Vec<String> {
        match self {
            CacheElement::Region(r) => &mut r.groups,
            CacheElement::GatewayReceiver(g) => &mut g.groups,
            CacheElement::Member(m) => &mut m.groups,
        }
    }

    /// Add a group to the applicable groups, keeping first-seen order
    pub fn add_group(&mut self, group: &str) {
        let groups = self.groups_mut();
        if !groups.iter().any(|g| g == group) {
            groups.push(group.to_string());
        }
    }

    pub fn clear_groups(&mut self) {
        self.groups_mut().clear();
    }

    /// Same type and same identity
    pub fn same_identity(&self, other: &CacheElement) -> bool {
        self.kind() == other.kind() && self.id() == other.id()
    }
}

impl From<RegionConfig> for CacheElement {
    fn from(value: RegionConfig) -> Self {
        CacheElement::Region(value)
    }
}

impl From<GatewayReceiverConfig> for CacheElement {
    fn from(value: GatewayReceiverConfig) -> Self {
        CacheElement::GatewayReceiver(value)
    }
}

impl From<MemberConfig> for CacheElement {
    fn from(value: MemberConfig) -> Self {
        CacheElement::Member(value)
    }
}

/// The persisted configuration document of one group
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    #[serde(default)]
    pub regions: Vec<RegionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_receiver: Option<GatewayReceiverConfig>,
}

impl CacheConfig {
    pub fn find_region(&self, name: &str) -> Option<&RegionConfig> {
        self.regions.iter().find(|r| r.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty() && self.gateway_receiver.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_kind_names() {
        assert_eq!(ElementKind::Region.type_name(), "RegionConfig");
        assert_eq!(ElementKind::Region.display_name(), "region");
        assert_eq!(ElementKind::Member.to_string(), "MemberConfig");
        assert!(ElementKind::Region.has_cluster_unique_identity());
        assert!(!ElementKind::GatewayReceiver.has_cluster_unique_identity());
    }

    #[test]
    fn test_gateway_receiver_identity_is_group() {
        let receiver: CacheElement = GatewayReceiverConfig::default().into();
        assert_eq!(receiver.id(), "cluster");

        let receiver: CacheElement = GatewayReceiverConfig::default().with_group("group1").into();
        assert_eq!(receiver.id(), "group1");
        assert_eq!(receiver.config_group(), "group1");
    }

    #[test]
    fn test_blank_group_is_cluster() {
        let region: CacheElement = RegionConfig::new("orders").with_group(" ").into();
        assert_eq!(region.group(), None);
        assert_eq!(region.config_group(), "cluster");
    }

    #[test]
    fn test_cluster_group_casing_is_normalized() {
        let region: CacheElement = RegionConfig::new("orders").with_group("CLUSTER").into();
        assert_eq!(region.group(), Some("cluster"));
        assert_eq!(region.config_group(), "cluster");

        let receiver: CacheElement = GatewayReceiverConfig::default().with_group("Cluster").into();
        assert_eq!(receiver.id(), "cluster");
        assert_eq!(receiver.config_group(), "cluster");
    }

    #[test]
    fn test_add_group_keeps_first_seen_order() {
        let mut region: CacheElement = RegionConfig::new("orders").into();
        region.add_group("group1");
        region.add_group("cluster");
        region.add_group("group1");
        assert_eq!(region.groups(), ["group1", "cluster"]);
    }

    #[test]
    fn test_cache_element_serialization() {
        let region: CacheElement = RegionConfig::new("orders")
            .with_type(RegionType::PartitionRedundant)
            .into();
        let json = serde_json::to_value(&region).unwrap();
        assert_eq!(json["kind"], "REGION");
        assert_eq!(json["name"], "orders");
        assert_eq!(json["type"], "PARTITION_REDUNDANT");

        let parsed: CacheElement = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, region);
    }

    #[test]
    fn test_region_type_from_str() {
        assert_eq!("replicate".parse::<RegionType>().unwrap(), RegionType::Replicate);
        assert!("bogus".parse::<RegionType>().is_err());
    }
}
