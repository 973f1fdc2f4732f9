//! Cluster member model

use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use cairn_common::is_cluster_group;

/// Lifecycle state of a cluster member
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeState {
    Starting,
    #[default]
    Up,
    Suspicious,
    Down,
    Isolation,
}

impl NodeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeState::Starting => "STARTING",
            NodeState::Up => "UP",
            NodeState::Suspicious => "SUSPICIOUS",
            NodeState::Down => "DOWN",
            NodeState::Isolation => "ISOLATION",
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, NodeState::Up)
    }
}

impl Display for NodeState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NodeState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "STARTING" => Ok(NodeState::Starting),
            "UP" => Ok(NodeState::Up),
            "SUSPICIOUS" => Ok(NodeState::Suspicious),
            "DOWN" => Ok(NodeState::Down),
            "ISOLATION" => Ok(NodeState::Isolation),
            _ => Err(format!("Invalid node state: {}", s)),
        }
    }
}

/// A server member of the distributed system
///
/// A member belongs to zero or more named groups. Elements persisted in the
/// `cluster` group apply to every member regardless of its own groups.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub state: NodeState,
    #[serde(default)]
    pub groups: BTreeSet<String>,
}

impl Member {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            state: NodeState::Up,
            groups: BTreeSet::new(),
        }
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_state(mut self, state: NodeState) -> Self {
        self.state = state;
        self
    }

    pub fn is_healthy(&self) -> bool {
        self.state.is_healthy()
    }

    /// Whether elements scoped to `group` apply to this member
    pub fn belongs_to(&self, group: &str) -> bool {
        is_cluster_group(group) || self.groups.contains(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_state() {
        assert_eq!(NodeState::default(), NodeState::Up);
        assert!(NodeState::Up.is_healthy());
        assert!(!NodeState::Down.is_healthy());
        assert_eq!("down".parse::<NodeState>().unwrap(), NodeState::Down);
        assert!("gone".parse::<NodeState>().is_err());
    }

    #[test]
    fn test_member_belongs_to() {
        let member = Member::new("server-1", "10.0.0.1:40404").with_groups(["group1"]);
        assert!(member.belongs_to("cluster"));
        assert!(member.belongs_to("group1"));
        assert!(!member.belongs_to("group2"));
    }

    #[test]
    fn test_member_serialization() {
        let member = Member::new("server-1", "10.0.0.1:40404").with_groups(["group1"]);
        let json = serde_json::to_value(&member).unwrap();
        assert_eq!(json["name"], "server-1");
        assert_eq!(json["state"], "UP");
        assert_eq!(json["groups"][0], "group1");
    }
}
