// Cluster member management
// Tracks live members and resolves the members a group-scoped change targets

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::{debug, info};

use cairn_api::{Member, NodeState};
use cairn_common::is_cluster_group;

use crate::model::Configuration;
use crate::service::member_event::MemberChangeEvent;

const EVENT_QUEUE_SIZE: usize = 256;

/// Lookup of live members by group
pub trait ClusterMembership: Send + Sync {
    /// Live members a change scoped to `group` applies to
    ///
    /// No group, or the `cluster` group, selects every live member.
    /// Results are ordered by member name.
    fn find_servers(&self, group: Option<&str>) -> Vec<Member>;

    /// Every registered member regardless of state
    fn all_members(&self) -> Vec<Member>;
}

/// Server member manager
///
/// Registry of known members keyed by member name.
#[derive(Clone)]
pub struct ServerMemberManager {
    server_list: Arc<DashMap<String, Member>>,
    local_name: Option<String>,
    events: broadcast::Sender<MemberChangeEvent>,
}

impl std::fmt::Debug for ServerMemberManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerMemberManager")
            .field("local_name", &self.local_name)
            .field("member_count", &self.server_list.len())
            .finish()
    }
}

impl Default for ServerMemberManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerMemberManager {
    /// Create an empty registry
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_QUEUE_SIZE);
        Self {
            server_list: Arc::new(DashMap::new()),
            local_name: None,
            events,
        }
    }

    /// Create a registry holding the local member described by `config`
    pub fn from_configuration(config: &Configuration) -> Self {
        let local = Member::new(config.member_name(), config.member_address())
            .with_groups(config.member_groups());

        let mut manager = Self::new();
        manager.local_name = Some(local.name.clone());
        info!(
            member = %local.name,
            address = %local.address,
            groups = ?local.groups,
            "Local member registered"
        );
        manager.server_list.insert(local.name.clone(), local);
        manager
    }

    /// Add or replace a member
    pub fn register(&self, member: Member) {
        debug!(member = %member.name, "Member registered");
        self.server_list.insert(member.name.clone(), member.clone());
        let _ = self.events.send(MemberChangeEvent::member_join(member));
    }

    /// Remove a member
    pub fn deregister(&self, name: &str) -> Option<Member> {
        let (_, member) = self.server_list.remove(name)?;
        debug!(member = %name, "Member deregistered");
        let _ = self.events.send(MemberChangeEvent::member_leave(member.clone()));
        Some(member)
    }

    /// Update member state
    pub fn update_member_state(&self, name: &str, state: NodeState) {
        let changed = match self.server_list.get_mut(name) {
            Some(mut member) if member.state != state => {
                let previous_state = member.state;
                member.state = state;
                Some((member.clone(), previous_state))
            }
            _ => None,
        };

        if let Some((member, previous_state)) = changed {
            info!(member = %name, from = %previous_state, to = %state, "Member state changed");
            let _ = self
                .events
                .send(MemberChangeEvent::member_state_change(member, previous_state));
        }
    }

    /// Get member by name
    pub fn get_member(&self, name: &str) -> Option<Member> {
        self.server_list.get(name).map(|e| e.value().clone())
    }

    /// Get the local member, if one was registered from configuration
    pub fn get_self(&self) -> Option<Member> {
        self.local_name.as_deref().and_then(|n| self.get_member(n))
    }

    /// Get all healthy members
    pub fn healthy_members(&self) -> Vec<Member> {
        let mut members: Vec<Member> = self
            .server_list
            .iter()
            .filter(|e| e.value().is_healthy())
            .map(|e| e.value().clone())
            .collect();
        members.sort_by(|a, b| a.name.cmp(&b.name));
        members
    }

    pub fn member_count(&self) -> usize {
        self.server_list.len()
    }

    /// Subscribe to member change events
    pub fn subscribe_events(&self) -> broadcast::Receiver<MemberChangeEvent> {
        self.events.subscribe()
    }
}

impl ClusterMembership for ServerMemberManager {
    fn find_servers(&self, group: Option<&str>) -> Vec<Member> {
        let group = group.filter(|g| !g.trim().is_empty());
        self.healthy_members()
            .into_iter()
            .filter(|m| match group {
                None => true,
                Some(g) if is_cluster_group(g) => true,
                Some(g) => m.groups.contains(g),
            })
            .collect()
    }

    fn all_members(&self) -> Vec<Member> {
        let mut members: Vec<Member> = self.server_list.iter().map(|e| e.value().clone()).collect();
        members.sort_by(|a, b| a.name.cmp(&b.name));
        members
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::MemberChangeType;

    fn test_manager() -> ServerMemberManager {
        let manager = ServerMemberManager::new();
        manager.register(Member::new("server-2", "10.0.0.2:40404").with_groups(["group1"]));
        manager.register(Member::new("server-1", "10.0.0.1:40404"));
        manager.register(
            Member::new("server-3", "10.0.0.3:40404").with_groups(["group1", "group2"]),
        );
        manager
    }

    fn names(members: &[Member]) -> Vec<&str> {
        members.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn test_find_servers_by_group() {
        let manager = test_manager();

        assert_eq!(
            names(&manager.find_servers(None)),
            vec!["server-1", "server-2", "server-3"]
        );
        assert_eq!(names(&manager.find_servers(Some("cluster"))).len(), 3);
        assert_eq!(names(&manager.find_servers(Some(" "))).len(), 3);
        assert_eq!(
            names(&manager.find_servers(Some("group1"))),
            vec!["server-2", "server-3"]
        );
        assert!(manager.find_servers(Some("group9")).is_empty());
    }

    #[test]
    fn test_find_servers_skips_unhealthy() {
        let manager = test_manager();
        manager.update_member_state("server-2", NodeState::Down);

        assert_eq!(names(&manager.find_servers(Some("group1"))), vec!["server-3"]);
        assert_eq!(manager.all_members().len(), 3);
    }

    #[test]
    fn test_deregister() {
        let manager = test_manager();
        assert!(manager.deregister("server-1").is_some());
        assert!(manager.deregister("server-1").is_none());
        assert_eq!(manager.member_count(), 2);
    }

    #[test]
    fn test_from_configuration_registers_local_member() {
        let config = config::Config::builder()
            .set_default("cairn.member.name", "locator-a")
            .unwrap()
            .set_default("cairn.member.groups", "group1")
            .unwrap()
            .build()
            .unwrap();
        let manager = ServerMemberManager::from_configuration(&Configuration::from_config(config));

        let local = manager.get_self().unwrap();
        assert_eq!(local.name, "locator-a");
        assert!(local.groups.contains("group1"));
        assert_eq!(names(&manager.find_servers(Some("group1"))), vec!["locator-a"]);
    }

    #[tokio::test]
    async fn test_events_published() {
        let manager = ServerMemberManager::new();
        let mut events = manager.subscribe_events();

        manager.register(Member::new("server-1", "10.0.0.1:40404"));
        manager.update_member_state("server-1", NodeState::Suspicious);
        // Same state again does not publish
        manager.update_member_state("server-1", NodeState::Suspicious);
        manager.deregister("server-1");

        assert_eq!(events.recv().await.unwrap().change_type, MemberChangeType::MemberJoin);
        let change = events.recv().await.unwrap();
        assert_eq!(change.change_type, MemberChangeType::MemberStateChange);
        assert_eq!(change.previous_state, Some(NodeState::Up));
        assert_eq!(events.recv().await.unwrap().change_type, MemberChangeType::MemberLeave);
    }
}
