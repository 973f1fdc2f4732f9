// Validation against the persisted documents and the live members

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, warn};

use cairn_api::{CacheElement, ClusterManagementError, Member};
use cairn_common::CLUSTER_GROUP;
use cairn_core::RealizationExecutor;
use cairn_core::cluster::ClusterMembership;
use cairn_persistence::ConfigurationPersistence;

use crate::mutator::ConfigurationManager;

/// A persisted copy of an element and the group document holding it
#[derive(Clone, Debug, PartialEq)]
pub struct PersistedElement {
    pub group: String,
    pub element: CacheElement,
}

/// Queries over persisted documents and live members
pub struct MemberValidator {
    persistence: Arc<dyn ConfigurationPersistence>,
    membership: Arc<dyn ClusterMembership>,
    executor: Arc<dyn RealizationExecutor>,
}

impl MemberValidator {
    pub fn new(
        persistence: Arc<dyn ConfigurationPersistence>,
        membership: Arc<dyn ClusterMembership>,
        executor: Arc<dyn RealizationExecutor>,
    ) -> Self {
        Self {
            persistence,
            membership,
            executor,
        }
    }

    /// Live members matching the group, or all live members
    pub fn find_servers(&self, group: Option<&str>) -> Vec<Member> {
        self.membership.find_servers(group)
    }

    /// Live members of any of the groups, each member once
    pub fn find_servers_in(&self, groups: &[String]) -> Vec<Member> {
        let mut members = BTreeMap::new();
        for group in groups {
            for member in self.find_servers(Some(group)) {
                members.entry(member.name.clone()).or_insert(member);
            }
        }
        members.into_values().collect()
    }

    /// Known groups with the `cluster` group first
    pub async fn ordered_groups(&self) -> anyhow::Result<Vec<String>> {
        let groups = self.persistence.groups().await?;
        let mut ordered = vec![CLUSTER_GROUP.to_string()];
        ordered.extend(groups.into_iter().filter(|g| g != CLUSTER_GROUP));
        Ok(ordered)
    }

    /// Persisted copies sharing the element's identity
    ///
    /// Types with a cluster-unique identity are searched in every group,
    /// others only in the group the element addresses.
    pub async fn find_existing(
        &self,
        element: &CacheElement,
        manager: &dyn ConfigurationManager,
    ) -> anyhow::Result<Vec<PersistedElement>> {
        let groups = if element.kind().has_cluster_unique_identity() {
            self.ordered_groups().await?
        } else {
            vec![element.config_group().to_string()]
        };

        let mut existing = Vec::new();
        for group in groups {
            let Some(doc) = self.persistence.cache_config(&group, false).await? else {
                continue;
            };
            if let Some(found) = manager.get(&doc, element) {
                existing.push(PersistedElement {
                    group,
                    element: found,
                });
            }
        }
        Ok(existing)
    }

    /// Groups whose document holds the element; empty when it exists nowhere
    pub async fn find_groups_with_this_element(
        &self,
        element: &CacheElement,
        manager: &dyn ConfigurationManager,
    ) -> anyhow::Result<Vec<String>> {
        Ok(self
            .find_existing(element, manager)
            .await?
            .into_iter()
            .map(|e| e.group)
            .collect())
    }

    /// Reject a create that would put a second copy of the element on a live member
    ///
    /// Two conflicts are detected: target members that already receive the
    /// element through another group's document, and target members exposing
    /// the element although no document explains it. Both fail with
    /// ENTITY_EXISTS; a member that cannot be queried fails the request.
    pub async fn validate_create(
        &self,
        element: &CacheElement,
        existing: &[PersistedElement],
    ) -> Result<(), ClusterManagementError> {
        let targets = self.find_servers(element.group());
        if targets.is_empty() {
            return Ok(());
        }
        let target_names: BTreeSet<&str> = targets.iter().map(|m| m.name.as_str()).collect();

        let other_groups: Vec<String> = existing
            .iter()
            .filter(|e| e.group != element.config_group())
            .map(|e| e.group.clone())
            .collect();
        let overlapping: Vec<String> = self
            .find_servers_in(&other_groups)
            .into_iter()
            .filter(|m| target_names.contains(m.name.as_str()))
            .map(|m| m.name)
            .collect();
        if !overlapping.is_empty() {
            debug!(element = %element.id(), members = ?overlapping, "Element already applied through another group");
            return Err(ClusterManagementError::entity_exists(format!(
                "Member(s) {} already has this element created.",
                overlapping.join(", ")
            )));
        }

        let exposing = self
            .executor
            .members_with_element(element, &targets)
            .await
            .map_err(|e| {
                warn!(element = %element.id(), error = %e, "Unable to query members for existing element");
                ClusterManagementError::illegal_state(format!(
                    "Unable to verify members before creating {} '{}': {:#}",
                    element.kind().type_name(),
                    element.id(),
                    e
                ))
            })?;
        if !exposing.is_empty() {
            warn!(element = %element.id(), members = ?exposing, "Live members expose an element missing from persisted configuration");
            return Err(ClusterManagementError::entity_exists(format!(
                "{} '{}' already exists on member(s) {}.",
                element.kind().type_name(),
                element.id(),
                exposing.join(", ")
            )));
        }

        Ok(())
    }
}
