// Metrics module for observability
// Describes the server and management metrics and tracks cluster membership

use metrics::{describe_gauge, gauge};

use cairn_core::cluster::ServerMemberManager;

/// Initialize all metric descriptions
/// Should be called once at application startup
pub fn init_metrics() {
    describe_gauge!("cluster_members_total", "Total number of cluster members");
    describe_gauge!(
        "cluster_members_healthy",
        "Number of healthy cluster members"
    );

    cairn_management::metrics::describe_metrics();
}

/// Update cluster member counts
pub fn set_cluster_members(total: f64, healthy: f64) {
    gauge!("cluster_members_total").set(total);
    gauge!("cluster_members_healthy").set(healthy);
}

/// Refresh the member gauges from the registry
pub fn record_cluster_members(members: &ServerMemberManager) {
    set_cluster_members(
        members.member_count() as f64,
        members.healthy_members().len() as f64,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_api::Member;

    #[test]
    fn test_metrics_without_recorder() {
        init_metrics();
        let members = ServerMemberManager::new();
        members.register(Member::new("member1", "10.0.0.1:40404"));
        record_cluster_members(&members);
    }
}
