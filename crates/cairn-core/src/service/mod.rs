// Core services for cluster membership and change realization

pub mod cluster;
pub mod local;
pub mod member_event;
pub mod realization;

// Re-export commonly used types
pub use cluster::{ClusterMembership, ServerMemberManager};
