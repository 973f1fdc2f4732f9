//! Cairn Core - Configuration, cluster membership and change realization
//!
//! This crate provides:
//! - The `Configuration` wrapper over layered settings
//! - Live member registry and group-based member lookup
//! - Scatter-gather realization of configuration changes on members
//! - An in-process member cache used by standalone deployments

pub mod model;
pub mod service;

// Re-export cluster module
pub mod cluster {
    pub use crate::service::cluster::{ClusterMembership, ServerMemberManager};
    pub use crate::service::member_event::{MemberChangeEvent, MemberChangeType};
}

// Re-export commonly used types
pub use model::Configuration;
pub use service::local::{LocalCache, LocalCacheFunction};
pub use service::realization::{ClusterRealizationExecutor, MemberFunction, RealizationExecutor};
