//! Cairn Common - Shared error types, constants, and utilities
//!
//! This crate provides the foundational pieces used across all Cairn components:
//! - Error types
//! - Group and path constants
//! - Identifier validation helpers

pub mod error;
pub mod utils;

pub use error::CairnError;
pub use utils::{is_valid, join_path};

/// The universal group. Elements persisted here apply to every member.
pub const CLUSTER_GROUP: &str = "cluster";

/// Default base path for management API locations
pub const DEFAULT_API_BASE: &str = "/management/experimental";

/// Returns the effective group for an optional group filter
///
/// Blank names and any casing of `cluster` resolve to [`CLUSTER_GROUP`].
pub fn effective_group(group: Option<&str>) -> &str {
    match group {
        Some(g) if !g.trim().is_empty() && !is_cluster_group(g) => g,
        _ => CLUSTER_GROUP,
    }
}

/// Whether the given group name denotes the universal group
pub fn is_cluster_group(group: &str) -> bool {
    group.eq_ignore_ascii_case(CLUSTER_GROUP)
}
