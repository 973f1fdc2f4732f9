//! Cairn Management - cluster configuration management service
//!
//! This crate provides:
//! - Validation of configuration elements against requests, persisted state and live members
//! - Per-type managers that edit group documents
//! - The `ClusterManagementService` orchestrating create, delete and list
//! - The asynchronous operation manager and its built-in operations

pub mod config;
pub mod metrics;
pub mod mutator;
pub mod operation;
pub mod service;
pub mod validator;

// Re-export commonly used types
pub use config::ManagementConfig;
pub use mutator::ConfigurationManager;
pub use operation::{OperationManager, OperationPerformer};
pub use service::ClusterManagementService;
pub use validator::{CacheElementValidator, ElementValidator, MemberValidator};
