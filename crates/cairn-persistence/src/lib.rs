//! Cairn Persistence - group configuration documents and the configuration lock
//!
//! This crate provides:
//! - The `ConfigurationPersistence` trait over per-group documents
//! - A TTL lock service backing the cluster configuration lock
//! - In-memory and embedded (RocksDB) storage backends

pub mod embedded;
pub mod lock;
pub mod memory;
pub mod model;
pub mod traits;

pub use embedded::EmbeddedPersistService;
pub use lock::{ConfigurationLock, LockOptions, LockService, LockToken};
pub use memory::MemoryPersistService;
pub use model::StorageMode;
pub use traits::{CacheConfigMutator, ConfigurationLockGuard, ConfigurationPersistence};

/// Lock key guarding every group document
pub const CONFIGURATION_LOCK_KEY: &str = "__cluster_configuration__";
