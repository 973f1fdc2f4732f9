// Core configuration model
// Typed accessors over the layered application configuration

use std::time::Duration;

use cairn_common::DEFAULT_API_BASE;

/// Application configuration
///
/// Wraps the layered `config::Config` (file, environment, CLI overrides) and
/// exposes typed accessors with defaults.
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: config::Config,
}

impl Configuration {
    /// Create a new configuration from a Config instance
    pub fn from_config(config: config::Config) -> Self {
        Self { config }
    }

    // ===================== Member =====================

    /// Name of the local member (default: cairn-server)
    pub fn member_name(&self) -> String {
        self.config
            .get_string("cairn.member.name")
            .unwrap_or_else(|_| "cairn-server".to_string())
    }

    /// Address advertised by the local member (default: 127.0.0.1:40404)
    pub fn member_address(&self) -> String {
        self.config
            .get_string("cairn.member.address")
            .unwrap_or_else(|_| "127.0.0.1:40404".to_string())
    }

    /// Groups of the local member, comma separated in configuration
    pub fn member_groups(&self) -> Vec<String> {
        self.config
            .get_string("cairn.member.groups")
            .map(|s| {
                s.split(',')
                    .map(|g| g.trim().to_string())
                    .filter(|g| !g.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    // ===================== Cluster configuration =====================

    /// Whether the cluster configuration service is enabled (default: true)
    pub fn is_cluster_configuration_enabled(&self) -> bool {
        self.config
            .get_bool("cairn.cluster-configuration.enabled")
            .unwrap_or(true)
    }

    /// Storage backend name (default: embedded)
    pub fn persistence_mode(&self) -> String {
        self.config
            .get_string("cairn.persistence.mode")
            .unwrap_or_else(|_| "embedded".to_string())
    }

    /// Directory of the embedded store (default: data/cairn)
    pub fn persistence_path(&self) -> String {
        self.config
            .get_string("cairn.persistence.embedded.path")
            .unwrap_or_else(|_| "data/cairn".to_string())
    }

    /// Time a configuration lock holder keeps the lock (default: 60000ms)
    pub fn lock_ttl(&self) -> Duration {
        Duration::from_millis(self.get_millis("cairn.cluster-configuration.lock.ttl", 60_000))
    }

    /// Time to wait for a busy configuration lock (default: 10000ms)
    pub fn lock_wait_timeout(&self) -> Duration {
        Duration::from_millis(
            self.get_millis("cairn.cluster-configuration.lock.wait-timeout", 10_000),
        )
    }

    /// Delay between lock attempts while waiting (default: 20ms)
    pub fn lock_poll_interval(&self) -> Duration {
        Duration::from_millis(
            self.get_millis("cairn.cluster-configuration.lock.poll-interval", 20),
        )
    }

    // ===================== Management =====================

    /// Per-member realization timeout (default: 30000ms)
    pub fn realization_timeout(&self) -> Duration {
        Duration::from_millis(self.get_millis("cairn.management.realization.timeout", 30_000))
    }

    /// Retention of completed operations (default: 2 hours)
    pub fn operation_retention(&self) -> Duration {
        Duration::from_millis(
            self.get_millis("cairn.management.operation.retention", 2 * 60 * 60 * 1000),
        )
    }

    /// Interval of the operation history sweeper (default: 60000ms)
    pub fn operation_sweep_interval(&self) -> Duration {
        Duration::from_millis(
            self.get_millis("cairn.management.operation.sweep-interval", 60_000),
        )
    }

    /// Base path of operation location URIs
    pub fn api_base(&self) -> String {
        self.config
            .get_string("cairn.management.api-base")
            .unwrap_or_else(|_| DEFAULT_API_BASE.to_string())
    }

    fn get_millis(&self, key: &str, default: u64) -> u64 {
        self.config
            .get_int(key)
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .unwrap_or(default)
    }
}
