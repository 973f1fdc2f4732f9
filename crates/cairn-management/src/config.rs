//! Management service settings

use std::time::Duration;

use cairn_common::DEFAULT_API_BASE;
use cairn_core::Configuration;

/// Settings of the management service and its operation manager
#[derive(Clone, Debug)]
pub struct ManagementConfig {
    /// Base path of operation location URIs
    pub api_base: String,
    /// Per-member realization timeout
    pub realization_timeout: Duration,
    /// Completed operations older than this are evicted from history
    pub operation_retention: Duration,
    /// How often the history sweeper runs
    pub operation_sweep_interval: Duration,
}

impl Default for ManagementConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            realization_timeout: Duration::from_secs(30),
            operation_retention: Duration::from_secs(2 * 60 * 60),
            operation_sweep_interval: Duration::from_secs(60),
        }
    }
}

impl ManagementConfig {
    pub fn from_configuration(config: &Configuration) -> Self {
        Self {
            api_base: config.api_base(),
            realization_timeout: config.realization_timeout(),
            operation_retention: config.operation_retention(),
            operation_sweep_interval: config.operation_sweep_interval(),
        }
    }
}
