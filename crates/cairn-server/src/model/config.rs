//! Configuration loading for the Cairn server
//!
//! Settings are layered as `conf/application.yml`, then `cairn.*` environment
//! variables, then command line overrides.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use config::{Config, Environment, File};

use cairn_api::RegionType;
use cairn_core::Configuration;

use crate::startup::LoggingConfig;

pub const DEFAULT_CONFIG_FILE: &str = "conf/application.yml";

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "cairn-server", version, about = "Cluster configuration management")]
pub struct Cli {
    /// Configuration file
    #[arg(short = 'c', long = "config", default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: PathBuf,
    /// Name of the local member
    #[arg(long = "member-name", env = "CAIRN_MEMBER_NAME")]
    pub member_name: Option<String>,
    /// Comma separated groups of the local member
    #[arg(long = "groups", env = "CAIRN_MEMBER_GROUPS")]
    pub groups: Option<String>,
    /// Persistence mode: memory or embedded
    #[arg(short = 'm', long = "mode")]
    pub mode: Option<String>,
    /// Data directory of the embedded store
    #[arg(long = "data-dir", env = "CAIRN_DATA_DIR")]
    pub data_dir: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

/// Administration commands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a region on the members of a group
    CreateRegion(RegionArgs),
    /// Create the gateway receiver of a group
    CreateGatewayReceiver(GatewayReceiverArgs),
    /// Delete a region from every group holding it
    DeleteRegion {
        name: String,
    },
    /// Delete the gateway receiver of a group
    DeleteGatewayReceiver {
        #[arg(short = 'g', long)]
        group: Option<String>,
    },
    /// List regions, optionally by name or group
    ListRegions {
        #[arg(long)]
        name: Option<String>,
        #[arg(short = 'g', long)]
        group: Option<String>,
    },
    /// List gateway receivers
    ListGatewayReceivers {
        #[arg(short = 'g', long)]
        group: Option<String>,
    },
    /// Export the persisted configuration
    Export {
        #[arg(short = 'g', long)]
        group: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct RegionArgs {
    pub name: String,
    #[arg(short = 't', long = "type")]
    pub region_type: Option<RegionType>,
    #[arg(short = 'g', long)]
    pub group: Option<String>,
    #[arg(long)]
    pub key_constraint: Option<String>,
    #[arg(long)]
    pub value_constraint: Option<String>,
}

#[derive(Debug, Args)]
pub struct GatewayReceiverArgs {
    #[arg(short = 'g', long)]
    pub group: Option<String>,
    #[arg(long)]
    pub start_port: Option<u16>,
    #[arg(long)]
    pub end_port: Option<u16>,
    #[arg(long)]
    pub bind_address: Option<String>,
    #[arg(long)]
    pub hostname_for_senders: Option<String>,
    #[arg(long)]
    pub maximum_time_between_pings: Option<u32>,
    #[arg(long)]
    pub socket_buffer_size: Option<u32>,
    #[arg(long)]
    pub manual_start: bool,
}

/// Build the layered configuration for the given command line
pub fn load_configuration(cli: &Cli) -> anyhow::Result<Configuration> {
    let mut builder = Config::builder()
        .add_source(File::from(cli.config_file.as_path()).required(false))
        .add_source(
            Environment::with_prefix("cairn")
                .keep_prefix(true)
                .separator(".")
                .try_parsing(true),
        );

    if let Some(v) = &cli.member_name {
        builder = builder.set_override("cairn.member.name", v.as_str())?;
    }
    if let Some(v) = &cli.groups {
        builder = builder.set_override("cairn.member.groups", v.as_str())?;
    }
    if let Some(v) = &cli.mode {
        builder = builder.set_override("cairn.persistence.mode", v.as_str())?;
    }
    if let Some(v) = &cli.data_dir {
        builder = builder.set_override("cairn.persistence.embedded.path", v.as_str())?;
    }

    let config = builder
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build configuration: {}", e))?;
    Ok(Configuration::from_config(config))
}

/// Logging settings from `cairn.logs.*`, falling back to the environment
pub fn logging_config(configuration: &Configuration) -> LoggingConfig {
    let config = &configuration.config;
    if config.get_table("cairn.logs").is_err() {
        return LoggingConfig::from_env();
    }

    LoggingConfig::from_config(
        config.get_string("cairn.logs.path").ok(),
        config.get_bool("cairn.logs.console").unwrap_or(true),
        config.get_bool("cairn.logs.file").unwrap_or(true),
        config
            .get_string("cairn.logs.level")
            .unwrap_or_else(|_| "info".to_string()),
        config.get_string("cairn.logs.rotation").ok(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_parse_create_region() {
        let cli = parse(&[
            "cairn-server",
            "--mode",
            "memory",
            "create-region",
            "orders",
            "--type",
            "partition",
            "--group",
            "group1",
        ]);
        match cli.command {
            Command::CreateRegion(args) => {
                assert_eq!(args.name, "orders");
                assert_eq!(args.region_type, Some(RegionType::Partition));
                assert_eq!(args.group.as_deref(), Some("group1"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_invalid_region_type_rejected() {
        let parsed =
            Cli::try_parse_from(["cairn-server", "create-region", "orders", "--type", "bogus"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(
            file,
            "cairn:\n  member:\n    name: from-file\n    groups: group1\n  persistence:\n    mode: embedded"
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let cli = parse(&["cairn-server", "-c", &path, "--mode", "memory", "export"]);
        let configuration = load_configuration(&cli).unwrap();

        assert_eq!(configuration.member_name(), "from-file");
        assert_eq!(configuration.member_groups(), vec!["group1"]);
        assert_eq!(configuration.persistence_mode(), "memory");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let cli = parse(&["cairn-server", "-c", "/nonexistent/cairn.yml", "list-regions"]);
        let configuration = load_configuration(&cli).unwrap();
        assert_eq!(configuration.persistence_mode(), "embedded");
        assert!(configuration.is_cluster_configuration_enabled());
    }

    #[test]
    fn test_logging_config_from_file() {
        let config = Config::builder()
            .set_default("cairn.logs.file", false)
            .unwrap()
            .set_default("cairn.logs.level", "debug")
            .unwrap()
            .build()
            .unwrap();
        let logging = logging_config(&Configuration::from_config(config));
        assert!(!logging.file_logging);
        assert_eq!(logging.console_level, tracing::Level::DEBUG);
    }
}
