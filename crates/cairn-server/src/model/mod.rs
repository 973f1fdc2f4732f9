pub mod config;

pub use config::{Cli, Command, load_configuration, logging_config};
