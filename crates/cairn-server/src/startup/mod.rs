//! Application startup utilities module.

mod bootstrap;
mod logging;

pub use bootstrap::{App, bootstrap, build_persistence};
pub use logging::{LogRotation, LoggingConfig, LoggingGuard, init_logging};
