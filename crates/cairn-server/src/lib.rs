//! Cairn Server - standalone cluster configuration server
//!
//! This crate provides:
//! - Layered configuration loading and the command line
//! - Multi-file logging initialization
//! - Metrics descriptions
//! - Bootstrap of the store, the local member and the management service
//! - Administration commands rendering JSON results

pub mod command;
pub mod metrics;
pub mod model;
pub mod startup;
