//! Cairn API - model definitions shared by the management core and its callers
//!
//! This crate provides:
//! - Configuration elements and the per-group document that holds them
//! - Cluster members
//! - Status codes and result envelopes returned by the management service
//! - Operation descriptors and operation results
//! - Input validation utilities

pub mod element;
pub mod management;
pub mod model;
pub mod operation;
pub mod validation;

// Re-export commonly used types
pub use element::*;
pub use management::*;
pub use model::*;
pub use operation::*;
pub use validation::*;
