//! Asynchronous cluster operations
//!
//! An operation is started by endpoint, runs on the tokio runtime and is
//! tracked in the [`OperationHistory`] until its retention expires.

pub mod export;
pub mod history;
pub mod manager;

pub use export::{EXPORT_ENDPOINT, ExportConfigurationPerformer};
pub use history::{OperationHistory, OperationInstance, OperationOutcome};
pub use manager::OperationManager;

use async_trait::async_trait;
use serde_json::Value;

/// The work behind one operation endpoint
#[async_trait]
pub trait OperationPerformer: Send + Sync {
    /// Endpoint path identifying the operation, e.g. `/operations/export`
    fn endpoint(&self) -> &str;

    async fn perform(&self, payload: Value) -> anyhow::Result<Value>;
}
