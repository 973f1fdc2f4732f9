// Operation manager
// Starts operations on the tokio runtime and answers status polls from the history

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use dashmap::DashMap;
use futures::FutureExt;
use tracing::{info, warn};

use cairn_api::{
    ClusterManagementError, ClusterManagementOperationResult,
    ClusterManagementOperationStatusResult, OperationDescriptor, StatusCode,
};
use cairn_common::join_path;

use super::OperationPerformer;
use super::history::{OperationHistory, OperationInstance};
use crate::config::ManagementConfig;
use crate::metrics;

/// Starts and tracks asynchronous operations
pub struct OperationManager {
    performers: DashMap<String, Arc<dyn OperationPerformer>>,
    history: OperationHistory,
    api_base: String,
}

impl OperationManager {
    pub fn new(config: &ManagementConfig) -> Self {
        Self {
            performers: DashMap::new(),
            history: OperationHistory::new(config.operation_retention),
            api_base: config.api_base.clone(),
        }
    }

    /// Register the performer of an endpoint, replacing any previous one
    pub fn register(&self, performer: Arc<dyn OperationPerformer>) {
        let endpoint = join_path(&[performer.endpoint()]);
        info!(endpoint = %endpoint, "Operation performer registered");
        self.performers.insert(endpoint, performer);
    }

    pub fn history(&self) -> &OperationHistory {
        &self.history
    }

    /// Start an operation and return without waiting for it
    pub async fn start(
        &self,
        descriptor: OperationDescriptor,
    ) -> Result<ClusterManagementOperationResult, ClusterManagementError> {
        let endpoint = join_path(&[&descriptor.endpoint]);
        let performer = self
            .performers
            .get(&endpoint)
            .map(|p| p.value().clone())
            .ok_or_else(|| {
                ClusterManagementError::illegal_argument(format!(
                    "Operation {} is not supported.",
                    descriptor.endpoint
                ))
            })?;

        let payload = descriptor.payload.clone();
        let instance = loop {
            let candidate = Arc::new(OperationInstance::new(
                uuid::Uuid::new_v4().to_string(),
                descriptor.clone(),
            ));
            if self.history.insert(candidate.clone()) {
                break candidate;
            }
        };

        metrics::record_operation_started(&endpoint);
        info!(operation_id = %instance.id, endpoint = %endpoint, "Operation started");

        let running = instance.clone();
        tokio::spawn(async move {
            let outcome = AssertUnwindSafe(performer.perform(payload))
                .catch_unwind()
                .await;
            let result = match outcome {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => {
                    warn!(operation_id = %running.id, error = %e, "Operation failed");
                    Err(format!("{:#}", e))
                }
                Err(_) => {
                    warn!(operation_id = %running.id, "Operation panicked");
                    Err("Operation terminated unexpectedly".to_string())
                }
            };
            running.complete(result);
            metrics::record_operation_completed();
        });

        Ok(ClusterManagementOperationResult {
            status_code: StatusCode::Accepted,
            status_message: "Operation started".to_string(),
            uri: join_path(&[&self.api_base, &endpoint, &instance.id]),
            operation_id: instance.id.clone(),
            operation_start: instance.start_time,
        })
    }

    /// Poll the state of an operation without blocking
    pub fn check_status(
        &self,
        id: &str,
    ) -> Result<ClusterManagementOperationStatusResult, ClusterManagementError> {
        let instance = self.find(id)?;
        Ok(Self::status_of(&instance))
    }

    /// Wait for an operation to complete and return its final state
    pub async fn wait_for(
        &self,
        id: &str,
    ) -> Result<ClusterManagementOperationStatusResult, ClusterManagementError> {
        let instance = self.find(id)?;
        instance.wait().await;
        Ok(Self::status_of(&instance))
    }

    fn find(&self, id: &str) -> Result<Arc<OperationInstance>, ClusterManagementError> {
        self.history.get(id).ok_or_else(|| {
            ClusterManagementError::not_found(format!("Operation '{}' does not exist.", id))
        })
    }

    fn status_of(instance: &OperationInstance) -> ClusterManagementOperationStatusResult {
        let mut status = ClusterManagementOperationStatusResult {
            status_code: StatusCode::InProgress,
            status_message: "Operation in progress".to_string(),
            operation_id: instance.id.clone(),
            operation_start: instance.start_time,
            operation_end: None,
            result: None,
            failure: None,
        };

        if let Some(outcome) = instance.outcome() {
            status.operation_end = Some(outcome.end_time);
            match outcome.result {
                Ok(value) => {
                    status.status_code = StatusCode::Ok;
                    status.status_message = "Operation finished successfully".to_string();
                    status.result = Some(value);
                }
                Err(failure) => {
                    status.status_code = StatusCode::Error;
                    status.status_message = "Operation failed".to_string();
                    status.failure = Some(failure);
                }
            }
        }
        status
    }
}
