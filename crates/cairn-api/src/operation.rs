//! Asynchronous cluster operations

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::management::StatusCode;

/// An operation request: the endpoint that identifies the operation and its payload
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDescriptor {
    pub endpoint: String,
    #[serde(default)]
    pub payload: Value,
}

impl OperationDescriptor {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            payload: Value::Null,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Returned by `start`: the handle of a submitted operation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterManagementOperationResult {
    pub status_code: StatusCode,
    pub status_message: String,
    pub operation_id: String,
    pub uri: String,
    /// Unix millis
    pub operation_start: i64,
}

impl ClusterManagementOperationResult {
    pub fn is_successful(&self) -> bool {
        self.status_code.is_successful()
    }
}

/// Returned by `check_status`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterManagementOperationStatusResult {
    pub status_code: StatusCode,
    pub status_message: String,
    pub operation_id: String,
    pub operation_start: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_end: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl ClusterManagementOperationStatusResult {
    pub fn is_successful(&self) -> bool {
        self.status_code.is_successful()
    }

    pub fn is_complete(&self) -> bool {
        self.operation_end.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_payload_defaults_to_null() {
        let descriptor: OperationDescriptor =
            serde_json::from_str(r#"{"endpoint":"/operations/export"}"#).unwrap();
        assert_eq!(descriptor.endpoint, "/operations/export");
        assert!(descriptor.payload.is_null());
    }

    #[test]
    fn test_status_result_skips_absent_fields() {
        let status = ClusterManagementOperationStatusResult {
            status_code: StatusCode::InProgress,
            status_message: "Operation in progress".to_string(),
            operation_id: "42".to_string(),
            operation_start: 1,
            operation_end: None,
            result: None,
            failure: None,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert!(json.get("result").is_none());
        assert!(json.get("operationEnd").is_none());
        assert!(!status.is_complete());
    }
}
