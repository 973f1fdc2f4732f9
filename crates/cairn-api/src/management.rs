//! Status codes and result envelopes of the cluster management service

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::element::CacheElement;

/// Status code taxonomy exposed to callers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    Ok,
    Created,
    Accepted,
    InProgress,
    IllegalArgument,
    IllegalState,
    EntityNotFound,
    EntityExists,
    Error,
    InternalError,
}

impl StatusCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "CREATED",
            StatusCode::Accepted => "ACCEPTED",
            StatusCode::InProgress => "IN_PROGRESS",
            StatusCode::IllegalArgument => "ILLEGAL_ARGUMENT",
            StatusCode::IllegalState => "ILLEGAL_STATE",
            StatusCode::EntityNotFound => "ENTITY_NOT_FOUND",
            StatusCode::EntityExists => "ENTITY_EXISTS",
            StatusCode::Error => "ERROR",
            StatusCode::InternalError => "INTERNAL_ERROR",
        }
    }

    pub fn is_successful(&self) -> bool {
        matches!(
            self,
            StatusCode::Ok | StatusCode::Created | StatusCode::Accepted | StatusCode::InProgress
        )
    }
}

impl Display for StatusCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The kind of change applied to an element
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheElementOperation {
    Create,
    Delete,
}

impl CacheElementOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheElementOperation::Create => "create",
            CacheElementOperation::Delete => "delete",
        }
    }
}

impl Display for CacheElementOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A request rejected before any change was realized or persisted
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
#[error("{status_code}: {message}")]
pub struct ClusterManagementError {
    pub status_code: StatusCode,
    pub message: String,
}

impl ClusterManagementError {
    pub fn new(status_code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
        }
    }

    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Self::new(StatusCode::IllegalArgument, message)
    }

    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::new(StatusCode::IllegalState, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::EntityNotFound, message)
    }

    pub fn entity_exists(message: impl Into<String>) -> Self {
        Self::new(StatusCode::EntityExists, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::InternalError, message)
    }

    /// Envelope form for transports that always answer with a result body
    pub fn into_result(self) -> ClusterManagementResult {
        ClusterManagementResult::new(self.status_code, self.message)
    }
}

/// Base result carrying a status code and message
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterManagementResult {
    pub status_code: StatusCode,
    pub status_message: String,
}

impl ClusterManagementResult {
    pub fn new(status_code: StatusCode, status_message: impl Into<String>) -> Self {
        Self {
            status_code,
            status_message: status_message.into(),
        }
    }

    pub fn is_successful(&self) -> bool {
        self.status_code.is_successful()
    }
}

/// Outcome of applying a change on one member
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealizationResult {
    pub member_name: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RealizationResult {
    pub fn success(member_name: impl Into<String>) -> Self {
        Self {
            member_name: member_name.into(),
            success: true,
            message: None,
        }
    }

    pub fn failure(member_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            member_name: member_name.into(),
            success: false,
            message: Some(message.into()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Result of a create or delete: status plus per-member outcomes
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterManagementRealizationResult {
    pub status_code: StatusCode,
    pub status_message: String,
    #[serde(default)]
    pub member_statuses: Vec<RealizationResult>,
}

impl ClusterManagementRealizationResult {
    pub fn new(
        status_code: StatusCode,
        status_message: impl Into<String>,
        member_statuses: Vec<RealizationResult>,
    ) -> Self {
        Self {
            status_code,
            status_message: status_message.into(),
            member_statuses,
        }
    }

    pub fn is_successful(&self) -> bool {
        self.status_code.is_successful()
    }

    pub fn failed_members(&self) -> impl Iterator<Item = &RealizationResult> {
        self.member_statuses.iter().filter(|s| !s.success)
    }
}

/// Result of a list: merged elements annotated with their applicable groups
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterManagementListResult {
    pub status_code: StatusCode,
    pub status_message: String,
    #[serde(default)]
    pub result: Vec<CacheElement>,
}

impl ClusterManagementListResult {
    pub fn ok(result: Vec<CacheElement>) -> Self {
        Self {
            status_code: StatusCode::Ok,
            status_message: String::new(),
            result,
        }
    }

    pub fn is_successful(&self) -> bool {
        self.status_code.is_successful()
    }
}
