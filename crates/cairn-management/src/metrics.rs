// Metrics for the cluster management service
// Request outcomes, realization failures and asynchronous operations

use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

use cairn_api::{CacheElementOperation, ElementKind, StatusCode};

/// Describe the management metrics
/// Should be called once at application startup
pub fn describe_metrics() {
    describe_counter!(
        "cluster_management_requests_total",
        "Total number of create, delete and list requests by outcome"
    );
    describe_histogram!(
        "cluster_management_request_duration_seconds",
        "Create, delete and list request duration in seconds"
    );
    describe_counter!(
        "cluster_management_realization_failures_total",
        "Total number of member realization failures"
    );
    describe_counter!(
        "cluster_management_operations_started_total",
        "Total number of asynchronous operations started"
    );
    describe_gauge!(
        "cluster_management_operations_in_progress",
        "Number of asynchronous operations not yet complete"
    );
    describe_counter!(
        "cluster_management_operations_evicted_total",
        "Total number of completed operations evicted from history"
    );
}

/// Record a create or delete request outcome
pub fn record_change(
    operation: CacheElementOperation,
    kind: ElementKind,
    status: StatusCode,
    duration_secs: f64,
) {
    record_request(operation.as_str(), kind, status, duration_secs);
}

/// Record a request outcome
pub fn record_request(request: &str, kind: ElementKind, status: StatusCode, duration_secs: f64) {
    counter!("cluster_management_requests_total", "request" => request.to_string(), "kind" => kind.type_name(), "status" => status.as_str()).increment(1);
    histogram!("cluster_management_request_duration_seconds", "request" => request.to_string(), "kind" => kind.type_name()).record(duration_secs);
}

/// Record failed member realizations
pub fn record_realization_failures(operation: CacheElementOperation, kind: ElementKind, failed: usize) {
    counter!("cluster_management_realization_failures_total", "operation" => operation.as_str(), "kind" => kind.type_name()).increment(failed as u64);
}

/// Record an operation start
pub fn record_operation_started(endpoint: &str) {
    counter!("cluster_management_operations_started_total", "endpoint" => endpoint.to_string()).increment(1);
    gauge!("cluster_management_operations_in_progress").increment(1.0);
}

/// Record an operation completion
pub fn record_operation_completed() {
    gauge!("cluster_management_operations_in_progress").decrement(1.0);
}

/// Record evicted history entries
pub fn record_operations_evicted(count: usize) {
    counter!("cluster_management_operations_evicted_total").increment(count as u64);
}

/// Timer helper for measuring request duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
