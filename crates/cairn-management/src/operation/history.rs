// Operation history
// Tracks started operations by id and evicts completed ones after the retention period

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info};

use cairn_api::OperationDescriptor;

use crate::metrics;

/// Final state of an operation
#[derive(Clone, Debug, PartialEq)]
pub struct OperationOutcome {
    /// Unix millis
    pub end_time: i64,
    pub result: Result<Value, String>,
}

/// A started operation and its completion slot
#[derive(Debug)]
pub struct OperationInstance {
    pub id: String,
    pub descriptor: OperationDescriptor,
    /// Unix millis
    pub start_time: i64,
    completion: watch::Sender<Option<OperationOutcome>>,
}

impl OperationInstance {
    pub fn new(id: impl Into<String>, descriptor: OperationDescriptor) -> Self {
        let (completion, _) = watch::channel(None);
        Self {
            id: id.into(),
            descriptor,
            start_time: chrono::Utc::now().timestamp_millis(),
            completion,
        }
    }

    /// The outcome, if the operation has completed
    pub fn outcome(&self) -> Option<OperationOutcome> {
        self.completion.borrow().clone()
    }

    pub fn is_complete(&self) -> bool {
        self.completion.borrow().is_some()
    }

    /// Record the outcome; the first completion wins
    pub fn complete(&self, result: Result<Value, String>) {
        let outcome = OperationOutcome {
            end_time: chrono::Utc::now().timestamp_millis(),
            result,
        };
        self.completion.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(outcome);
            true
        });
    }

    /// Wait until the operation completes
    pub async fn wait(&self) -> OperationOutcome {
        let mut receiver = self.completion.subscribe();
        let outcome = match receiver.wait_for(Option::is_some).await {
            Ok(slot) => slot.clone(),
            Err(_) => self.outcome(),
        };
        outcome.unwrap_or_else(|| OperationOutcome {
            end_time: chrono::Utc::now().timestamp_millis(),
            result: Err("Operation was abandoned".to_string()),
        })
    }
}

/// Started operations keyed by id
#[derive(Clone)]
pub struct OperationHistory {
    entries: Arc<DashMap<String, Arc<OperationInstance>>>,
    retention: Duration,
}

impl OperationHistory {
    pub fn new(retention: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            retention,
        }
    }

    /// Register an instance; `false` if the id is already taken
    pub fn insert(&self, instance: Arc<OperationInstance>) -> bool {
        match self.entries.entry(instance.id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(instance);
                true
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<OperationInstance>> {
        self.entries.get(id).map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evict completed operations that ended more than the retention before `now_millis`
    ///
    /// Operations still in progress are never evicted.
    pub fn sweep(&self, now_millis: i64) -> usize {
        let retention = i64::try_from(self.retention.as_millis()).unwrap_or(i64::MAX);
        let before = self.entries.len();
        self.entries.retain(|_, instance| match instance.outcome() {
            Some(outcome) => now_millis.saturating_sub(outcome.end_time) <= retention,
            None => true,
        });
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(count = removed, "Evicted completed operations");
            metrics::record_operations_evicted(removed);
        }
        removed
    }

    /// Spawn a background task that sweeps the history every `every`
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_sweeper(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let history = self.clone();
        info!(
            retention_secs = self.retention.as_secs(),
            "Operation history sweeper started"
        );
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                history.sweep(chrono::Utc::now().timestamp_millis());
            }
        })
    }
}
