//! # Orchestration Types
//!
//! Types shared between the task dispatcher, the orchestrator and completion
//! notifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a settlement task did not complete successfully
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The task returned an error
    Error,
    /// The task panicked
    Panicked,
    /// The task exceeded the configured time limit
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    /// Description of the failed work unit (usually the model scope)
    pub task: String,
    pub kind: FailureKind,
    pub error: String,
}

/// Completion record of one callback-keyed task pool, delivered exactly once
/// to the completion notifier when the pool is closed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSummary {
    pub callback_key: String,
    pub submitted: usize,
    pub succeeded: usize,
    pub failures: Vec<TaskFailure>,
    pub opened_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl PoolSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}
