use serde::{Deserialize, Serialize};

/// Events that can trigger transaction state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionEvent {
    /// A settlement job leases the transaction
    Claim,
    /// The settlement task produced its report
    Settle,
    /// The settlement task failed
    Fail,
    /// The enclosing unit of work rolled back the claim
    Release,
    /// Operator put a failed transaction back into the queue
    Retry,
}

impl TransactionEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Claim => "claim",
            Self::Settle => "settle",
            Self::Fail => "fail",
            Self::Release => "release",
            Self::Retry => "retry",
        }
    }
}
