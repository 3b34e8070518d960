use serde::{Deserialize, Serialize};
use std::fmt;

use super::events::TransactionEvent;
use crate::error::{Result, RssError};

/// Settlement state of a billable transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    /// Waiting to be picked up by a settlement job
    Pending,
    /// Claimed by a settlement job; owned by exactly one settlement task
    Processing,
    /// Allocation computed and report generated
    Settled,
    /// Settlement task failed for this transaction
    Failed,
}

impl TransactionState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Settled)
    }

    /// Check if a settlement job may claim a transaction in this state
    pub fn is_claimable(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Apply an event, returning the target state or a transition error
    pub fn transition(self, event: TransactionEvent) -> Result<Self> {
        use TransactionEvent as E;

        match (self, event) {
            (Self::Pending, E::Claim) => Ok(Self::Processing),
            (Self::Processing, E::Settle) => Ok(Self::Settled),
            (Self::Processing, E::Fail) => Ok(Self::Failed),
            (Self::Processing, E::Release) => Ok(Self::Pending),
            (Self::Failed, E::Retry) => Ok(Self::Pending),
            (from, event) if from.is_terminal() => Err(RssError::StateTransition(format!(
                "{from} transaction is final, cannot apply {}",
                event.event_type()
            ))),
            (from, event) => Err(RssError::StateTransition(format!(
                "cannot apply {} to a {from} transaction",
                event.event_type()
            ))),
        }
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Settled => write!(f, "settled"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for TransactionState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "settled" => Ok(Self::Settled),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid transaction state: {s}")),
        }
    }
}

impl Default for TransactionState {
    fn default() -> Self {
        Self::Pending
    }
}
