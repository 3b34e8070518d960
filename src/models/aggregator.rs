//! # Aggregator and Provider Models
//!
//! Reference data owned outside the settlement core. An aggregator collects
//! revenue across providers; each provider belongs to exactly one aggregator.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Revenue-sharing aggregator. `aggregator_id` is the aggregator's contact
/// e-mail and doubles as its external identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, FromRow)]
pub struct Aggregator {
    pub aggregator_id: String,
    pub name: String,
}

impl Aggregator {
    pub fn new(aggregator_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            aggregator_id: aggregator_id.into(),
            name: name.into(),
        }
    }
}

/// Resource owner or stakeholder, scoped by its aggregator
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, FromRow)]
pub struct Provider {
    pub aggregator_id: String,
    pub provider_id: String,
    pub name: String,
}

impl Provider {
    pub fn new(
        aggregator_id: impl Into<String>,
        provider_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            aggregator_id: aggregator_id.into(),
            provider_id: provider_id.into(),
            name: name.into(),
        }
    }

    pub fn belongs_to(&self, aggregator_id: &str) -> bool {
        self.aggregator_id == aggregator_id
    }
}
