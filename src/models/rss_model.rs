//! # Revenue Sharing Model
//!
//! One model exists per `(aggregator_id, owner_provider_id, product_class)`
//! triple. The model percentages and the stakeholder list are inputs to the
//! allocation calculator; the computed values end up on the sharing report.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Stakeholder entry of a sharing model (or of a computed allocation)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeholderModel {
    pub stakeholder_id: String,
    pub model_value: Decimal,
}

impl StakeholderModel {
    pub fn new(stakeholder_id: impl Into<String>, model_value: Decimal) -> Self {
        Self {
            stakeholder_id: stakeholder_id.into(),
            model_value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RssModel {
    pub aggregator_id: String,
    pub owner_provider_id: String,
    pub product_class: String,
    pub algorithm_type: String,
    pub aggregator_value: Decimal,
    pub owner_value: Decimal,
    #[serde(default)]
    pub stakeholders: Vec<StakeholderModel>,
}

impl RssModel {
    /// Check whether this model owns transactions of the given triple
    pub fn matches(&self, aggregator_id: &str, provider_id: &str, product_class: &str) -> bool {
        self.aggregator_id == aggregator_id
            && self.owner_provider_id == provider_id
            && self.product_class == product_class
    }

    /// Human readable scope label used in logs and task descriptions
    pub fn scope_label(&self) -> String {
        format!(
            "{}/{}/{}",
            self.aggregator_id, self.owner_provider_id, self.product_class
        )
    }
}
