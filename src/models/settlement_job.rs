use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, RssError};

/// A request to settle every pending transaction within a scope.
///
/// Scope fields are optional; `None` and the empty string both mean "all".
/// Jobs are transient and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementJob {
    #[serde(default = "Uuid::new_v4")]
    pub job_id: Uuid,
    #[serde(default)]
    pub aggregator_id: Option<String>,
    #[serde(default)]
    pub provider_id: Option<String>,
    #[serde(default)]
    pub product_class: Option<String>,
    pub callback_url: String,
}

impl SettlementJob {
    pub fn new(callback_url: impl Into<String>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            aggregator_id: None,
            provider_id: None,
            product_class: None,
            callback_url: callback_url.into(),
        }
    }

    pub fn with_aggregator(mut self, aggregator_id: impl Into<String>) -> Self {
        self.aggregator_id = Some(aggregator_id.into());
        self
    }

    pub fn with_provider(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = Some(provider_id.into());
        self
    }

    pub fn with_product_class(mut self, product_class: impl Into<String>) -> Self {
        self.product_class = Some(product_class.into());
        self
    }

    pub fn aggregator_id(&self) -> Option<&str> {
        non_empty(&self.aggregator_id)
    }

    pub fn provider_id(&self) -> Option<&str> {
        non_empty(&self.provider_id)
    }

    pub fn product_class(&self) -> Option<&str> {
        non_empty(&self.product_class)
    }

    /// The callback URL is the dispatcher key for this job
    pub fn callback_key(&self) -> &str {
        &self.callback_url
    }

    pub fn validate(&self) -> Result<()> {
        if self.callback_url.trim().is_empty() {
            return Err(RssError::missing_parameter("callbackUrl"));
        }
        Ok(())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
