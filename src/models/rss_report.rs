//! # RSS Report View
//!
//! Flattened, presentation-oriented projection of a [`SharingReport`]. The
//! projection is a pure function of the persisted report so it can be tested
//! without a data layer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::rss_model::StakeholderModel;
use super::sharing_report::SharingReport;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RssReport {
    pub id: i64,
    pub aggregator_id: String,
    pub owner_provider_id: String,
    pub product_class: String,
    pub algorithm_type: String,
    pub aggregator_value: Decimal,
    pub owner_value: Decimal,
    pub currency: String,
    pub timestamp: DateTime<Utc>,
    pub paid: bool,
    pub stakeholders: Vec<StakeholderModel>,
}

impl From<&SharingReport> for RssReport {
    fn from(report: &SharingReport) -> Self {
        Self {
            id: report.id.value(),
            aggregator_id: report.owner.aggregator_id.clone(),
            owner_provider_id: report.owner.provider_id.clone(),
            product_class: report.product_class.clone(),
            algorithm_type: report.algorithm_type.clone(),
            aggregator_value: report.aggregator_value,
            owner_value: report.owner_value,
            currency: report.currency.iso_code.clone(),
            timestamp: report.generated_at,
            paid: report.paid,
            stakeholders: report
                .stakeholders
                .iter()
                .map(|allocation| {
                    StakeholderModel::new(
                        allocation.stakeholder.provider_id.clone(),
                        allocation.model_value,
                    )
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Currency, NewSharingReport, Provider, ReportId, StakeholderAllocation};
    use rust_decimal_macros::dec;

    #[test]
    fn test_projection_flattens_owner_currency_and_stakeholders() {
        let owner = Provider::new("agg@example.com", "owner-1", "Owner");
        let mut report = SharingReport::persisted(
            ReportId::new(42),
            NewSharingReport {
                algorithm_type: "FIXED_PERCENTAGE".to_string(),
                product_class: "music".to_string(),
                generated_at: Utc::now(),
                aggregator_value: dec!(30.00),
                owner_value: dec!(60.00),
                owner,
                currency: Currency::new("EUR", "Euro", 2),
                paid: true,
            },
        );
        let stakeholder = Provider::new("agg@example.com", "label-1", "Label");
        let allocation = StakeholderAllocation::for_report(&report, stakeholder, dec!(10.00));
        report.stakeholders.push(allocation);

        let view = RssReport::from(&report);

        assert_eq!(view.id, 42);
        assert_eq!(view.aggregator_id, "agg@example.com");
        assert_eq!(view.owner_provider_id, "owner-1");
        assert_eq!(view.currency, "EUR");
        assert!(view.paid);
        assert_eq!(
            view.stakeholders,
            vec![StakeholderModel::new("label-1", dec!(10.00))]
        );
    }
}
