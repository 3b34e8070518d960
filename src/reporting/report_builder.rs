//! # Report Builder
//!
//! Turns a computed allocation into a persisted [`SharingReport`] plus one
//! [`StakeholderAllocation`] per distinct stakeholder.
//!
//! Every lookup (owner, currency, stakeholders) happens before anything is
//! written, so a failed lookup never leaves a partial report behind. The
//! report is persisted first; its allocations follow because their key is the
//! store-assigned report id.

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::database::{CurrencyDirectory, ModelDirectory, ReportStore};
use crate::error::{Result, RssError};
use crate::models::{
    Currency, NewSharingReport, Provider, RssModel, SharingReport, StakeholderAllocation,
};
use crate::settlement::AllocationResult;

pub struct ReportBuilder {
    directory: Arc<dyn ModelDirectory>,
    currencies: Arc<dyn CurrencyDirectory>,
    reports: Arc<dyn ReportStore>,
}

impl ReportBuilder {
    pub fn new(
        directory: Arc<dyn ModelDirectory>,
        currencies: Arc<dyn CurrencyDirectory>,
        reports: Arc<dyn ReportStore>,
    ) -> Self {
        Self {
            directory,
            currencies,
            reports,
        }
    }

    /// Build and persist the sharing report for one settlement computation
    #[instrument(skip(self, model, result), fields(scope = %model.scope_label()))]
    pub async fn generate_report(
        &self,
        model: &RssModel,
        currency_code: &str,
        result: &AllocationResult,
    ) -> Result<SharingReport> {
        info!(
            aggregator_id = %model.aggregator_id,
            provider_id = %model.owner_provider_id,
            product_class = %model.product_class,
            currency = currency_code,
            "Generating report"
        );

        let owner = self
            .directory
            .get_provider(&model.aggregator_id, &model.owner_provider_id)
            .await
            .map_err(report_io)?
            .ok_or_else(|| {
                RssError::ReportGeneration(format!(
                    "owner provider {} not found under aggregator {}",
                    model.owner_provider_id, model.aggregator_id
                ))
            })?;

        let currency = self.currency(currency_code).await?;

        let stakeholders = self.resolve_stakeholders(model, result).await?;

        let report = self
            .reports
            .create(NewSharingReport {
                algorithm_type: model.algorithm_type.clone(),
                product_class: model.product_class.clone(),
                generated_at: Utc::now(),
                aggregator_value: result.aggregator_value,
                owner_value: result.owner_value,
                owner,
                currency,
                paid: false,
            })
            .await
            .map_err(report_io)?;

        let mut allocations = Vec::with_capacity(stakeholders.len());
        for (stakeholder, model_value) in stakeholders {
            let allocation = StakeholderAllocation::for_report(&report, stakeholder, model_value);
            self.reports
                .create_allocation(&allocation)
                .await
                .map_err(report_io)?;
            allocations.push(allocation);
        }

        debug!(
            report_id = %report.id,
            stakeholders = allocations.len(),
            "Report persisted"
        );

        Ok(SharingReport {
            stakeholders: allocations,
            ..report
        })
    }

    /// Look up a report currency by ISO code
    pub async fn currency(&self, currency_code: &str) -> Result<Currency> {
        self.currencies
            .get_by_iso_code(currency_code)
            .await
            .map_err(report_io)?
            .ok_or_else(|| RssError::ReportGeneration(format!("currency {currency_code} not found")))
    }

    /// Snapshot the allocated stakeholders, keeping the first entry per
    /// stakeholder id
    async fn resolve_stakeholders(
        &self,
        model: &RssModel,
        result: &AllocationResult,
    ) -> Result<Vec<(Provider, rust_decimal::Decimal)>> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();

        for entry in &result.stakeholders {
            if !seen.insert(entry.stakeholder_id.as_str()) {
                debug!(
                    stakeholder_id = %entry.stakeholder_id,
                    "Skipping duplicate stakeholder"
                );
                continue;
            }

            let stakeholder = self
                .directory
                .get_provider(&model.aggregator_id, &entry.stakeholder_id)
                .await
                .map_err(report_io)?
                .ok_or_else(|| {
                    RssError::ReportGeneration(format!(
                        "stakeholder {} not found under aggregator {}",
                        entry.stakeholder_id, model.aggregator_id
                    ))
                })?;
            resolved.push((stakeholder, entry.model_value));
        }

        Ok(resolved)
    }
}

fn report_io(err: RssError) -> RssError {
    match err {
        RssError::ReportGeneration(_) => err,
        other => RssError::ReportGeneration(other.to_string()),
    }
}
