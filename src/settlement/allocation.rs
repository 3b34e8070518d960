//! # Allocation Calculation
//!
//! The allocation arithmetic is opaque to the orchestrator: it only sees the
//! [`AllocationCalculator`] trait. [`FixedPercentageCalculator`] is the stock
//! implementation for the `FIXED_PERCENTAGE` algorithm.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RssError};
use crate::models::{Currency, RssModel, StakeholderModel, Transaction};

pub const FIXED_PERCENTAGE: &str = "FIXED_PERCENTAGE";

/// Output of one allocation run over a set of transactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationResult {
    pub aggregator_value: Decimal,
    pub owner_value: Decimal,
    pub stakeholders: Vec<StakeholderModel>,
}

pub trait AllocationCalculator: Send + Sync {
    /// Split the revenue of `transactions`, all in `currency`, according to
    /// `model`
    fn calculate(
        &self,
        model: &RssModel,
        currency: &Currency,
        transactions: &[Transaction],
    ) -> Result<AllocationResult>;
}

/// Splits the net revenue (charges minus refunds) by the model percentages,
/// rounding each share to the currency's minor units
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPercentageCalculator;

impl FixedPercentageCalculator {
    fn share(total: Decimal, percentage: Decimal, minor_units: u32) -> Decimal {
        (total * percentage / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(minor_units, RoundingStrategy::MidpointAwayFromZero)
    }
}

impl AllocationCalculator for FixedPercentageCalculator {
    fn calculate(
        &self,
        model: &RssModel,
        currency: &Currency,
        transactions: &[Transaction],
    ) -> Result<AllocationResult> {
        if model.algorithm_type != FIXED_PERCENTAGE {
            return Err(RssError::Allocation(format!(
                "unsupported algorithm type {} for model {}",
                model.algorithm_type,
                model.scope_label()
            )));
        }

        let percentages: Decimal = model.aggregator_value
            + model.owner_value
            + model.stakeholders.iter().map(|s| s.model_value).sum::<Decimal>();
        if percentages != Decimal::ONE_HUNDRED {
            return Err(RssError::Allocation(format!(
                "model {} percentages add up to {percentages}, expected 100",
                model.scope_label()
            )));
        }

        let total: Decimal = transactions.iter().map(Transaction::signed_amount).sum();
        let minor_units = currency.minor_units();

        Ok(AllocationResult {
            aggregator_value: Self::share(total, model.aggregator_value, minor_units),
            owner_value: Self::share(total, model.owner_value, minor_units),
            stakeholders: model
                .stakeholders
                .iter()
                .map(|s| {
                    StakeholderModel::new(
                        s.stakeholder_id.clone(),
                        Self::share(total, s.model_value, minor_units),
                    )
                })
                .collect(),
        })
    }
}
