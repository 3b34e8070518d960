//! # Sharing Report Model
//!
//! Persisted output of one settlement computation. Reports are created once by
//! the report builder and never deleted by the core; only `paid` changes later.
//!
//! Stakeholder allocations are keyed by `(report, stakeholder)`. An allocation
//! can only be built from a [`SharingReport`], which only exists once the
//! report store has assigned its [`ReportId`], so an allocation can never
//! reference a report that has not been persisted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

use super::aggregator::Provider;

/// Store-assigned report identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(i64);

impl ReportId {
    /// Wrap an identifier assigned by a report store
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, FromRow)]
pub struct Currency {
    /// ISO 4217 alphabetic code
    pub iso_code: String,
    pub name: String,
    /// Minor unit digits (2 for EUR)
    pub decimals: i16,
}

impl Currency {
    pub fn new(iso_code: impl Into<String>, name: impl Into<String>, decimals: i16) -> Self {
        Self {
            iso_code: iso_code.into(),
            name: name.into(),
            decimals,
        }
    }

    /// Decimal places amounts in this currency are rounded to
    pub fn minor_units(&self) -> u32 {
        u32::try_from(self.decimals).unwrap_or(0)
    }
}

/// Report contents before the store assigns an identifier
#[derive(Debug, Clone, PartialEq)]
pub struct NewSharingReport {
    pub algorithm_type: String,
    pub product_class: String,
    pub generated_at: DateTime<Utc>,
    pub aggregator_value: Decimal,
    pub owner_value: Decimal,
    pub owner: Provider,
    pub currency: Currency,
    pub paid: bool,
}

/// Persisted report; only report stores construct one
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SharingReport {
    pub id: ReportId,
    pub algorithm_type: String,
    pub product_class: String,
    pub generated_at: DateTime<Utc>,
    pub aggregator_value: Decimal,
    pub owner_value: Decimal,
    pub owner: Provider,
    pub currency: Currency,
    pub paid: bool,
    pub stakeholders: Vec<StakeholderAllocation>,
}

impl SharingReport {
    /// Attach the store-assigned id to a new report
    pub fn persisted(id: ReportId, report: NewSharingReport) -> Self {
        Self {
            id,
            algorithm_type: report.algorithm_type,
            product_class: report.product_class,
            generated_at: report.generated_at,
            aggregator_value: report.aggregator_value,
            owner_value: report.owner_value,
            owner: report.owner,
            currency: report.currency,
            paid: report.paid,
            stakeholders: Vec::new(),
        }
    }
}

/// Snapshot of one stakeholder's share for a specific report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StakeholderAllocation {
    report_id: ReportId,
    pub stakeholder: Provider,
    pub model_value: Decimal,
}

impl StakeholderAllocation {
    pub fn for_report(report: &SharingReport, stakeholder: Provider, model_value: Decimal) -> Self {
        Self {
            report_id: report.id,
            stakeholder,
            model_value,
        }
    }

    /// Rehydrate an allocation read back from a report store
    pub(crate) fn stored(report_id: ReportId, stakeholder: Provider, model_value: Decimal) -> Self {
        Self {
            report_id,
            stakeholder,
            model_value,
        }
    }

    pub fn report_id(&self) -> ReportId {
        self.report_id
    }

    /// Composite key `(report, stakeholder provider)`
    pub fn key(&self) -> (ReportId, &str, &str) {
        (
            self.report_id,
            self.stakeholder.aggregator_id.as_str(),
            self.stakeholder.provider_id.as_str(),
        )
    }
}
