//! # Data Access Layer
//!
//! Collaborator traits consumed by the settlement core, plus two implementations:
//!
//! - [`memory`] - in-process store used by tests and embedders
//! - [`postgres`] - SQLx/PostgreSQL store (behind the `postgres` feature)
//!
//! The core never issues queries directly; every read and write goes through
//! one of the traits below so orchestration logic stays storage-agnostic.

pub mod memory;
pub mod pagination;
#[cfg(feature = "postgres")]
pub mod connection;
#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    Aggregator, Currency, NewSharingReport, Provider, ReportId, RssModel, SharingReport,
    StakeholderAllocation, Transaction,
};
use crate::state_machine::TransactionState;

pub use memory::{FailPoint, InMemoryStore, StoreEvent};
pub use pagination::Pagination;
#[cfg(feature = "postgres")]
pub use connection::DatabaseConnection;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;

/// Aggregator, provider and sharing model reference data
#[async_trait]
pub trait ModelDirectory: Send + Sync {
    /// All aggregators visible to the caller
    async fn list_aggregators(&self) -> Result<Vec<Aggregator>>;

    async fn get_aggregator(&self, aggregator_id: &str) -> Result<Option<Aggregator>>;

    async fn list_providers(&self, aggregator_id: &str) -> Result<Vec<Provider>>;

    /// Provider `provider_id` owned by `aggregator_id`; `None` when it does not
    /// exist under that aggregator
    async fn get_provider(&self, aggregator_id: &str, provider_id: &str)
        -> Result<Option<Provider>>;

    /// Models of a provider, optionally restricted to one product class
    async fn list_models(
        &self,
        aggregator_id: &str,
        provider_id: &str,
        product_class: Option<&str>,
    ) -> Result<Vec<RssModel>>;

    async fn model_exists(
        &self,
        aggregator_id: &str,
        provider_id: &str,
        product_class: &str,
    ) -> Result<bool>;
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Transactions of one model that are eligible for settlement
    async fn find_pending(
        &self,
        aggregator_id: &str,
        provider_id: &str,
        product_class: &str,
    ) -> Result<Vec<Transaction>>;

    /// Unconditional state write
    async fn update(&self, transaction: &Transaction) -> Result<()>;

    /// Conditional state write; returns `false` when the stored state is no
    /// longer `expected` (another job got there first)
    async fn update_if_state(
        &self,
        transaction: &Transaction,
        expected: TransactionState,
    ) -> Result<bool>;

    /// Make every preceding write durable and visible to other readers
    async fn flush(&self) -> Result<()>;
}

/// Filters accepted by [`ReportStore::query`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
    pub aggregator_id: Option<String>,
    pub provider_id: Option<String>,
    pub product_class: Option<String>,
    pub only_paid: bool,
}

impl ReportFilter {
    pub fn matches(&self, report: &SharingReport) -> bool {
        if self.only_paid && !report.paid {
            return false;
        }
        if let Some(aggregator_id) = non_empty(&self.aggregator_id) {
            if report.owner.aggregator_id != aggregator_id {
                return false;
            }
        }
        if let Some(provider_id) = non_empty(&self.provider_id) {
            if report.owner.provider_id != provider_id {
                return false;
            }
        }
        if let Some(product_class) = non_empty(&self.product_class) {
            if report.product_class != product_class {
                return false;
            }
        }
        true
    }
}

pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Persist a report and return it with its assigned id
    async fn create(&self, report: NewSharingReport) -> Result<SharingReport>;

    /// Persist one stakeholder allocation of an existing report
    async fn create_allocation(&self, allocation: &StakeholderAllocation) -> Result<()>;

    async fn get_by_id(&self, id: ReportId) -> Result<Option<SharingReport>>;

    /// Returns `false` when no report has this id
    async fn set_paid(&self, id: ReportId, paid: bool) -> Result<bool>;

    /// Reports ordered by ascending id; `None` signals absence
    async fn query(
        &self,
        filter: &ReportFilter,
        pagination: Pagination,
    ) -> Result<Option<Vec<SharingReport>>>;
}

#[async_trait]
pub trait CurrencyDirectory: Send + Sync {
    async fn get_by_iso_code(&self, iso_code: &str) -> Result<Option<Currency>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewSharingReport;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn report(paid: bool) -> SharingReport {
        SharingReport::persisted(
            ReportId::new(1),
            NewSharingReport {
                algorithm_type: "FIXED_PERCENTAGE".to_string(),
                product_class: "music".to_string(),
                generated_at: Utc::now(),
                aggregator_value: dec!(1),
                owner_value: dec!(2),
                owner: Provider::new("agg@example.com", "prov-1", "Provider"),
                currency: Currency::new("EUR", "Euro", 2),
                paid,
            },
        )
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = ReportFilter::default();
        assert!(filter.matches(&report(false)));
        assert!(filter.matches(&report(true)));
    }

    #[test]
    fn test_only_paid_and_scope_filters() {
        let filter = ReportFilter {
            aggregator_id: Some("agg@example.com".to_string()),
            provider_id: Some(String::new()),
            product_class: Some("music".to_string()),
            only_paid: true,
        };
        assert!(filter.matches(&report(true)));
        assert!(!filter.matches(&report(false)));

        let other = ReportFilter {
            provider_id: Some("prov-2".to_string()),
            ..ReportFilter::default()
        };
        assert!(!other.matches(&report(true)));
    }
}
