//! # In-Memory Store
//!
//! Process-local implementation of every data-access trait. Writes are visible
//! immediately; `flush` is recorded in an audit log so callers can assert the
//! ordering of state changes, flushes and report writes.
//!
//! Failure injection ([`FailPoint`]) lets tests exercise data-access failures
//! at precise points of a settlement run.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};

use super::{
    CurrencyDirectory, ModelDirectory, Pagination, ReportFilter, ReportStore, TransactionStore,
};
use crate::error::{Result, RssError};
use crate::models::{
    Aggregator, Currency, NewSharingReport, Provider, ReportId, RssModel, SharingReport,
    StakeholderAllocation, Transaction,
};
use crate::state_machine::TransactionState;

/// Audit entry recorded by the in-memory store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    TransactionUpdated { tx_id: i64, state: TransactionState },
    Flushed,
    ReportCreated { report_id: ReportId },
    AllocationCreated { report_id: ReportId, stakeholder_id: String },
    ReportPaid { report_id: ReportId, paid: bool },
}

/// Operation that should fail on demand
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailPoint {
    /// `find_pending` succeeds this many times, then fails
    FindPendingAfter(usize),
    CreateReport,
    SetPaid,
    QueryReports,
}

#[derive(Default)]
struct StoreState {
    aggregators: Vec<Aggregator>,
    providers: Vec<Provider>,
    models: Vec<RssModel>,
    currencies: HashMap<String, Currency>,
    transactions: BTreeMap<i64, Transaction>,
    reports: BTreeMap<ReportId, SharingReport>,
    next_report_id: i64,
    events: Vec<StoreEvent>,
    fail_points: HashSet<FailPoint>,
    find_pending_calls: usize,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_aggregator(&self, aggregator: Aggregator) -> &Self {
        self.state.lock().aggregators.push(aggregator);
        self
    }

    pub fn add_provider(&self, provider: Provider) -> &Self {
        self.state.lock().providers.push(provider);
        self
    }

    /// Register a model, replacing any model with the same triple
    pub fn add_model(&self, model: RssModel) -> &Self {
        let mut state = self.state.lock();
        state.models.retain(|m| {
            !m.matches(
                &model.aggregator_id,
                &model.owner_provider_id,
                &model.product_class,
            )
        });
        state.models.push(model);
        self
    }

    pub fn add_currency(&self, currency: Currency) -> &Self {
        self.state
            .lock()
            .currencies
            .insert(currency.iso_code.clone(), currency);
        self
    }

    pub fn insert_transaction(&self, transaction: Transaction) -> &Self {
        self.state
            .lock()
            .transactions
            .insert(transaction.tx_id, transaction);
        self
    }

    pub fn inject_failure(&self, point: FailPoint) {
        self.state.lock().fail_points.insert(point);
    }

    pub fn transaction(&self, tx_id: i64) -> Option<Transaction> {
        self.state.lock().transactions.get(&tx_id).cloned()
    }

    pub fn transactions_in_state(&self, state: TransactionState) -> Vec<Transaction> {
        self.state
            .lock()
            .transactions
            .values()
            .filter(|tx| tx.state == state)
            .cloned()
            .collect()
    }

    pub fn reports(&self) -> Vec<SharingReport> {
        self.state.lock().reports.values().cloned().collect()
    }

    pub fn events(&self) -> Vec<StoreEvent> {
        self.state.lock().events.clone()
    }

    pub fn flush_count(&self) -> usize {
        self.state
            .lock()
            .events
            .iter()
            .filter(|e| matches!(e, StoreEvent::Flushed))
            .count()
    }
}

#[async_trait]
impl ModelDirectory for InMemoryStore {
    async fn list_aggregators(&self) -> Result<Vec<Aggregator>> {
        Ok(self.state.lock().aggregators.clone())
    }

    async fn get_aggregator(&self, aggregator_id: &str) -> Result<Option<Aggregator>> {
        Ok(self
            .state
            .lock()
            .aggregators
            .iter()
            .find(|a| a.aggregator_id == aggregator_id)
            .cloned())
    }

    async fn list_providers(&self, aggregator_id: &str) -> Result<Vec<Provider>> {
        Ok(self
            .state
            .lock()
            .providers
            .iter()
            .filter(|p| p.belongs_to(aggregator_id))
            .cloned()
            .collect())
    }

    async fn get_provider(
        &self,
        aggregator_id: &str,
        provider_id: &str,
    ) -> Result<Option<Provider>> {
        Ok(self
            .state
            .lock()
            .providers
            .iter()
            .find(|p| p.belongs_to(aggregator_id) && p.provider_id == provider_id)
            .cloned())
    }

    async fn list_models(
        &self,
        aggregator_id: &str,
        provider_id: &str,
        product_class: Option<&str>,
    ) -> Result<Vec<RssModel>> {
        let product_class = product_class.filter(|pc| !pc.is_empty());
        Ok(self
            .state
            .lock()
            .models
            .iter()
            .filter(|m| m.aggregator_id == aggregator_id && m.owner_provider_id == provider_id)
            .filter(|m| product_class.map_or(true, |pc| m.product_class == pc))
            .cloned()
            .collect())
    }

    async fn model_exists(
        &self,
        aggregator_id: &str,
        provider_id: &str,
        product_class: &str,
    ) -> Result<bool> {
        Ok(self
            .state
            .lock()
            .models
            .iter()
            .any(|m| m.matches(aggregator_id, provider_id, product_class)))
    }
}

#[async_trait]
impl TransactionStore for InMemoryStore {
    async fn find_pending(
        &self,
        aggregator_id: &str,
        provider_id: &str,
        product_class: &str,
    ) -> Result<Vec<Transaction>> {
        let mut state = self.state.lock();
        let calls = state.find_pending_calls;
        state.find_pending_calls += 1;

        let should_fail = state.fail_points.iter().any(|point| match point {
            FailPoint::FindPendingAfter(after) => calls >= *after,
            _ => false,
        });
        if should_fail {
            return Err(RssError::database(
                "find_pending",
                "injected transaction store failure",
            ));
        }

        Ok(state
            .transactions
            .values()
            .filter(|tx| tx.state.is_claimable())
            .filter(|tx| {
                tx.aggregator_id == aggregator_id
                    && tx.provider_id == provider_id
                    && tx.product_class == product_class
            })
            .cloned()
            .collect())
    }

    async fn update(&self, transaction: &Transaction) -> Result<()> {
        let mut state = self.state.lock();
        let stored = state
            .transactions
            .get_mut(&transaction.tx_id)
            .ok_or_else(|| RssError::NotFound {
                entity: "transaction",
                id: transaction.tx_id.to_string(),
            })?;
        *stored = transaction.clone();
        state.events.push(StoreEvent::TransactionUpdated {
            tx_id: transaction.tx_id,
            state: transaction.state,
        });
        Ok(())
    }

    async fn update_if_state(
        &self,
        transaction: &Transaction,
        expected: TransactionState,
    ) -> Result<bool> {
        let mut state = self.state.lock();
        let Some(stored) = state.transactions.get_mut(&transaction.tx_id) else {
            return Ok(false);
        };
        if stored.state != expected {
            return Ok(false);
        }
        *stored = transaction.clone();
        state.events.push(StoreEvent::TransactionUpdated {
            tx_id: transaction.tx_id,
            state: transaction.state,
        });
        Ok(true)
    }

    async fn flush(&self) -> Result<()> {
        self.state.lock().events.push(StoreEvent::Flushed);
        Ok(())
    }
}

#[async_trait]
impl ReportStore for InMemoryStore {
    async fn create(&self, report: NewSharingReport) -> Result<SharingReport> {
        let mut state = self.state.lock();
        if state.fail_points.contains(&FailPoint::CreateReport) {
            return Err(RssError::database(
                "create_report",
                "injected report store failure",
            ));
        }

        state.next_report_id += 1;
        let id = ReportId::new(state.next_report_id);
        let persisted = SharingReport::persisted(id, report);
        state.reports.insert(id, persisted.clone());
        state.events.push(StoreEvent::ReportCreated { report_id: id });
        Ok(persisted)
    }

    async fn create_allocation(&self, allocation: &StakeholderAllocation) -> Result<()> {
        let mut state = self.state.lock();
        let report_id = allocation.report_id();
        let report = state.reports.get_mut(&report_id).ok_or_else(|| {
            RssError::database(
                "create_allocation",
                format!("report {report_id} does not exist"),
            )
        })?;

        if report.stakeholders.iter().any(|a| a.key() == allocation.key()) {
            return Err(RssError::database(
                "create_allocation",
                format!(
                    "duplicate allocation for stakeholder {} on report {report_id}",
                    allocation.stakeholder.provider_id
                ),
            ));
        }

        report.stakeholders.push(allocation.clone());
        state.events.push(StoreEvent::AllocationCreated {
            report_id,
            stakeholder_id: allocation.stakeholder.provider_id.clone(),
        });
        Ok(())
    }

    async fn get_by_id(&self, id: ReportId) -> Result<Option<SharingReport>> {
        Ok(self.state.lock().reports.get(&id).cloned())
    }

    async fn set_paid(&self, id: ReportId, paid: bool) -> Result<bool> {
        let mut state = self.state.lock();
        if state.fail_points.contains(&FailPoint::SetPaid) {
            return Err(RssError::database("set_paid", "injected report store failure"));
        }

        let Some(report) = state.reports.get_mut(&id) else {
            return Ok(false);
        };
        report.paid = paid;
        state.events.push(StoreEvent::ReportPaid {
            report_id: id,
            paid,
        });
        Ok(true)
    }

    async fn query(
        &self,
        filter: &ReportFilter,
        pagination: Pagination,
    ) -> Result<Option<Vec<SharingReport>>> {
        let state = self.state.lock();
        if state.fail_points.contains(&FailPoint::QueryReports) {
            return Err(RssError::database(
                "query_reports",
                "injected report store failure",
            ));
        }

        let matching = state
            .reports
            .values()
            .filter(|report| filter.matches(report))
            .cloned();
        Ok(Some(pagination.apply(matching)))
    }
}

#[async_trait]
impl CurrencyDirectory for InMemoryStore {
    async fn get_by_iso_code(&self, iso_code: &str) -> Result<Option<Currency>> {
        Ok(self.state.lock().currencies.get(iso_code).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionType;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn pending_tx(tx_id: i64) -> Transaction {
        Transaction {
            tx_id,
            aggregator_id: "agg@example.com".to_string(),
            provider_id: "prov-1".to_string(),
            product_class: "music".to_string(),
            transaction_type: TransactionType::Charge,
            charged_amount: dec!(5),
            currency: "EUR".to_string(),
            state: TransactionState::Pending,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_conditional_update_rejects_stale_state() {
        let store = InMemoryStore::new();
        store.insert_transaction(pending_tx(1));

        let mut claimed = pending_tx(1);
        claimed.state = TransactionState::Processing;

        assert!(store
            .update_if_state(&claimed, TransactionState::Pending)
            .await
            .unwrap());
        assert!(!store
            .update_if_state(&claimed, TransactionState::Pending)
            .await
            .unwrap());
        assert!(store
            .find_pending("agg@example.com", "prov-1", "music")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_find_pending_failure_injection() {
        let store = InMemoryStore::new();
        store.inject_failure(FailPoint::FindPendingAfter(1));

        assert!(store.find_pending("a", "p", "c").await.is_ok());
        assert!(store.find_pending("a", "p", "c").await.is_err());
    }

    #[tokio::test]
    async fn test_allocation_requires_existing_report() {
        let store = InMemoryStore::new();
        let orphan = SharingReport::persisted(
            ReportId::new(99),
            NewSharingReport {
                algorithm_type: "FIXED_PERCENTAGE".to_string(),
                product_class: "music".to_string(),
                generated_at: Utc::now(),
                aggregator_value: dec!(0),
                owner_value: dec!(0),
                owner: Provider::new("agg@example.com", "prov-1", "Provider"),
                currency: Currency::new("EUR", "Euro", 2),
                paid: false,
            },
        );
        let allocation = StakeholderAllocation::for_report(
            &orphan,
            Provider::new("agg@example.com", "st-1", "Stakeholder"),
            dec!(1),
        );

        assert!(store.create_allocation(&allocation).await.is_err());
    }
}
