//! Engine wiring and scripted settlement tasks for integration tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Notify};

use rss_core::config::{DispatcherConfig, RssConfig};
use rss_core::database::{InMemoryStore, Pagination, ReportFilter, ReportStore, StoreEvent};
use rss_core::events::CompletionPublisher;
use rss_core::models::{
    NewSharingReport, ReportId, RssModel, SharingReport, StakeholderAllocation, Transaction,
};
use rss_core::orchestration::{
    DataLayer, PoolSummary, ScopeResolver, SettlementCore, SettlementOrchestrator, TaskDispatcher,
    TransactionStateTracker,
};
use rss_core::reporting::ReportBuilder;
use rss_core::settlement::{
    FixedPercentageCalculator, ProductSettlementTaskFactory, SettlementTask, SettlementTaskFactory,
};
use rss_core::state_machine::TransactionState;
use rss_core::Result;

const COMPLETION_TIMEOUT: Duration = Duration::from_secs(5);

/// A fully wired engine over an in-memory store
pub struct TestEngine {
    pub store: Arc<InMemoryStore>,
    pub core: SettlementCore,
    pub completions: CompletionPublisher,
}

impl TestEngine {
    pub fn new(store: Arc<InMemoryStore>) -> Self {
        Self::with_config(store, RssConfig::default())
    }

    pub fn with_config(store: Arc<InMemoryStore>, config: RssConfig) -> Self {
        let data = DataLayer::from_store(store.clone());
        Self::with_data_layer(store, data, config)
    }

    /// Engine over `data`; `store` is kept for assertions
    pub fn with_data_layer(store: Arc<InMemoryStore>, data: DataLayer, config: RssConfig) -> Self {
        let completions = CompletionPublisher::default();
        let core = SettlementCore::with_data_layer(
            &config,
            data,
            Arc::new(FixedPercentageCalculator),
            Arc::new(completions.clone()),
        );
        Self {
            store,
            core,
            completions,
        }
    }
}

/// Next completion signal, failing the test if none arrives in time
pub async fn next_summary(rx: &mut broadcast::Receiver<PoolSummary>) -> PoolSummary {
    tokio::time::timeout(COMPLETION_TIMEOUT, rx.recv())
        .await
        .expect("no completion signal within timeout")
        .expect("completion channel closed")
}

/// Collect one completion signal per key, in any order
pub async fn summaries_for(
    rx: &mut broadcast::Receiver<PoolSummary>,
    keys: &[&str],
) -> HashMap<String, PoolSummary> {
    let mut summaries = HashMap::new();
    while summaries.len() < keys.len() {
        let summary = next_summary(rx).await;
        assert!(
            keys.contains(&summary.callback_key.as_str()),
            "unexpected callback key {}",
            summary.callback_key
        );
        assert!(
            summaries
                .insert(summary.callback_key.clone(), summary)
                .is_none(),
            "callback key notified twice"
        );
    }
    summaries
}

/// Orchestrator over `store` with a caller-supplied task factory
pub fn orchestrator(
    store: &Arc<InMemoryStore>,
    task_factory: Arc<dyn SettlementTaskFactory>,
    completions: &CompletionPublisher,
) -> SettlementOrchestrator {
    SettlementOrchestrator::new(
        ScopeResolver::new(store.clone()),
        Arc::new(TransactionStateTracker::new(store.clone())),
        Arc::new(TaskDispatcher::new(
            Arc::new(completions.clone()),
            DispatcherConfig::default(),
        )),
        task_factory,
    )
}

/// The production task factory over `store`
pub fn product_factory(store: &Arc<InMemoryStore>) -> Arc<dyn SettlementTaskFactory> {
    Arc::new(ProductSettlementTaskFactory::new(
        Arc::new(FixedPercentageCalculator),
        Arc::new(ReportBuilder::new(store.clone(), store.clone(), store.clone())),
        Arc::new(TransactionStateTracker::new(store.clone())),
    ))
}

/// What a recording task saw in the store when it started running
#[derive(Debug, Clone)]
pub struct Observation {
    pub scope: String,
    pub tx_ids: Vec<i64>,
    pub stored_states: Vec<TransactionState>,
    pub flushed_before_run: bool,
}

/// Factory whose tasks only record the store state they start with
pub struct RecordingTaskFactory {
    store: Arc<InMemoryStore>,
    pub observations: Arc<Mutex<Vec<Observation>>>,
}

impl RecordingTaskFactory {
    pub fn new(store: Arc<InMemoryStore>) -> Arc<Self> {
        Arc::new(Self {
            store,
            observations: Arc::new(Mutex::new(Vec::new())),
        })
    }
}

struct RecordingTask {
    store: Arc<InMemoryStore>,
    model: RssModel,
    transactions: Vec<Transaction>,
    observations: Arc<Mutex<Vec<Observation>>>,
}

#[async_trait]
impl SettlementTask for RecordingTask {
    fn describe(&self) -> String {
        self.model.scope_label()
    }

    async fn run(&self) -> Result<()> {
        let events = self.store.events();
        let last_claim = events.iter().rposition(|e| {
            matches!(e, StoreEvent::TransactionUpdated { tx_id, .. }
                if self.transactions.iter().any(|tx| tx.tx_id == *tx_id))
        });
        let flushed_before_run = last_claim.is_some_and(|idx| {
            events[idx..]
                .iter()
                .any(|e| matches!(e, StoreEvent::Flushed))
        });

        self.observations.lock().push(Observation {
            scope: self.model.scope_label(),
            tx_ids: self.transactions.iter().map(|tx| tx.tx_id).collect(),
            stored_states: self
                .transactions
                .iter()
                .filter_map(|tx| self.store.transaction(tx.tx_id))
                .map(|tx| tx.state)
                .collect(),
            flushed_before_run,
        });
        Ok(())
    }
}

impl SettlementTaskFactory for RecordingTaskFactory {
    fn create_task(
        &self,
        model: RssModel,
        transactions: Vec<Transaction>,
        _callback_url: &str,
    ) -> Arc<dyn SettlementTask> {
        Arc::new(RecordingTask {
            store: self.store.clone(),
            model,
            transactions,
            observations: self.observations.clone(),
        })
    }
}

/// Wraps another factory so its tasks wait for the gate before running
pub struct GatedTaskFactory {
    inner: Arc<dyn SettlementTaskFactory>,
    only_callback: Option<String>,
    pub gate: Arc<Notify>,
}

impl GatedTaskFactory {
    /// Gate every task
    pub fn new(inner: Arc<dyn SettlementTaskFactory>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            only_callback: None,
            gate: Arc::new(Notify::new()),
        })
    }

    /// Gate only the tasks dispatched for `callback_url`
    pub fn for_callback(inner: Arc<dyn SettlementTaskFactory>, callback_url: &str) -> Arc<Self> {
        Arc::new(Self {
            inner,
            only_callback: Some(callback_url.to_string()),
            gate: Arc::new(Notify::new()),
        })
    }
}

struct GatedTask {
    inner: Arc<dyn SettlementTask>,
    gate: Arc<Notify>,
}

#[async_trait]
impl SettlementTask for GatedTask {
    fn describe(&self) -> String {
        self.inner.describe()
    }

    async fn run(&self) -> Result<()> {
        self.gate.notified().await;
        self.inner.run().await
    }
}

impl SettlementTaskFactory for GatedTaskFactory {
    fn create_task(
        &self,
        model: RssModel,
        transactions: Vec<Transaction>,
        callback_url: &str,
    ) -> Arc<dyn SettlementTask> {
        let inner = self.inner.create_task(model, transactions, callback_url);
        match &self.only_callback {
            Some(only) if only != callback_url => inner,
            _ => Arc::new(GatedTask {
                inner,
                gate: self.gate.clone(),
            }),
        }
    }
}

/// Report store that takes `delay` to persist each stakeholder allocation
pub struct SlowAllocationStore {
    inner: Arc<InMemoryStore>,
    delay: Duration,
}

impl SlowAllocationStore {
    pub fn new(inner: Arc<InMemoryStore>, delay: Duration) -> Arc<Self> {
        Arc::new(Self { inner, delay })
    }
}

#[async_trait]
impl ReportStore for SlowAllocationStore {
    async fn create(&self, report: NewSharingReport) -> Result<SharingReport> {
        self.inner.create(report).await
    }

    async fn create_allocation(&self, allocation: &StakeholderAllocation) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.create_allocation(allocation).await
    }

    async fn get_by_id(&self, id: ReportId) -> Result<Option<SharingReport>> {
        self.inner.get_by_id(id).await
    }

    async fn set_paid(&self, id: ReportId, paid: bool) -> Result<bool> {
        self.inner.set_paid(id, paid).await
    }

    async fn query(
        &self,
        filter: &ReportFilter,
        pagination: Pagination,
    ) -> Result<Option<Vec<SharingReport>>> {
        self.inner.query(filter, pagination).await
    }
}
