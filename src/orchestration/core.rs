//! # Settlement Core
//!
//! Single bootstrap path for the settlement engine. Every entry point builds a
//! [`SettlementCore`], either from the environment-aware configuration (which
//! connects to PostgreSQL) or from an explicit [`DataLayer`].
//!
//! The core exposes the public operations of the engine:
//!
//! - `run_settlement` for settlement jobs
//! - `set_tx_state` and `generate_report` for direct bookkeeping
//! - `get_sharing_reports` and `set_pay_report` for reporting

use std::sync::Arc;
use tracing::info;

use crate::config::RssConfig;
#[cfg(feature = "postgres")]
use crate::config::ConfigManager;
use crate::database::{CurrencyDirectory, ModelDirectory, ReportFilter, ReportStore, TransactionStore};
use crate::error::Result;
use crate::events::CompletionNotifier;
use crate::models::{ReportId, RssModel, RssReport, SettlementJob, SharingReport, Transaction};
use crate::orchestration::scope_resolver::ScopeResolver;
use crate::orchestration::settlement_orchestrator::{DispatchStats, SettlementOrchestrator};
use crate::orchestration::task_dispatcher::TaskDispatcher;
use crate::orchestration::transaction_state::TransactionStateTracker;
use crate::reporting::{PaymentFlagUpdater, PaymentUpdate, ReportBuilder, ReportQueryService};
use crate::settlement::{AllocationCalculator, AllocationResult, ProductSettlementTaskFactory};
use crate::state_machine::TransactionState;

/// The storage seams the engine runs against
#[derive(Clone)]
pub struct DataLayer {
    pub directory: Arc<dyn ModelDirectory>,
    pub transactions: Arc<dyn TransactionStore>,
    pub reports: Arc<dyn ReportStore>,
    pub currencies: Arc<dyn CurrencyDirectory>,
}

impl DataLayer {
    /// Use one store for every seam
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: ModelDirectory + TransactionStore + ReportStore + CurrencyDirectory + 'static,
    {
        Self {
            directory: store.clone(),
            transactions: store.clone(),
            reports: store.clone(),
            currencies: store,
        }
    }
}

pub struct SettlementCore {
    orchestrator: SettlementOrchestrator,
    tracker: Arc<TransactionStateTracker>,
    report_builder: Arc<ReportBuilder>,
    queries: ReportQueryService,
    payments: PaymentFlagUpdater,
}

impl SettlementCore {
    /// Bootstrap from the environment-aware configuration and PostgreSQL
    #[cfg(feature = "postgres")]
    pub async fn new(
        calculator: Arc<dyn AllocationCalculator>,
        notifier: Arc<dyn CompletionNotifier>,
    ) -> Result<Self> {
        let config_manager = ConfigManager::load()?;
        Self::from_config(config_manager, calculator, notifier).await
    }

    #[cfg(feature = "postgres")]
    pub async fn from_config(
        config_manager: Arc<ConfigManager>,
        calculator: Arc<dyn AllocationCalculator>,
        notifier: Arc<dyn CompletionNotifier>,
    ) -> Result<Self> {
        let config = config_manager.config();
        crate::logging::init_structured_logging(&config.logging);
        info!(
            environment = config_manager.environment(),
            "Initializing SettlementCore from configuration"
        );

        let connection = crate::database::DatabaseConnection::new(&config.database).await?;
        let store = Arc::new(crate::database::PgStore::new(connection.pool().clone()));

        Ok(Self::with_data_layer(
            config,
            DataLayer::from_store(store),
            calculator,
            notifier,
        ))
    }

    /// Wire the engine over an explicit data layer
    pub fn with_data_layer(
        config: &RssConfig,
        data: DataLayer,
        calculator: Arc<dyn AllocationCalculator>,
        notifier: Arc<dyn CompletionNotifier>,
    ) -> Self {
        let tracker = Arc::new(TransactionStateTracker::new(data.transactions.clone()));
        let report_builder = Arc::new(ReportBuilder::new(
            data.directory.clone(),
            data.currencies.clone(),
            data.reports.clone(),
        ));
        let dispatcher = Arc::new(TaskDispatcher::new(notifier, config.dispatcher.clone()));
        let task_factory = Arc::new(ProductSettlementTaskFactory::new(
            calculator,
            report_builder.clone(),
            tracker.clone(),
        ));

        let orchestrator = SettlementOrchestrator::new(
            ScopeResolver::new(data.directory.clone()),
            tracker.clone(),
            dispatcher,
            task_factory,
        );

        info!(
            max_concurrent_tasks_per_pool = config.dispatcher.max_concurrent_tasks_per_pool,
            "SettlementCore ready"
        );

        Self {
            orchestrator,
            tracker,
            report_builder,
            queries: ReportQueryService::new(data.reports.clone(), config.reports.clone()),
            payments: PaymentFlagUpdater::new(data.reports),
        }
    }

    pub fn dispatcher(&self) -> &Arc<TaskDispatcher> {
        self.orchestrator.dispatcher()
    }

    pub async fn run_settlement(&self, job: &SettlementJob) -> Result<DispatchStats> {
        self.orchestrator.run_settlement(job).await
    }

    pub async fn set_tx_state(
        &self,
        transactions: &mut [Transaction],
        state: TransactionState,
        flush: bool,
    ) -> Result<()> {
        self.tracker.set_tx_state(transactions, state, flush).await
    }

    pub async fn generate_report(
        &self,
        model: &RssModel,
        currency_code: &str,
        result: &AllocationResult,
    ) -> Result<SharingReport> {
        self.report_builder
            .generate_report(model, currency_code, result)
            .await
    }

    pub async fn get_sharing_reports(
        &self,
        filter: &ReportFilter,
        offset: u32,
        size: u32,
    ) -> Result<Vec<RssReport>> {
        self.queries.get_sharing_reports(filter, offset, size).await
    }

    pub async fn set_pay_report(&self, id: ReportId, paid: bool) -> PaymentUpdate {
        self.payments.set_pay_report(id, paid).await
    }
}
