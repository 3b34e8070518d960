//! # Settlement Tasks
//!
//! A settlement task is the unit of asynchronous work the orchestrator hands to
//! the dispatcher: one resolved model plus the transactions claimed for it.
//!
//! [`ProductSettlementTask`] settles its batch one currency at a time. Each
//! currency group gets its own allocation and report; the group's transactions
//! are then moved to `settled`. Groups that could not be reported are moved to
//! `failed` and the task returns an error so the pool summary records it.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use crate::error::{Result, RssError};
use crate::models::{RssModel, Transaction};
use crate::orchestration::transaction_state::TransactionStateTracker;
use crate::reporting::ReportBuilder;
use crate::settlement::allocation::AllocationCalculator;
use crate::state_machine::TransactionEvent;

/// Unit of work submitted to the task dispatcher
#[async_trait]
pub trait SettlementTask: Send + Sync {
    /// Short label used in logs and pool summaries
    fn describe(&self) -> String;

    async fn run(&self) -> Result<()>;
}

/// Builds the settlement task for one claimed batch
pub trait SettlementTaskFactory: Send + Sync {
    fn create_task(
        &self,
        model: RssModel,
        transactions: Vec<Transaction>,
        callback_url: &str,
    ) -> Arc<dyn SettlementTask>;
}

pub struct ProductSettlementTask {
    model: RssModel,
    transactions: Vec<Transaction>,
    callback_url: String,
    calculator: Arc<dyn AllocationCalculator>,
    report_builder: Arc<ReportBuilder>,
    tracker: Arc<TransactionStateTracker>,
}

impl ProductSettlementTask {
    pub fn new(
        model: RssModel,
        transactions: Vec<Transaction>,
        callback_url: impl Into<String>,
        calculator: Arc<dyn AllocationCalculator>,
        report_builder: Arc<ReportBuilder>,
        tracker: Arc<TransactionStateTracker>,
    ) -> Self {
        Self {
            model,
            transactions,
            callback_url: callback_url.into(),
            calculator,
            report_builder,
            tracker,
        }
    }

    pub fn model(&self) -> &RssModel {
        &self.model
    }

    /// Batch split by currency, in currency code order
    fn by_currency(&self) -> BTreeMap<&str, Vec<Transaction>> {
        let mut groups: BTreeMap<&str, Vec<Transaction>> = BTreeMap::new();
        for tx in &self.transactions {
            groups.entry(tx.currency.as_str()).or_default().push(tx.clone());
        }
        groups
    }

    async fn settle_currency(&self, currency: &str, transactions: &[Transaction]) -> Result<()> {
        let currency = self.report_builder.currency(currency).await?;
        let allocation = self
            .calculator
            .calculate(&self.model, &currency, transactions)?;
        let report = self
            .report_builder
            .generate_report(&self.model, &currency.iso_code, &allocation)
            .await?;

        debug!(
            report_id = %report.id,
            currency = %currency.iso_code,
            transactions = transactions.len(),
            "Currency group reported"
        );
        Ok(())
    }
}

#[async_trait]
impl SettlementTask for ProductSettlementTask {
    fn describe(&self) -> String {
        self.model.scope_label()
    }

    #[instrument(skip(self), fields(scope = %self.model.scope_label(), callback_key = %self.callback_url))]
    async fn run(&self) -> Result<()> {
        let mut failures = Vec::new();

        for (currency, mut transactions) in self.by_currency() {
            match self.settle_currency(currency, &transactions).await {
                Ok(()) => {
                    if let Err(e) = self
                        .tracker
                        .apply_event(&mut transactions, TransactionEvent::Settle, true)
                        .await
                    {
                        // Reported but not marked settled
                        error!(currency, error = %e, "Could not mark transactions settled");
                        failures.push(format!("{currency}: {e}"));
                    }
                }
                Err(e) => {
                    error!(currency, error = %e, "Settlement failed for currency group");
                    if let Err(mark) = self
                        .tracker
                        .apply_event(&mut transactions, TransactionEvent::Fail, true)
                        .await
                    {
                        error!(currency, error = %mark, "Could not mark transactions failed");
                    }
                    failures.push(format!("{currency}: {e}"));
                }
            }
        }

        if failures.is_empty() {
            info!(
                transactions = self.transactions.len(),
                "Settlement task completed"
            );
            Ok(())
        } else {
            Err(RssError::TaskExecution {
                task: self.describe(),
                message: failures.join("; "),
            })
        }
    }
}

/// Creates [`ProductSettlementTask`]s sharing one calculator, report builder
/// and state tracker
pub struct ProductSettlementTaskFactory {
    calculator: Arc<dyn AllocationCalculator>,
    report_builder: Arc<ReportBuilder>,
    tracker: Arc<TransactionStateTracker>,
}

impl ProductSettlementTaskFactory {
    pub fn new(
        calculator: Arc<dyn AllocationCalculator>,
        report_builder: Arc<ReportBuilder>,
        tracker: Arc<TransactionStateTracker>,
    ) -> Self {
        Self {
            calculator,
            report_builder,
            tracker,
        }
    }
}

impl SettlementTaskFactory for ProductSettlementTaskFactory {
    fn create_task(
        &self,
        model: RssModel,
        transactions: Vec<Transaction>,
        callback_url: &str,
    ) -> Arc<dyn SettlementTask> {
        Arc::new(ProductSettlementTask::new(
            model,
            transactions,
            callback_url,
            self.calculator.clone(),
            self.report_builder.clone(),
            self.tracker.clone(),
        ))
    }
}
