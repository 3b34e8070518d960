//! # Settlement Orchestrator
//!
//! Runs one settlement job: resolve the scope, then for every model claim its
//! pending transactions and dispatch a settlement task under the job's
//! callback key, then close the callback pool.
//!
//! The dispatch phase is a unit of work. If it fails, every transaction it
//! claimed is released back to `pending` and the error is returned. Tasks
//! submitted before the failure are not cancelled; their pool is still closed
//! so the callback fires once they finish.

use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use crate::error::Result;
use crate::models::SettlementJob;
use crate::orchestration::scope_resolver::{ResolvedScope, ScopeResolver};
use crate::orchestration::task_dispatcher::TaskDispatcher;
use crate::orchestration::transaction_state::{ClaimJournal, TransactionStateTracker};
use crate::settlement::SettlementTaskFactory;

/// Counters for the dispatch phase of one job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub models_resolved: usize,
    pub transactions_claimed: usize,
    pub tasks_submitted: usize,
}

pub struct SettlementOrchestrator {
    resolver: ScopeResolver,
    tracker: Arc<TransactionStateTracker>,
    dispatcher: Arc<TaskDispatcher>,
    task_factory: Arc<dyn SettlementTaskFactory>,
}

impl SettlementOrchestrator {
    pub fn new(
        resolver: ScopeResolver,
        tracker: Arc<TransactionStateTracker>,
        dispatcher: Arc<TaskDispatcher>,
        task_factory: Arc<dyn SettlementTaskFactory>,
    ) -> Self {
        Self {
            resolver,
            tracker,
            dispatcher,
            task_factory,
        }
    }

    pub fn dispatcher(&self) -> &Arc<TaskDispatcher> {
        &self.dispatcher
    }

    /// Validate `job`, claim its pending transactions and dispatch settlement
    /// tasks.
    ///
    /// Returns once every task is submitted and the callback pool is closed.
    /// Settlement itself completes asynchronously; the callback key's
    /// completion notification is the only completion signal.
    #[instrument(skip(self, job), fields(job_id = %job.job_id, callback_key = %job.callback_key()))]
    pub async fn run_settlement(&self, job: &SettlementJob) -> Result<DispatchStats> {
        job.validate()?;

        info!(
            aggregator_id = ?job.aggregator_id(),
            provider_id = ?job.provider_id(),
            product_class = ?job.product_class(),
            "Starting settlement job"
        );

        let scopes = self.resolver.resolve(job).await?;

        let mut journal = ClaimJournal::default();
        let mut stats = DispatchStats {
            models_resolved: scopes.len(),
            ..DispatchStats::default()
        };

        match self.dispatch(job, &scopes, &mut journal, &mut stats).await {
            Ok(()) => {
                self.dispatcher.close_task_pool(job.callback_key());
                info!(
                    models = stats.models_resolved,
                    transactions = stats.transactions_claimed,
                    tasks = stats.tasks_submitted,
                    "Settlement job dispatched"
                );
                Ok(stats)
            }
            Err(e) => {
                error!(
                    error = %e,
                    tasks_submitted = stats.tasks_submitted,
                    "Settlement job failed; releasing claimed transactions"
                );

                if !journal.is_empty() {
                    match self.tracker.release(journal).await {
                        Ok(released) => debug!(released, "Claims released"),
                        Err(release_error) => {
                            error!(error = %release_error, "Could not release claimed transactions")
                        }
                    }
                }

                if stats.tasks_submitted > 0 {
                    self.dispatcher.close_task_pool(job.callback_key());
                }
                Err(e)
            }
        }
    }

    async fn dispatch(
        &self,
        job: &SettlementJob,
        scopes: &[ResolvedScope],
        journal: &mut ClaimJournal,
        stats: &mut DispatchStats,
    ) -> Result<()> {
        for scope in scopes {
            let pending = self.tracker.find_pending(&scope.model).await?;
            if pending.is_empty() {
                debug!(scope = %scope.model.scope_label(), "No pending transactions");
                continue;
            }

            let claimed = self.tracker.claim(pending, journal).await?;
            if claimed.is_empty() {
                debug!(
                    scope = %scope.model.scope_label(),
                    "Pending transactions were claimed by another job"
                );
                continue;
            }

            stats.transactions_claimed += claimed.len();
            let task = self
                .task_factory
                .create_task(scope.model.clone(), claimed, &job.callback_url);
            self.dispatcher.submit_task(task, job.callback_key());
            stats.tasks_submitted += 1;
        }

        Ok(())
    }
}
