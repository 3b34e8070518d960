//! # Task Dispatcher
//!
//! Runs settlement tasks concurrently, grouped by callback key, and signals
//! once per group when every task in it has finished.
//!
//! ## Pool lifecycle
//!
//! The first [`TaskDispatcher::submit_task`] for a key opens a pool. Tasks
//! start immediately on the tokio runtime, bounded by a per-pool semaphore.
//! [`TaskDispatcher::close_task_pool`] removes the pool from the registry and
//! seals it, so the pool's task set is fixed at that point; a later submit
//! under the same key opens a fresh pool. A background continuation awaits the
//! sealed set, builds a [`PoolSummary`] and hands it to the completion notifier
//! exactly once. Closing a key with no open pool produces an empty summary
//! straight away.
//!
//! Pools are keyed by callback only. Jobs that share a callback URL and
//! overlap in time share a pool: the first close seals whatever both jobs
//! submitted so far, later submissions open a new pool, and the key is
//! notified once per pool.
//!
//! Task failures are isolated: errors, panics and timeouts are recorded in the
//! summary and never affect sibling tasks or the caller. A timeout never
//! cancels a task; the overrunning task is awaited to the end and then
//! recorded as [`FailureKind::TimedOut`].

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::join_all;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::DispatcherConfig;
use crate::error::{Result, RssError};
use crate::events::CompletionNotifier;
use crate::orchestration::types::{FailureKind, PoolSummary, TaskFailure};
use crate::settlement::SettlementTask;

type TaskOutcome = std::result::Result<(), (FailureKind, String)>;

struct RunningTask {
    label: String,
    handle: JoinHandle<TaskOutcome>,
}

#[derive(Default)]
struct PoolTasks {
    sealed: bool,
    running: Vec<RunningTask>,
}

struct TaskPool {
    opened_at: DateTime<Utc>,
    semaphore: Arc<Semaphore>,
    tasks: Mutex<PoolTasks>,
}

impl TaskPool {
    fn new(max_concurrent: usize) -> Self {
        Self {
            opened_at: Utc::now(),
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            tasks: Mutex::new(PoolTasks::default()),
        }
    }
}

/// Handle on the completion of a closed pool
pub struct PoolCompletion {
    callback_key: String,
    handle: JoinHandle<PoolSummary>,
}

impl PoolCompletion {
    pub fn callback_key(&self) -> &str {
        &self.callback_key
    }

    /// Wait for every task of the pool and the completion notification
    pub async fn wait(self) -> Result<PoolSummary> {
        self.handle.await.map_err(|e| RssError::TaskExecution {
            task: format!("pool {}", self.callback_key),
            message: e.to_string(),
        })
    }
}

pub struct TaskDispatcher {
    pools: DashMap<String, Arc<TaskPool>>,
    notifier: Arc<dyn CompletionNotifier>,
    config: DispatcherConfig,
}

impl TaskDispatcher {
    pub fn new(notifier: Arc<dyn CompletionNotifier>, config: DispatcherConfig) -> Self {
        Self {
            pools: DashMap::new(),
            notifier,
            config,
        }
    }

    /// Start `task` in the pool of `callback_key`, opening the pool if needed.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit_task(&self, task: Arc<dyn SettlementTask>, callback_key: &str) {
        let label = task.describe();

        loop {
            let pool = self
                .pools
                .entry(callback_key.to_string())
                .or_insert_with(|| Arc::new(TaskPool::new(self.config.max_concurrent_tasks_per_pool)))
                .clone();

            let mut tasks = pool.tasks.lock();
            if tasks.sealed {
                // Closed between lookup and lock; the next lookup opens a new pool
                continue;
            }

            let handle = tokio::spawn(run_task(
                task.clone(),
                pool.semaphore.clone(),
                self.config.task_timeout(),
            ));
            tasks.running.push(RunningTask {
                label: label.clone(),
                handle,
            });

            debug!(
                callback_key,
                task = %label,
                pool_size = tasks.running.len(),
                "Settlement task submitted"
            );
            return;
        }
    }

    /// Seal the pool of `callback_key` and notify once all its tasks finish
    pub fn close_task_pool(&self, callback_key: &str) -> PoolCompletion {
        let (opened_at, running) = match self.pools.remove(callback_key) {
            Some((_, pool)) => {
                let mut tasks = pool.tasks.lock();
                tasks.sealed = true;
                let running = std::mem::take(&mut tasks.running);
                (pool.opened_at, running)
            }
            None => (Utc::now(), Vec::new()),
        };

        info!(callback_key, tasks = running.len(), "Task pool closed");

        let notifier = self.notifier.clone();
        let key = callback_key.to_string();
        let handle = tokio::spawn(async move {
            let summary = collect_summary(key, opened_at, running).await;

            if let Err(e) = notifier.notify(&summary).await {
                error!(
                    callback_key = %summary.callback_key,
                    error = %e,
                    "Completion notification failed"
                );
            }
            summary
        });

        PoolCompletion {
            callback_key: callback_key.to_string(),
            handle,
        }
    }

    /// Callback keys with an open pool
    pub fn active_pools(&self) -> Vec<String> {
        self.pools.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Tasks of the open pool for `callback_key` that have not finished yet
    pub fn pending_tasks(&self, callback_key: &str) -> usize {
        self.pools
            .get(callback_key)
            .map(|pool| {
                let tasks = pool.tasks.lock();
                let pending = tasks
                    .running
                    .iter()
                    .filter(|t| !t.handle.is_finished())
                    .count();
                pending
            })
            .unwrap_or(0)
    }
}

async fn run_task(
    task: Arc<dyn SettlementTask>,
    semaphore: Arc<Semaphore>,
    timeout: Option<std::time::Duration>,
) -> TaskOutcome {
    let _permit = semaphore
        .acquire_owned()
        .await
        .map_err(|e| (FailureKind::Error, e.to_string()))?;

    let mut run = task.run();
    let Some(limit) = timeout else {
        return run.await.map_err(|e| (FailureKind::Error, e.to_string()));
    };

    // The limit is a watchdog: the task keeps running to its own settle or
    // fail bookkeeping, it is only reported as overrunning.
    match tokio::time::timeout(limit, &mut run).await {
        Ok(result) => result.map_err(|e| (FailureKind::Error, e.to_string())),
        Err(_) => {
            warn!(
                task = %task.describe(),
                limit_seconds = limit.as_secs(),
                "Settlement task exceeded its time limit; waiting for it to finish"
            );
            let outcome = match run.await {
                Ok(()) => "finished".to_string(),
                Err(e) => format!("failed: {e}"),
            };
            Err((
                FailureKind::TimedOut,
                format!("exceeded {}s, then {outcome}", limit.as_secs()),
            ))
        }
    }
}

async fn collect_summary(
    callback_key: String,
    opened_at: DateTime<Utc>,
    running: Vec<RunningTask>,
) -> PoolSummary {
    let submitted = running.len();
    let (labels, handles): (Vec<_>, Vec<_>) = running
        .into_iter()
        .map(|t| (t.label, t.handle))
        .unzip();

    let mut succeeded = 0;
    let mut failures = Vec::new();

    for (label, joined) in labels.into_iter().zip(join_all(handles).await) {
        let failure = match joined {
            Ok(Ok(())) => {
                succeeded += 1;
                continue;
            }
            Ok(Err((kind, error))) => TaskFailure {
                task: label,
                kind,
                error,
            },
            Err(join_error) => TaskFailure {
                task: label,
                kind: FailureKind::Panicked,
                error: join_error.to_string(),
            },
        };

        warn!(
            callback_key = %callback_key,
            task = %failure.task,
            kind = ?failure.kind,
            error = %failure.error,
            "Settlement task did not succeed"
        );
        failures.push(failure);
    }

    PoolSummary {
        callback_key,
        submitted,
        succeeded,
        failures,
        opened_at,
        completed_at: Utc::now(),
    }
}
