//! # Settlement Orchestration
//!
//! Turns a settlement job into concurrently executing settlement tasks.
//!
//! ## Core Components
//!
//! - **ScopeResolver**: validates the job filter and expands it into models
//! - **TransactionStateTracker**: reads pending transactions and leases them to a job
//! - **TaskDispatcher**: runs tasks in callback-keyed pools and signals completion once per pool
//! - **SettlementOrchestrator**: the per-job unit of work tying the above together
//! - **SettlementCore**: bootstrap and public entry point of the engine

pub mod core;
pub mod scope_resolver;
pub mod settlement_orchestrator;
pub mod task_dispatcher;
pub mod transaction_state;
pub mod types;

pub use core::{DataLayer, SettlementCore};
pub use scope_resolver::{ResolvedScope, ScopeResolver};
pub use settlement_orchestrator::{DispatchStats, SettlementOrchestrator};
pub use task_dispatcher::{PoolCompletion, TaskDispatcher};
pub use transaction_state::{ClaimJournal, TransactionStateTracker};
pub use types::{FailureKind, PoolSummary, TaskFailure};
