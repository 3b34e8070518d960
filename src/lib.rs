#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # RSS Core Rust
//!
//! Revenue sharing settlement engine: settles pending charge and refund
//! transactions against the sharing model of their `(aggregator, provider,
//! product class)` scope and persists one sharing report per settlement.
//!
//! ## Overview
//!
//! A settlement job names an optional scope and a callback key. The engine
//! resolves every matching model, claims the model's pending transactions and
//! hands each claimed batch to a settlement task. Tasks run concurrently in a
//! pool keyed by the callback; when the pool is closed and its last task
//! finishes, the completion notifier fires exactly once for that key.
//!
//! ## Module Organization
//!
//! - [`models`] - Aggregators, providers, sharing models, transactions and reports
//! - [`database`] - Storage traits with in-memory and PostgreSQL implementations
//! - [`state_machine`] - Transaction settlement states and events
//! - [`settlement`] - Allocation calculators and settlement tasks
//! - [`reporting`] - Report generation, queries and payment flags
//! - [`orchestration`] - Scope resolution, claiming, dispatch and the engine facade
//! - [`events`] - Pool completion notifiers
//! - [`config`] - Layered configuration
//! - [`logging`] - Structured logging bootstrap
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rss_core::config::RssConfig;
//! use rss_core::database::InMemoryStore;
//! use rss_core::events::TracingNotifier;
//! use rss_core::models::SettlementJob;
//! use rss_core::orchestration::{DataLayer, SettlementCore};
//! use rss_core::settlement::FixedPercentageCalculator;
//!
//! # async fn example() -> rss_core::Result<()> {
//! let store = Arc::new(InMemoryStore::new());
//! let core = SettlementCore::with_data_layer(
//!     &RssConfig::default(),
//!     DataLayer::from_store(store),
//!     Arc::new(FixedPercentageCalculator),
//!     Arc::new(TracingNotifier),
//! );
//!
//! let job = SettlementJob::new("https://billing.example.com/settled")
//!     .with_aggregator("aggregator@example.com");
//! core.run_settlement(&job).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit and integration tests
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod reporting;
pub mod settlement;
pub mod state_machine;

pub use config::{ConfigManager, RssConfig};
pub use database::{Pagination, ReportFilter};
pub use error::{Result, RssError, ValidationCode};
pub use events::{CompletionNotifier, CompletionPublisher, TracingNotifier};
pub use models::{RssReport, SettlementJob};
pub use orchestration::{DataLayer, PoolSummary, SettlementCore};
pub use reporting::PaymentUpdate;
pub use settlement::{AllocationCalculator, FixedPercentageCalculator};
pub use state_machine::{TransactionEvent, TransactionState};
