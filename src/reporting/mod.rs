//! # Reporting
//!
//! Report generation (driven by settlement tasks), report queries and the
//! paid-flag update. Query and payment entry points are independent of job
//! execution.

pub mod payment;
pub mod report_builder;
pub mod report_query;

pub use payment::{PaymentFlagUpdater, PaymentUpdate};
pub use report_builder::ReportBuilder;
pub use report_query::ReportQueryService;
