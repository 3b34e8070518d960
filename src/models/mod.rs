pub mod aggregator;
pub mod rss_model;
pub mod rss_report;
pub mod settlement_job;
pub mod sharing_report;
pub mod transaction;

// Re-export core models for easy access
pub use aggregator::{Aggregator, Provider};
pub use rss_model::{RssModel, StakeholderModel};
pub use rss_report::RssReport;
pub use settlement_job::SettlementJob;
pub use sharing_report::{Currency, NewSharingReport, ReportId, SharingReport, StakeholderAllocation};
pub use transaction::{Transaction, TransactionType};
