//! # Settlement
//!
//! Revenue allocation and the settlement tasks that apply it to claimed
//! transaction batches.

pub mod allocation;
pub mod task;

pub use allocation::{AllocationCalculator, AllocationResult, FixedPercentageCalculator, FIXED_PERCENTAGE};
pub use task::{
    ProductSettlementTask, ProductSettlementTaskFactory, SettlementTask, SettlementTaskFactory,
};
