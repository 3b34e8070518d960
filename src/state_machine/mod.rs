// Transaction state machine for settlement bookkeeping.
//
// Only the claim (pending -> processing) is driven by the orchestrator; the
// remaining transitions belong to the settlement task and to rollback.

pub mod events;
pub mod states;

pub use events::TransactionEvent;
pub use states::TransactionState;
