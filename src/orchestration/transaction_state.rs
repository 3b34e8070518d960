//! # Transaction State Tracker
//!
//! Reads the transactions of a resolved model and moves them through the
//! transaction state machine, with an explicit flush boundary.
//!
//! ## Claiming
//!
//! A settlement job takes ownership of a transaction by moving it from
//! `pending` to `processing` with a conditional write, then flushing. The
//! flush is the commit point of the lease: once it returns, no other job can
//! select the transaction. A transaction whose conditional write loses against
//! a concurrent job is dropped from the batch.
//!
//! Every successful claim is recorded in a [`ClaimJournal`] so the enclosing
//! unit of work can return its transactions to `pending` if the run fails.

use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::database::TransactionStore;
use crate::error::Result;
use crate::models::{RssModel, Transaction};
use crate::state_machine::{TransactionEvent, TransactionState};

/// Transactions claimed during one settlement run
#[derive(Debug, Default)]
pub struct ClaimJournal {
    claimed: Vec<Transaction>,
}

impl ClaimJournal {
    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn claimed_ids(&self) -> Vec<i64> {
        self.claimed.iter().map(|tx| tx.tx_id).collect()
    }
}

pub struct TransactionStateTracker {
    store: Arc<dyn TransactionStore>,
}

impl TransactionStateTracker {
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self { store }
    }

    /// Transactions of `model` currently eligible for settlement
    pub async fn find_pending(&self, model: &RssModel) -> Result<Vec<Transaction>> {
        self.store
            .find_pending(
                &model.aggregator_id,
                &model.owner_provider_id,
                &model.product_class,
            )
            .await
    }

    /// Overwrite the state of every transaction, optionally flushing afterwards
    pub async fn set_tx_state(
        &self,
        transactions: &mut [Transaction],
        state: TransactionState,
        flush: bool,
    ) -> Result<()> {
        for tx in transactions.iter_mut() {
            tx.state = state;
            self.store.update(tx).await?;
        }

        if flush {
            self.store.flush().await?;
        }
        Ok(())
    }

    /// Apply a state machine event to every transaction.
    ///
    /// All transitions are validated before anything is written, so an illegal
    /// event leaves the batch untouched.
    pub async fn apply_event(
        &self,
        transactions: &mut [Transaction],
        event: TransactionEvent,
        flush: bool,
    ) -> Result<()> {
        let targets = transactions
            .iter()
            .map(|tx| tx.state.transition(event))
            .collect::<Result<Vec<_>>>()?;

        for (tx, target) in transactions.iter_mut().zip(targets) {
            tx.state = target;
            self.store.update(tx).await?;
        }

        if flush {
            self.store.flush().await?;
        }
        Ok(())
    }

    /// Lease pending transactions for one settlement task.
    ///
    /// Returns the transactions actually claimed, already in `processing`
    /// state and flushed.
    #[instrument(skip(self, transactions, journal), fields(candidates = transactions.len()))]
    pub async fn claim(
        &self,
        transactions: Vec<Transaction>,
        journal: &mut ClaimJournal,
    ) -> Result<Vec<Transaction>> {
        let mut claimed = Vec::with_capacity(transactions.len());

        for mut tx in transactions {
            let expected = tx.state;
            tx.state = expected.transition(TransactionEvent::Claim)?;

            if self.store.update_if_state(&tx, expected).await? {
                journal.claimed.push(tx.clone());
                claimed.push(tx);
            } else {
                debug!(tx_id = tx.tx_id, "Transaction already claimed by another job");
            }
        }

        if !claimed.is_empty() {
            self.store.flush().await?;
        }

        Ok(claimed)
    }

    /// Roll back the claims of a failed run: every journaled transaction still
    /// in `processing` goes back to `pending`.
    ///
    /// Settlement tasks that were already dispatched keep running; their
    /// transactions are released all the same.
    #[instrument(skip(self, journal), fields(claimed = journal.len()))]
    pub async fn release(&self, journal: ClaimJournal) -> Result<usize> {
        let mut released = 0;

        for mut tx in journal.claimed {
            let expected = tx.state;
            tx.state = expected.transition(TransactionEvent::Release)?;

            if self.store.update_if_state(&tx, expected).await? {
                released += 1;
            } else {
                warn!(
                    tx_id = tx.tx_id,
                    "Claimed transaction moved on before rollback; leaving it as is"
                );
            }
        }

        self.store.flush().await?;
        Ok(released)
    }
}
