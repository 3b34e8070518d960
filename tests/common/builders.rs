//! Reference data and transaction builders shared by the integration tests.
//!
//! The seeded directory looks like this:
//!
//! ```text
//! a1: p1 (music, video), p2 (music), partner (no models)
//! a2: p3 (games)
//! ```

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use rss_core::database::InMemoryStore;
use rss_core::models::{
    Aggregator, Currency, Provider, RssModel, StakeholderModel, Transaction, TransactionType,
};
use rss_core::settlement::FIXED_PERCENTAGE;
use rss_core::state_machine::TransactionState;

pub const A1: &str = "a1@example.com";
pub const A2: &str = "a2@example.com";

pub fn model(aggregator_id: &str, provider_id: &str, product_class: &str) -> RssModel {
    RssModel {
        aggregator_id: aggregator_id.to_string(),
        owner_provider_id: provider_id.to_string(),
        product_class: product_class.to_string(),
        algorithm_type: FIXED_PERCENTAGE.to_string(),
        aggregator_value: dec!(20),
        owner_value: dec!(80),
        stakeholders: Vec::new(),
    }
}

/// a1/p1/music shares 10% with `partner`
pub fn shared_music_model() -> RssModel {
    RssModel {
        owner_value: dec!(70),
        stakeholders: vec![StakeholderModel::new("partner", dec!(10))],
        ..model(A1, "p1", "music")
    }
}

pub struct TxBuilder {
    tx: Transaction,
}

impl TxBuilder {
    pub fn new(tx_id: i64, aggregator_id: &str, provider_id: &str, product_class: &str) -> Self {
        Self {
            tx: Transaction {
                tx_id,
                aggregator_id: aggregator_id.to_string(),
                provider_id: provider_id.to_string(),
                product_class: product_class.to_string(),
                transaction_type: TransactionType::Charge,
                charged_amount: dec!(10),
                currency: "EUR".to_string(),
                state: TransactionState::Pending,
                created_at: Utc::now(),
            },
        }
    }

    pub fn amount(mut self, amount: Decimal) -> Self {
        self.tx.charged_amount = amount;
        self
    }

    pub fn currency(mut self, currency: &str) -> Self {
        self.tx.currency = currency.to_string();
        self
    }

    pub fn refund(mut self) -> Self {
        self.tx.transaction_type = TransactionType::Refund;
        self
    }

    pub fn build(self) -> Transaction {
        self.tx
    }
}

/// Directory, currencies and sharing models, without transactions
pub fn reference_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    store
        .add_aggregator(Aggregator::new(A1, "First Aggregator"))
        .add_aggregator(Aggregator::new(A2, "Second Aggregator"))
        .add_provider(Provider::new(A1, "p1", "Provider One"))
        .add_provider(Provider::new(A1, "p2", "Provider Two"))
        .add_provider(Provider::new(A1, "partner", "Partner"))
        .add_provider(Provider::new(A2, "p3", "Provider Three"))
        .add_currency(Currency::new("EUR", "Euro", 2))
        .add_currency(Currency::new("USD", "US Dollar", 2))
        .add_model(shared_music_model())
        .add_model(model(A1, "p1", "video"))
        .add_model(model(A1, "p2", "music"))
        .add_model(model(A2, "p3", "games"));
    store
}

/// Reference data plus eight pending transactions:
///
/// | ids  | scope         | currency |
/// |------|---------------|----------|
/// | 1-3  | a1/p1/music   | EUR      |
/// | 4    | a1/p1/music   | USD      |
/// | 5    | a1/p1/video   | EUR      |
/// | 6-7  | a1/p2/music   | EUR      |
/// | 8    | a2/p3/games   | USD      |
pub fn seeded_store() -> Arc<InMemoryStore> {
    let store = reference_store();
    store
        .insert_transaction(TxBuilder::new(1, A1, "p1", "music").amount(dec!(10)).build())
        .insert_transaction(TxBuilder::new(2, A1, "p1", "music").amount(dec!(20)).build())
        .insert_transaction(
            TxBuilder::new(3, A1, "p1", "music")
                .amount(dec!(5))
                .refund()
                .build(),
        )
        .insert_transaction(
            TxBuilder::new(4, A1, "p1", "music")
                .amount(dec!(8))
                .currency("USD")
                .build(),
        )
        .insert_transaction(TxBuilder::new(5, A1, "p1", "video").build())
        .insert_transaction(TxBuilder::new(6, A1, "p2", "music").build())
        .insert_transaction(TxBuilder::new(7, A1, "p2", "music").build())
        .insert_transaction(TxBuilder::new(8, A2, "p3", "games").currency("USD").build());
    store
}

pub const SEEDED_TRANSACTIONS: usize = 8;
