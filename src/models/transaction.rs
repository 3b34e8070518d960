//! # Transaction Model
//!
//! A billable event awaiting or undergoing settlement. Transactions belong to
//! the model identified by their `(aggregator_id, provider_id, product_class)`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::state_machine::TransactionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Charge,
    Refund,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Charge => "charge",
            Self::Refund => "refund",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "charge" | "C" => Ok(Self::Charge),
            "refund" | "R" => Ok(Self::Refund),
            _ => Err(format!("Invalid transaction type: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub tx_id: i64,
    pub aggregator_id: String,
    pub provider_id: String,
    pub product_class: String,
    pub transaction_type: TransactionType,
    pub charged_amount: Decimal,
    /// ISO 4217 alphabetic code
    pub currency: String,
    pub state: TransactionState,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Amount contributed to the settlement total; refunds count negatively
    pub fn signed_amount(&self) -> Decimal {
        match self.transaction_type {
            TransactionType::Charge => self.charged_amount,
            TransactionType::Refund => -self.charged_amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tx(transaction_type: TransactionType, amount: Decimal) -> Transaction {
        Transaction {
            tx_id: 1,
            aggregator_id: "agg@example.com".to_string(),
            provider_id: "prov".to_string(),
            product_class: "music".to_string(),
            transaction_type,
            charged_amount: amount,
            currency: "EUR".to_string(),
            state: TransactionState::Pending,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_refunds_are_negative() {
        assert_eq!(tx(TransactionType::Charge, dec!(10.50)).signed_amount(), dec!(10.50));
        assert_eq!(tx(TransactionType::Refund, dec!(2.25)).signed_amount(), dec!(-2.25));
    }

    #[test]
    fn test_transaction_type_parsing_accepts_short_codes() {
        assert_eq!("C".parse::<TransactionType>().unwrap(), TransactionType::Charge);
        assert_eq!("refund".parse::<TransactionType>().unwrap(), TransactionType::Refund);
        assert!("X".parse::<TransactionType>().is_err());
    }
}
