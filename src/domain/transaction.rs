use crate::error::CheckoutError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Represents a positive monetary amount for a payment.
///
/// Wrapper around `rust_decimal::Decimal` that rejects zero and negative
/// values at construction.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, CheckoutError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(CheckoutError::Validation(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = CheckoutError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// Lifecycle status of a transaction as recorded by the external store.
///
/// Transitions are monotonic and one-directional: `Pending` moves to exactly
/// one of the terminal statuses and is never reversed.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Expired,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        *self != TransactionStatus::Pending
    }
}

/// A payment transaction as returned by the transaction record store.
///
/// The id is assigned by the store at creation and is opaque to this crate.
/// `expires_at` is an absolute unix timestamp in seconds, immutable once set.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Transaction {
    pub id: String,
    pub amount: Amount,
    pub currency: String,
    pub status: TransactionStatus,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub expires_at: i64,
    pub merchant_name: String,
}

impl Transaction {
    /// Seconds left until expiry at the given instant, floor-clamped at zero.
    pub fn remaining_at(&self, now: i64) -> u64 {
        self.expires_at.saturating_sub(now).max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_rejects_non_positive() {
        assert!(Amount::new(dec!(0.0)).is_err());
        assert!(Amount::new(dec!(-5.0)).is_err());
        assert_eq!(Amount::new(dec!(25000)).unwrap().value(), dec!(25000));
    }

    #[test]
    fn test_status_terminality() {
        assert!(!TransactionStatus::Pending.is_terminal());
        assert!(TransactionStatus::Completed.is_terminal());
        assert!(TransactionStatus::Failed.is_terminal());
        assert!(TransactionStatus::Expired.is_terminal());
    }

    #[test]
    fn test_remaining_clamps_at_zero() {
        let tx = Transaction {
            id: "tx-1".to_string(),
            amount: dec!(1000).try_into().unwrap(),
            currency: "XOF".to_string(),
            status: TransactionStatus::Pending,
            customer_phone: None,
            description: None,
            expires_at: 1_000,
            merchant_name: "Shop".to_string(),
        };
        assert_eq!(tx.remaining_at(875), 125);
        assert_eq!(tx.remaining_at(1_000), 0);
        assert_eq!(tx.remaining_at(2_000), 0);
    }

    #[test]
    fn test_transaction_deserialization() {
        // Shape of the transaction fetch response from the record store.
        let json = r#"{
            "id": "txn_8f2a",
            "amount": "25000",
            "currency": "XOF",
            "status": "pending",
            "customer_phone": null,
            "description": "Order #1042",
            "expires_at": 1700000900,
            "merchant_name": "Boutique Awa"
        }"#;

        let tx: Transaction = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(tx.id, "txn_8f2a");
        assert_eq!(tx.amount.value(), dec!(25000));
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(tx.description.as_deref(), Some("Order #1042"));
    }

    #[test]
    fn test_non_positive_amount_rejected_on_deserialization() {
        let json = r#"{
            "id": "txn_bad",
            "amount": "-10",
            "currency": "XOF",
            "status": "pending",
            "expires_at": 1700000900,
            "merchant_name": "Boutique Awa"
        }"#;
        assert!(serde_json::from_str::<Transaction>(json).is_err());
    }
}
