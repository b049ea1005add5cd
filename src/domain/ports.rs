use super::method::PaymentMethod;
use super::transaction::{Transaction, TransactionStatus};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Request sent to the payment authority when a checkout is submitted.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct AuthorizationRequest {
    pub transaction_id: String,
    pub method_code: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizationStatus {
    Completed,
    Failed,
}

/// Verdict relayed by the payment authority.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct AuthorizationResponse {
    pub status: AuthorizationStatus,
    pub reference: String,
    #[serde(default)]
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// The external transaction record store. Authoritative for transaction
/// state; the session never trusts its local copy after a terminal
/// transition.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn fetch(&self, id: &str) -> Result<Option<Transaction>>;
    async fn update_status(&self, id: &str, status: TransactionStatus) -> Result<()>;
}

/// The external payment method catalog.
#[async_trait]
pub trait MethodCatalog: Send + Sync {
    /// Active methods, in display order.
    async fn active_methods(&self) -> Result<Vec<PaymentMethod>>;
}

/// The external authority that accepts or rejects a payment attempt.
#[async_trait]
pub trait PaymentAuthority: Send + Sync {
    async fn authorize(&self, request: AuthorizationRequest) -> Result<AuthorizationResponse>;
}

pub type TransactionStoreArc = Arc<dyn TransactionStore>;
pub type MethodCatalogArc = Arc<dyn MethodCatalog>;
pub type PaymentAuthorityArc = Arc<dyn PaymentAuthority>;
