use crate::domain::method::{MethodFamily, PaymentMethod};
use crate::domain::ports::{
    AuthorizationRequest, AuthorizationResponse, AuthorizationStatus, MethodCatalog,
    PaymentAuthority, TransactionStore,
};
use crate::domain::transaction::{Transaction, TransactionStatus};
use crate::error::Result;
use async_trait::async_trait;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// A thread-safe in-memory transaction record store.
///
/// Uses `Arc<RwLock<HashMap<String, Transaction>>>` to allow shared
/// concurrent access. Status updates are monotonic: once a transaction is
/// terminal, later writes are ignored, so a session can never reverse or
/// double-resolve a record.
#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    transactions: Arc<RwLock<HashMap<String, Transaction>>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a record, as the external checkout-initiation step would.
    pub async fn insert(&self, transaction: Transaction) {
        let mut transactions = self.transactions.write().await;
        transactions.insert(transaction.id.clone(), transaction);
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn fetch(&self, id: &str) -> Result<Option<Transaction>> {
        let transactions = self.transactions.read().await;
        Ok(transactions.get(id).cloned())
    }

    async fn update_status(&self, id: &str, status: TransactionStatus) -> Result<()> {
        let mut transactions = self.transactions.write().await;
        if let Some(transaction) = transactions.get_mut(id) {
            if transaction.status.is_terminal() {
                debug!(transaction = %id, "ignoring status write on resolved transaction");
            } else {
                transaction.status = status;
            }
        }
        Ok(())
    }
}

/// A fixed, ordered method catalog.
#[derive(Clone)]
pub struct StaticMethodCatalog {
    methods: Vec<PaymentMethod>,
}

impl StaticMethodCatalog {
    pub fn new(methods: Vec<PaymentMethod>) -> Self {
        Self { methods }
    }
}

impl Default for StaticMethodCatalog {
    fn default() -> Self {
        Self::new(default_catalog())
    }
}

#[async_trait]
impl MethodCatalog for StaticMethodCatalog {
    async fn active_methods(&self) -> Result<Vec<PaymentMethod>> {
        Ok(self.methods.clone())
    }
}

/// The methods the product ships with.
pub fn default_catalog() -> Vec<PaymentMethod> {
    vec![
        PaymentMethod::new(
            "orange_money",
            "Orange Money",
            "Pay with your Orange Money wallet",
            MethodFamily::MobileMoney,
            0.95,
            "icon-orange",
        ),
        PaymentMethod::new(
            "mtn_momo",
            "MTN Mobile Money",
            "Pay with MTN MoMo",
            MethodFamily::MobileMoney,
            0.92,
            "icon-mtn",
        ),
        PaymentMethod::new(
            "wave",
            "Wave",
            "Pay with your Wave account",
            MethodFamily::MobileMoney,
            0.97,
            "icon-wave",
        ),
        PaymentMethod::new(
            "card",
            "Bank Card",
            "Visa or Mastercard",
            MethodFamily::Card,
            0.90,
            "icon-card",
        ),
    ]
}

/// A stand-in payment authority that draws the verdict from the per-method
/// success-rate hint. Useful for demos and for exercising the full flow
/// without a real provider.
pub struct SimulatedAuthority {
    rates: HashMap<String, f64>,
}

impl SimulatedAuthority {
    /// Default approval rate for methods the authority has no hint for.
    const FALLBACK_RATE: f64 = 0.9;

    pub fn new(methods: &[PaymentMethod]) -> Self {
        // Hints arrive from the catalog wire format unclamped; gen_bool
        // panics outside [0, 1].
        let rates = methods
            .iter()
            .map(|m| (m.code.clone(), m.success_rate_hint.clamp(0.0, 1.0)))
            .collect();
        Self { rates }
    }
}

#[async_trait]
impl PaymentAuthority for SimulatedAuthority {
    async fn authorize(&self, request: AuthorizationRequest) -> Result<AuthorizationResponse> {
        let rate = self
            .rates
            .get(&request.method_code)
            .copied()
            .unwrap_or(Self::FALLBACK_RATE);
        let (approved, reference) = {
            let mut rng = rand::thread_rng();
            let approved = rng.gen_bool(rate);
            (approved, format!("PAY-{:08X}", rng.r#gen::<u32>()))
        };
        if approved {
            Ok(AuthorizationResponse {
                status: AuthorizationStatus::Completed,
                redirect_url: Some(format!("/receipt/{reference}")),
                reference,
                error_message: None,
            })
        } else {
            Ok(AuthorizationResponse {
                status: AuthorizationStatus::Failed,
                redirect_url: None,
                reference,
                error_message: Some("Payment was declined by the provider".to_string()),
            })
        }
    }
}
