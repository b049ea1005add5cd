use async_trait::async_trait;
use checkout_engine::application::checkout::{Checkout, CheckoutConfig};
use checkout_engine::application::simulator::fixed_delay;
use checkout_engine::domain::ports::{
    AuthorizationRequest, AuthorizationResponse, AuthorizationStatus, PaymentAuthority,
    PaymentAuthorityArc,
};
use checkout_engine::domain::transaction::{Transaction, TransactionStatus};
use checkout_engine::error::{CheckoutError, Result};
use checkout_engine::infrastructure::in_memory::{InMemoryTransactionStore, StaticMethodCatalog};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Notify;

pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

pub fn pending_transaction(id: &str, ttl_secs: i64) -> Transaction {
    Transaction {
        id: id.to_string(),
        amount: dec!(25000).try_into().unwrap(),
        currency: "XOF".to_string(),
        status: TransactionStatus::Pending,
        customer_phone: None,
        description: Some("Order #1042".to_string()),
        expires_at: unix_now() + ttl_secs,
        merchant_name: "Boutique Awa".to_string(),
    }
}

/// A scriptable authority: counts invocations, optionally waits for a
/// release signal before answering, then returns the configured verdict.
pub struct StubAuthority {
    pub approve: bool,
    pub calls: AtomicUsize,
    pub gate: Option<Arc<Notify>>,
    pub answer_after: Option<Duration>,
}

impl StubAuthority {
    pub fn approving() -> Self {
        Self {
            approve: true,
            calls: AtomicUsize::new(0),
            gate: None,
            answer_after: None,
        }
    }

    pub fn declining() -> Self {
        Self {
            approve: false,
            ..Self::approving()
        }
    }

    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::approving()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            answer_after: Some(delay),
            ..Self::approving()
        }
    }
}

#[async_trait]
impl PaymentAuthority for StubAuthority {
    async fn authorize(&self, _request: AuthorizationRequest) -> Result<AuthorizationResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(delay) = self.answer_after {
            tokio::time::sleep(delay).await;
        }
        if self.approve {
            Ok(AuthorizationResponse {
                status: AuthorizationStatus::Completed,
                reference: "PAY-INTEG".to_string(),
                redirect_url: Some("/receipt/PAY-INTEG".to_string()),
                error_message: None,
            })
        } else {
            Ok(AuthorizationResponse {
                status: AuthorizationStatus::Failed,
                reference: "PAY-INTEG".to_string(),
                redirect_url: Some("/retry/PAY-INTEG".to_string()),
                error_message: Some("Payment was declined by the provider".to_string()),
            })
        }
    }
}

/// A transaction store whose reads always fail, for the fatal-fetch path.
pub struct UnreachableStore;

#[async_trait]
impl checkout_engine::domain::ports::TransactionStore for UnreachableStore {
    async fn fetch(&self, _id: &str) -> Result<Option<Transaction>> {
        Err(CheckoutError::Store(std::io::Error::other(
            "connection refused",
        )))
    }

    async fn update_status(&self, _id: &str, _status: TransactionStatus) -> Result<()> {
        Err(CheckoutError::Store(std::io::Error::other(
            "connection refused",
        )))
    }
}

/// A checkout wired with deterministic pacing: zero simulator delay. The 1s
/// countdown tick and the production 2s redirect delay stay, driven by
/// paused time.
pub const REDIRECT_DELAY: Duration = Duration::from_secs(2);

pub fn deterministic_checkout(
    store: Arc<InMemoryTransactionStore>,
    authority: PaymentAuthorityArc,
) -> Checkout {
    Checkout::new(store, Arc::new(StaticMethodCatalog::default()), authority).with_config(
        CheckoutConfig {
            tick: Duration::from_secs(1),
            delay: fixed_delay(Duration::ZERO),
            redirect_delay: REDIRECT_DELAY,
        },
    )
}
