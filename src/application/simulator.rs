use super::session::SessionEvent;
use crate::domain::method::{MethodFamily, PaymentMethod};
use crate::domain::ports::{AuthorizationRequest, AuthorizationStatus, PaymentAuthorityArc};
use crate::domain::transaction::Transaction;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

/// Reference attached to outcomes when the authority could not be reached or
/// answered garbage.
const GENERIC_FAILURE_REFERENCE: &str = "N/A";
const GENERIC_FAILURE_MESSAGE: &str = "Payment could not be processed";

/// Inter-step pacing source. Injectable so tests run the simulator with a
/// zero or fixed delay while production uses randomized pacing.
pub type DelayFn = Arc<dyn Fn() -> Duration + Send + Sync>;

/// Uniformly random delay in `[min_ms, max_ms]`.
pub fn jittered_delay(min_ms: u64, max_ms: u64) -> DelayFn {
    Arc::new(move || Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms)))
}

pub fn fixed_delay(delay: Duration) -> DelayFn {
    Arc::new(move || delay)
}

/// Result of one simulator invocation. Exactly one is produced per run; the
/// simulator never retries internally.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingOutcome {
    pub approved: bool,
    pub reference: String,
    pub redirect_url: Option<String>,
    pub message: Option<String>,
}

impl ProcessingOutcome {
    fn transport_failure() -> Self {
        Self {
            approved: false,
            reference: GENERIC_FAILURE_REFERENCE.to_string(),
            redirect_url: None,
            message: Some(GENERIC_FAILURE_MESSAGE.to_string()),
        }
    }
}

/// Ordered step labels for a method family. The sequence is what the
/// customer watches while the authority decides.
pub fn steps_for(family: MethodFamily) -> &'static [&'static str] {
    match family {
        MethodFamily::MobileMoney => &[
            "Connecting to operator",
            "Sending payment request",
            "Verifying account balance",
            "Awaiting confirmation",
        ],
        MethodFamily::Card => &[
            "Validating card details",
            "Contacting issuing bank",
            "Running 3-D Secure check",
            "Authorizing payment",
        ],
    }
}

/// Drives the perceived multi-stage authorization flow for one submission.
///
/// The authorization request is dispatched to the authority up front; the
/// step sequence is then emitted in full, paced by the delay function, and
/// only afterwards is the verdict relayed. The visual sequence is never
/// shortcut, even when the authority answered early, and no error escapes
/// this component: transport failures become a failed outcome with a generic
/// reference.
pub struct ProcessingSimulator {
    authority: PaymentAuthorityArc,
    delay: DelayFn,
}

impl ProcessingSimulator {
    pub fn new(authority: PaymentAuthorityArc, delay: DelayFn) -> Self {
        Self { authority, delay }
    }

    pub async fn run(
        &self,
        transaction: &Transaction,
        method: &PaymentMethod,
        customer_phone: Option<String>,
        events: &UnboundedSender<SessionEvent>,
    ) -> ProcessingOutcome {
        let request = AuthorizationRequest {
            transaction_id: transaction.id.clone(),
            method_code: method.code.clone(),
            customer_phone,
        };
        let authority = Arc::clone(&self.authority);
        let verdict = tokio::spawn(async move { authority.authorize(request).await });

        for label in steps_for(method.family) {
            let _ = events.send(SessionEvent::StepEmitted(label.to_string()));
            tokio::time::sleep((self.delay)()).await;
        }

        match verdict.await {
            Ok(Ok(response)) => {
                debug!(reference = %response.reference, "authority verdict relayed");
                ProcessingOutcome {
                    approved: response.status == AuthorizationStatus::Completed,
                    reference: response.reference,
                    redirect_url: response.redirect_url,
                    message: response.error_message,
                }
            }
            Ok(Err(err)) => {
                warn!(transaction = %transaction.id, %err, "authority unreachable");
                ProcessingOutcome::transport_failure()
            }
            Err(err) => {
                warn!(transaction = %transaction.id, %err, "authorization task failed");
                ProcessingOutcome::transport_failure()
            }
        }
    }
}
