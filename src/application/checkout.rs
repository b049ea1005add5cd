use super::countdown::Countdown;
use super::session::{CheckoutSession, Outcome, Phase, SessionEvent, SessionView};
use super::simulator::{DelayFn, ProcessingSimulator, jittered_delay};
use crate::domain::ports::{MethodCatalogArc, PaymentAuthorityArc, TransactionStoreArc};
use crate::domain::transaction::TransactionStatus;
use crate::error::{CheckoutError, Result};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

/// Timing knobs for a checkout session.
pub struct CheckoutConfig {
    /// Cadence of the expiry clock.
    pub tick: Duration,
    /// Inter-step pacing of the processing simulator.
    pub delay: DelayFn,
    /// How long after a terminal outcome the redirect becomes due.
    pub redirect_delay: Duration,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            delay: jittered_delay(1_000, 3_000),
            redirect_delay: Duration::from_secs(2),
        }
    }
}

/// Entry point for running one checkout against a transaction id.
///
/// Owns the external collaborator ports and hands out a [`CheckoutHandle`]
/// per started session. A session is scoped to exactly one transaction id
/// for its whole lifetime; a different transaction needs a new `start` call.
pub struct Checkout {
    store: TransactionStoreArc,
    catalog: MethodCatalogArc,
    authority: PaymentAuthorityArc,
    config: CheckoutConfig,
}

impl Checkout {
    pub fn new(
        store: TransactionStoreArc,
        catalog: MethodCatalogArc,
        authority: PaymentAuthorityArc,
    ) -> Self {
        Self {
            store,
            catalog,
            authority,
            config: CheckoutConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CheckoutConfig) -> Self {
        self.config = config;
        self
    }

    /// Loads the transaction and the method catalog (concurrently, as a
    /// join) and spawns the session event loop.
    ///
    /// Any fetch failure, including not-found, is fatal: the session never
    /// reaches `selecting` and the caller gets
    /// [`CheckoutError::LinkUnavailable`].
    pub async fn start(self, transaction_id: &str) -> Result<CheckoutHandle> {
        let Self {
            store,
            catalog,
            authority,
            config,
        } = self;

        let (transaction, methods) =
            tokio::join!(store.fetch(transaction_id), catalog.active_methods());
        let transaction = transaction
            .map_err(|err| CheckoutError::LinkUnavailable(err.to_string()))?
            .ok_or_else(|| {
                CheckoutError::LinkUnavailable(format!("transaction {transaction_id} not found"))
            })?;
        let methods = methods.map_err(|err| CheckoutError::LinkUnavailable(err.to_string()))?;

        let remaining = transaction.remaining_at(unix_now());
        let session = CheckoutSession::new(transaction, methods, remaining);
        let view = session.subscribe();

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        // The clock only runs for a session that can still be submitted.
        let countdown = match session.phase() {
            Phase::Selecting => Some(Countdown::start(remaining, config.tick, events_tx.clone())),
            _ => None,
        };

        // The driver keeps only a weak sender: the queue stays open exactly
        // as long as the handle, the clock or a simulator task can still
        // produce an event.
        let driver = SessionDriver {
            session,
            countdown,
            store,
            authority,
            config,
            events_tx: events_tx.downgrade(),
        };
        let task = tokio::spawn(driver.run(events_rx));

        Ok(CheckoutHandle {
            events: events_tx,
            view,
            task,
        })
    }
}

/// Live handle to a running checkout session.
///
/// Commands are fire-and-forget: invalid ones (submit without a method,
/// input after a terminal transition) are absorbed by the state machine as
/// no-ops, mirroring disabled controls rather than errors.
pub struct CheckoutHandle {
    events: UnboundedSender<SessionEvent>,
    view: watch::Receiver<SessionView>,
    task: JoinHandle<Outcome>,
}

impl CheckoutHandle {
    pub fn select_method(&self, code: impl Into<String>) {
        let _ = self.events.send(SessionEvent::SelectMethod(code.into()));
    }

    pub fn update_phone(&self, value: impl Into<String>) {
        let _ = self.events.send(SessionEvent::UpdatePhone(value.into()));
    }

    pub fn submit(&self) {
        let _ = self.events.send(SessionEvent::Submit);
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    /// Waits for the session's terminal outcome.
    pub async fn outcome(self) -> Outcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(%err, "session task did not run to completion");
                Outcome::Failed {
                    reference: "N/A".to_string(),
                    message: Some("Payment could not be processed".to_string()),
                    redirect_url: None,
                }
            }
        }
    }
}

/// The single task that owns the session. All state transitions flow
/// through one event queue, so nothing mutates the session concurrently.
struct SessionDriver {
    session: CheckoutSession,
    countdown: Option<Countdown>,
    store: TransactionStoreArc,
    authority: PaymentAuthorityArc,
    config: CheckoutConfig,
    events_tx: mpsc::WeakUnboundedSender<SessionEvent>,
}

impl SessionDriver {
    async fn run(mut self, mut events: UnboundedReceiver<SessionEvent>) -> Outcome {
        // Idempotent re-entry: a link whose transaction is already resolved
        // terminates before any event is processed and before the simulator
        // could ever be engaged.
        if let Phase::Terminal(outcome) = self.session.phase() {
            return outcome.clone();
        }

        while let Some(event) = events.recv().await {
            let was_selecting = matches!(self.session.phase(), Phase::Selecting);
            match self.session.dispatch(event) {
                Phase::Processing if was_selecting => self.spawn_simulator(),
                Phase::Terminal(outcome) => {
                    if let Some(countdown) = &self.countdown {
                        countdown.stop();
                    }
                    self.persist(&outcome).await;
                    // Any terminal outcome may carry a redirect target, a
                    // receipt on success as much as a retry page on decline.
                    if outcome.redirect_url().is_some() {
                        tokio::time::sleep(self.config.redirect_delay).await;
                        self.session.mark_redirect_due();
                    }
                    return outcome;
                }
                _ => {}
            }
        }

        // Reached only when the handle, the clock and any simulator task are
        // all gone without a terminal event: nothing can resolve the session
        // anymore.
        warn!(
            transaction = %self.session.transaction().id,
            "event queue closed before a terminal transition"
        );
        Outcome::Failed {
            reference: "N/A".to_string(),
            message: Some("Checkout abandoned".to_string()),
            redirect_url: None,
        }
    }

    /// Launches the one in-flight simulator run. The task is detached on
    /// purpose: once started it always runs to completion, it is never
    /// cancelled by the state machine.
    fn spawn_simulator(&self) {
        let Some(events) = self.events_tx.upgrade() else {
            // Every strong sender is gone; the closed queue will wind the
            // session down as abandoned.
            return;
        };
        let Some(method) = self.session.selected_method().cloned() else {
            // Unreachable per the submit guard, but a missing method must
            // not hang the session.
            let _ = events.send(SessionEvent::ProcessingResolved(
                super::simulator::ProcessingOutcome {
                    approved: false,
                    reference: "N/A".to_string(),
                    message: Some("Payment could not be processed".to_string()),
                    redirect_url: None,
                },
            ));
            return;
        };
        let simulator =
            ProcessingSimulator::new(self.authority.clone(), self.config.delay.clone());
        let transaction = self.session.transaction().clone();
        let phone = self.session.customer_phone();
        tokio::spawn(async move {
            let outcome = simulator.run(&transaction, &method, phone, &events).await;
            let _ = events.send(SessionEvent::ProcessingResolved(outcome));
        });
    }

    /// Writes the terminal status back to the record store. The store stays
    /// authoritative; an already-resolved outcome writes nothing.
    async fn persist(&self, outcome: &Outcome) {
        let status = match outcome {
            Outcome::Completed { .. } => TransactionStatus::Completed,
            Outcome::Failed { .. } => TransactionStatus::Failed,
            Outcome::Expired => TransactionStatus::Expired,
            Outcome::AlreadyResolved(_) => return,
        };
        let id = &self.session.transaction().id;
        if let Err(err) = self.store.update_status(id, status).await {
            warn!(transaction = %id, %err, "failed to persist terminal status");
        }
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
