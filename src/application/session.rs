use super::countdown::format_remaining;
use super::simulator::ProcessingOutcome;
use crate::domain::method::PaymentMethod;
use crate::domain::transaction::{Transaction, TransactionStatus};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Phase of a checkout session. Advances strictly forward:
/// `Loading -> Selecting -> Processing -> Terminal`. Once terminal the
/// session accepts no further mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Loading,
    Selecting,
    Processing,
    Terminal(Outcome),
}

/// Final resolution of a checkout session.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed {
        reference: String,
        redirect_url: Option<String>,
    },
    Failed {
        reference: String,
        message: Option<String>,
        redirect_url: Option<String>,
    },
    /// The expiry clock fired while the session was still selecting.
    Expired,
    /// The transaction was already resolved in the store when the session
    /// loaded. Revisiting a resolved payment link never re-triggers
    /// processing.
    AlreadyResolved(TransactionStatus),
}

impl Outcome {
    /// Redirect target carried by the terminal state, when the authority
    /// supplied one. Both verdicts may carry a URL (a receipt page on
    /// success, a provider retry page on decline).
    pub fn redirect_url(&self) -> Option<&str> {
        match self {
            Outcome::Completed { redirect_url, .. } | Outcome::Failed { redirect_url, .. } => {
                redirect_url.as_deref()
            }
            _ => None,
        }
    }
}

/// Discrete inputs driving the state machine. User commands and internal
/// events (clock ticks, simulator progress) share one queue so that all
/// transitions are totally ordered relative to the phase.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    SelectMethod(String),
    UpdatePhone(String),
    Submit,
    CountdownTick { remaining: u64 },
    ExpiryElapsed,
    StepEmitted(String),
    ProcessingResolved(ProcessingOutcome),
}

/// Snapshot published to observers after every transition.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub phase: Phase,
    pub countdown: String,
    pub remaining_seconds: u64,
    pub selected_method: Option<String>,
    pub can_submit: bool,
    pub steps: Vec<String>,
    /// Set after the redirect delay once a terminal outcome carries a
    /// redirect URL; the host is expected to navigate when it flips.
    pub redirect_due: bool,
}

impl SessionView {
    fn loading() -> Self {
        Self {
            phase: Phase::Loading,
            countdown: format_remaining(0),
            remaining_seconds: 0,
            selected_method: None,
            can_submit: false,
            steps: Vec::new(),
            redirect_due: false,
        }
    }
}

/// The checkout state machine for a single transaction.
///
/// Pure with respect to time and IO: every transition happens inside
/// `dispatch`, in response to one discrete event. The async driver in
/// [`super::checkout`] owns the event queue, the expiry clock and the
/// simulator task; this type owns the phase invariants.
pub struct CheckoutSession {
    transaction: Transaction,
    methods: Vec<PaymentMethod>,
    selected: Option<PaymentMethod>,
    phone_draft: Option<String>,
    remaining: u64,
    steps: Vec<String>,
    phase: Phase,
    redirect_due: bool,
    view_tx: watch::Sender<SessionView>,
}

impl CheckoutSession {
    /// Builds a session from the fetched transaction and method catalog.
    ///
    /// A transaction that is no longer pending lands directly in
    /// `Terminal(AlreadyResolved)`; the simulator and the expiry clock are
    /// never engaged for it.
    pub fn new(transaction: Transaction, methods: Vec<PaymentMethod>, remaining: u64) -> Self {
        let phase = if transaction.status.is_terminal() {
            Phase::Terminal(Outcome::AlreadyResolved(transaction.status))
        } else {
            Phase::Selecting
        };
        let (view_tx, _) = watch::channel(SessionView::loading());
        let mut session = Self {
            transaction,
            methods,
            selected: None,
            phone_draft: None,
            remaining,
            steps: Vec::new(),
            phase,
            redirect_due: false,
            view_tx,
        };
        session.publish();
        session
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn methods(&self) -> &[PaymentMethod] {
        &self.methods
    }

    pub fn selected_method(&self) -> Option<&PaymentMethod> {
        self.selected.as_ref()
    }

    /// The phone number to submit: the draft buffer if the customer typed
    /// one, else whatever the transaction record carried.
    pub fn customer_phone(&self) -> Option<String> {
        self.phone_draft
            .clone()
            .or_else(|| self.transaction.customer_phone.clone())
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view_tx.subscribe()
    }

    /// Applies one event and returns the (possibly unchanged) phase.
    pub fn dispatch(&mut self, event: SessionEvent) -> Phase {
        match event {
            SessionEvent::SelectMethod(code) => self.select_method(&code),
            SessionEvent::UpdatePhone(value) => self.update_phone(value),
            SessionEvent::Submit => self.submit(),
            SessionEvent::CountdownTick { remaining } => self.on_tick(remaining),
            SessionEvent::ExpiryElapsed => self.on_expiry(),
            SessionEvent::StepEmitted(label) => self.on_step(label),
            SessionEvent::ProcessingResolved(outcome) => self.on_resolved(outcome),
        }
        self.publish();
        self.phase.clone()
    }

    fn select_method(&mut self, code: &str) {
        if self.phase != Phase::Selecting {
            return;
        }
        // Selection is only meaningful against the catalog this session
        // loaded; unknown codes are ignored.
        if let Some(method) = self.methods.iter().find(|m| m.code == code) {
            self.selected = Some(method.clone());
        }
    }

    fn update_phone(&mut self, value: String) {
        if self.phase != Phase::Selecting {
            return;
        }
        // Free-form input buffer; the payment authority validates it.
        self.phone_draft = Some(value);
    }

    fn submit(&mut self) {
        if self.phase != Phase::Selecting {
            debug!(phase = ?self.phase, "submit rejected outside selecting");
            return;
        }
        if self.selected.is_none() || self.remaining == 0 {
            // Observable as a disabled action, not an error.
            return;
        }
        self.phase = Phase::Processing;
        debug!(transaction = %self.transaction.id, "session entered processing");
    }

    fn on_tick(&mut self, remaining: u64) {
        if matches!(self.phase, Phase::Terminal(_)) {
            return;
        }
        self.remaining = remaining;
    }

    fn on_expiry(&mut self) {
        match self.phase {
            Phase::Selecting => {
                self.remaining = 0;
                self.phase = Phase::Terminal(Outcome::Expired);
                info!(transaction = %self.transaction.id, "session expired");
            }
            Phase::Processing => {
                // An attempt already in flight is never pre-empted by
                // expiry; the event is discarded, not deferred.
                warn!(transaction = %self.transaction.id, "expiry discarded during processing");
            }
            _ => {}
        }
    }

    fn on_step(&mut self, label: String) {
        if self.phase != Phase::Processing {
            return;
        }
        self.steps.push(label);
    }

    fn on_resolved(&mut self, outcome: ProcessingOutcome) {
        if self.phase != Phase::Processing {
            return;
        }
        let outcome = if outcome.approved {
            Outcome::Completed {
                reference: outcome.reference,
                redirect_url: outcome.redirect_url,
            }
        } else {
            Outcome::Failed {
                reference: outcome.reference,
                message: outcome.message,
                redirect_url: outcome.redirect_url,
            }
        };
        info!(transaction = %self.transaction.id, ?outcome, "session resolved");
        self.phase = Phase::Terminal(outcome);
    }

    /// Marks the redirect as due. Called by the driver after the redirect
    /// delay has elapsed on a terminal outcome carrying a URL.
    pub(crate) fn mark_redirect_due(&mut self) {
        self.redirect_due = true;
        self.publish();
    }

    fn publish(&self) {
        let can_submit =
            self.phase == Phase::Selecting && self.selected.is_some() && self.remaining > 0;
        // send_replace, not send: the snapshot must be stored even while no
        // observer is subscribed yet, so a late subscriber reads the current
        // state rather than the initial loading view.
        let _ = self.view_tx.send_replace(SessionView {
            phase: self.phase.clone(),
            countdown: format_remaining(self.remaining),
            remaining_seconds: self.remaining,
            selected_method: self.selected.as_ref().map(|m| m.code.clone()),
            can_submit,
            steps: self.steps.clone(),
            redirect_due: self.redirect_due,
        });
    }
}
