use {
    super::poller::{self, PollerConfig, StatusUpdate},
    crate::domain::{
        error::PaymentError,
        gateway::{InitiateAck, PaymentGateway},
        id::CheckoutId,
        request::PaymentRequest,
        session::{PaymentResult, PaymentSession, SessionState},
        status::{CodeTable, StatusClassification},
    },
    std::{
        collections::HashMap,
        sync::{
            Arc, Mutex, PoisonError,
            atomic::{AtomicBool, AtomicU64, Ordering},
        },
    },
    tokio::sync::watch,
};

/// Outcome of an initiate call. Push-mode sessions resolve locally after
/// the confirmation loop; redirect-mode sessions hand back a hosted page
/// URL and are probed via [`PaymentOrchestrator::check`] once the payer
/// returns.
#[derive(Debug)]
pub enum InitiateResponse {
    Resolved(PaymentResult),
    Redirect {
        reference: CheckoutId,
        redirect_url: String,
    },
}

struct SlotEntry {
    abort: Arc<AtomicBool>,
    token: u64,
}

/// Ties validator, gateway client and confirmation poller together.
/// Long-lived: each `initiate` call owns an independent session, and an
/// in-flight map guarantees at most one active poll loop per business
/// reference.
pub struct PaymentOrchestrator {
    gateway: Arc<dyn PaymentGateway>,
    codes: CodeTable,
    poller: PollerConfig,
    in_flight: Mutex<HashMap<String, SlotEntry>>,
    next_token: AtomicU64,
    updates: watch::Sender<StatusUpdate>,
}

impl PaymentOrchestrator {
    pub fn new(gateway: Arc<dyn PaymentGateway>, codes: CodeTable, poller: PollerConfig) -> Self {
        let (updates, _) = watch::channel(StatusUpdate::default());
        Self {
            gateway,
            codes,
            poller,
            in_flight: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
            updates,
        }
    }

    /// Subscribe to human-readable progress updates for all sessions.
    pub fn subscribe(&self) -> watch::Receiver<StatusUpdate> {
        self.updates.subscribe()
    }

    /// Validate, submit to the gateway, and for push mode run the
    /// confirmation loop to a single terminal result. Validation and
    /// initiate failures surface immediately; no session is created and
    /// nothing is polled.
    pub async fn initiate(&self, request: PaymentRequest) -> Result<InitiateResponse, PaymentError> {
        let request = request.validate()?;
        let reference = request.reference.clone();

        let slot = self.claim(&reference)?;
        self.emit(&reference, "Initiating payment...");

        let ack = self.gateway.initiate(&request).await.inspect_err(|err| {
            tracing::warn!(%reference, error = %err, "initiate rejected");
            self.emit(&reference, "Payment failed");
        })?;

        match ack {
            InitiateAck::Accepted {
                checkout_id,
                accepted_immediately,
                description,
            } => {
                if !accepted_immediately {
                    self.emit(&reference, "Payment failed");
                    return Err(PaymentError::Gateway(if description.is_empty() {
                        "payment request was not accepted".to_string()
                    } else {
                        description
                    }));
                }
                let message = if description.is_empty() {
                    "Please enter your M-Pesa PIN on your phone...".to_string()
                } else {
                    description
                };
                self.emit(&reference, message);

                let mut session = PaymentSession::new(checkout_id);
                session.advance(SessionState::Initiating)?;
                session.advance(SessionState::AwaitingConfirmation)?;

                let result = poller::await_confirmation(
                    self.gateway.as_ref(),
                    &self.codes,
                    &self.poller,
                    &reference,
                    &mut session,
                    &self.updates,
                    &slot.abort,
                )
                .await?;

                tracing::info!(
                    %reference,
                    checkout_id = %session.checkout_id(),
                    attempts = session.attempts(),
                    state = %session.state(),
                    success = result.success,
                    "payment session resolved"
                );
                Ok(InitiateResponse::Resolved(result))
            }
            InitiateAck::Redirect {
                reference: tracking,
                redirect_url,
            } => {
                self.emit(&reference, "Redirecting to payment page...");
                tracing::info!(%reference, tracking = %tracking, "redirect order submitted");
                Ok(InitiateResponse::Redirect {
                    reference: tracking,
                    redirect_url,
                })
            }
        }
    }

    /// Single classified status probe. Used by redirect-mode callers
    /// after control returns from the hosted page, and for ad-hoc
    /// push-mode status queries. Idempotent with respect to provider
    /// state.
    pub async fn check(
        &self,
        checkout_id: &CheckoutId,
    ) -> Result<StatusClassification, PaymentError> {
        let raw = self.gateway.check_status(checkout_id).await?;
        Ok(self.codes.classify(&raw))
    }

    /// Discard local tracking for `reference`. The in-flight loop (if
    /// any) resolves as abandoned on its next wake-up, and the
    /// orchestrator is immediately ready for a new `initiate`. A push
    /// request already delivered to the payer's device is not retracted.
    pub fn reset(&self, reference: &str) -> bool {
        let mut map = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match map.remove(reference) {
            Some(entry) => {
                entry.abort.store(true, Ordering::Relaxed);
                tracing::info!(%reference, "session reset, local tracking discarded");
                true
            }
            None => false,
        }
    }

    fn emit(&self, reference: &str, message: impl Into<String>) {
        self.updates.send_replace(StatusUpdate {
            reference: reference.to_string(),
            message: message.into(),
        });
    }

    /// Register `reference` as in flight, rejecting a second `initiate`
    /// while a session for it is still awaiting confirmation.
    fn claim(&self, reference: &str) -> Result<SessionSlot<'_>, PaymentError> {
        let mut map = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if map.contains_key(reference) {
            return Err(PaymentError::SessionActive(reference.to_string()));
        }
        let abort = Arc::new(AtomicBool::new(false));
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        map.insert(
            reference.to_string(),
            SlotEntry {
                abort: Arc::clone(&abort),
                token,
            },
        );
        Ok(SessionSlot {
            orchestrator: self,
            reference: reference.to_string(),
            token,
            abort,
        })
    }
}

/// In-flight registration, released when the initiate call finishes or
/// its future is dropped. The token guards against evicting a newer
/// session that reclaimed the reference after a `reset`.
struct SessionSlot<'a> {
    orchestrator: &'a PaymentOrchestrator,
    reference: String,
    token: u64,
    abort: Arc<AtomicBool>,
}

impl Drop for SessionSlot<'_> {
    fn drop(&mut self) {
        let mut map = self
            .orchestrator
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if map.get(&self.reference).is_some_and(|e| e.token == self.token) {
            map.remove(&self.reference);
        }
    }
}
