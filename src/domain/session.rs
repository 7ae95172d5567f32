use {
    super::error::PaymentError,
    super::id::CheckoutId,
    super::status::StatusClassification,
    chrono::{DateTime, Utc},
    serde::Serialize,
    std::fmt,
};

/// Terminal outcome of a confirmation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Success,
    Failure,
    TimedOut,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::TimedOut => write!(f, "timed_out"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Initiating,
    AwaitingConfirmation,
    Resolved(Resolution),
}

impl SessionState {
    /// Lifecycle rank — higher means further along. Transitions are
    /// strictly forward; a session never returns to an earlier state.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Initiating => 1,
            Self::AwaitingConfirmation => 2,
            Self::Resolved(_) => 3,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    pub fn can_transition_to(&self, next: &SessionState) -> bool {
        next.rank() == self.rank() + 1
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Initiating => write!(f, "initiating"),
            Self::AwaitingConfirmation => write!(f, "awaiting_confirmation"),
            Self::Resolved(r) => write!(f, "resolved({r})"),
        }
    }
}

/// Tracking state for one initiate call. Created exactly once per
/// session, mutated only by the poll loop that owns it, discarded after
/// the caller consumes the result.
#[derive(Debug)]
pub struct PaymentSession {
    checkout_id: CheckoutId,
    state: SessionState,
    attempts: u32,
    created_at: DateTime<Utc>,
    last_status: Option<StatusClassification>,
}

impl PaymentSession {
    pub fn new(checkout_id: CheckoutId) -> Self {
        Self {
            checkout_id,
            state: SessionState::Idle,
            attempts: 0,
            created_at: Utc::now(),
            last_status: None,
        }
    }

    pub fn checkout_id(&self) -> &CheckoutId {
        &self.checkout_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_status(&self) -> Option<&StatusClassification> {
        self.last_status.as_ref()
    }

    pub fn advance(&mut self, next: SessionState) -> Result<(), PaymentError> {
        if !self.state.can_transition_to(&next) {
            return Err(PaymentError::Validation(format!(
                "invalid session transition: {} → {}",
                self.state, next
            )));
        }
        self.state = next;
        Ok(())
    }

    /// Count one poll attempt. `classification` is absent when the
    /// status check itself failed at the transport level.
    pub fn record_attempt(&mut self, classification: Option<StatusClassification>) {
        self.attempts += 1;
        if classification.is_some() {
            self.last_status = classification;
        }
    }
}

/// Caller-facing value, produced exactly once per session at the
/// `Resolved` transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PaymentResult {
    pub fn succeeded(receipt: Option<String>) -> Self {
        Self {
            success: true,
            receipt,
            error: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            receipt: None,
            error: Some(reason.into()),
        }
    }

    /// Attempt budget exhausted while still processing. The orchestrator
    /// cannot prove a negative, hence the advisory.
    pub fn timed_out() -> Self {
        Self::failed(
            "Payment confirmation timed out - please contact support if money was deducted",
        )
    }

    /// Local tracking abandoned via reset. The push request already on
    /// the payer's device cannot be retracted.
    pub fn abandoned() -> Self {
        Self::failed(
            "Payment tracking abandoned - a request already sent to your phone cannot be \
             retracted and may still complete",
        )
    }
}
