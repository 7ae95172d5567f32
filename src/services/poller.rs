use {
    crate::domain::{
        error::PaymentError,
        gateway::PaymentGateway,
        session::{PaymentResult, PaymentSession, Resolution, SessionState},
        status::{CodeTable, StatusClassification},
    },
    std::{
        env,
        sync::atomic::{AtomicBool, Ordering},
        time::Duration,
    },
    tokio::sync::watch,
};

/// Attempt budget and spacing for the confirmation loop. Timeout is
/// enforced purely by attempt-count exhaustion — a slow network that
/// still answers within budget is never prematurely timed out.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            interval: Duration::from_secs(5),
        }
    }
}

impl PollerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: env::var("PAY_POLL_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_attempts),
            interval: env::var("PAY_POLL_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.interval),
        }
    }
}

/// Human-readable progress notification, tagged with the business
/// reference of the session it belongs to.
#[derive(Debug, Clone, Default)]
pub struct StatusUpdate {
    pub reference: String,
    pub message: String,
}

fn emit(updates: &watch::Sender<StatusUpdate>, reference: &str, message: impl Into<String>) {
    updates.send_replace(StatusUpdate {
        reference: reference.to_string(),
        message: message.into(),
    });
}

fn minutes_remaining(config: &PollerConfig, attempts: u32) -> u64 {
    let left = u64::from(config.max_attempts.saturating_sub(attempts));
    (left * config.interval.as_secs()).div_ceil(60)
}

/// Run the confirmation loop for one session until it resolves.
///
/// One attempt is in flight at a time: a new status check is only issued
/// after the previous response (or error) is fully processed. Waiting is
/// a non-blocking suspension. Transport and gateway errors from the
/// status check are absorbed as still-processing; a transient failure
/// of the confirmation channel must never be reported as a failed
/// payment, since money may later actually move.
pub async fn await_confirmation(
    gateway: &dyn PaymentGateway,
    codes: &CodeTable,
    config: &PollerConfig,
    reference: &str,
    session: &mut PaymentSession,
    updates: &watch::Sender<StatusUpdate>,
    abort: &AtomicBool,
) -> Result<PaymentResult, PaymentError> {
    while session.attempts() < config.max_attempts {
        // No wait before the very first check.
        if session.attempts() > 0 {
            tokio::time::sleep(config.interval).await;
        }

        if abort.load(Ordering::Relaxed) {
            session.advance(SessionState::Resolved(Resolution::Failure))?;
            emit(updates, reference, "Payment tracking abandoned");
            return Ok(PaymentResult::abandoned());
        }

        let raw = match gateway.check_status(session.checkout_id()).await {
            Ok(raw) => raw,
            Err(err) => {
                session.record_attempt(None);
                tracing::warn!(
                    reference,
                    attempt = session.attempts(),
                    error = %err,
                    "status check failed, treating as still processing"
                );
                emit(
                    updates,
                    reference,
                    format!(
                        "Payment processing... Please complete payment on your phone. \
                         ({}/{}) - {} min remaining",
                        session.attempts(),
                        config.max_attempts,
                        minutes_remaining(config, session.attempts()),
                    ),
                );
                continue;
            }
        };

        let classification = codes.classify(&raw);
        session.record_attempt(Some(classification.clone()));

        match classification {
            StatusClassification::Success { code, receipt } => {
                session.advance(SessionState::Resolved(Resolution::Success))?;
                tracing::info!(
                    reference,
                    %code,
                    attempts = session.attempts(),
                    "payment confirmed"
                );
                emit(updates, reference, "Payment completed successfully");
                return Ok(PaymentResult::succeeded(receipt));
            }
            StatusClassification::Failure { code, description } => {
                session.advance(SessionState::Resolved(Resolution::Failure))?;
                tracing::info!(
                    reference,
                    %code,
                    attempts = session.attempts(),
                    "payment failed"
                );
                emit(updates, reference, "Payment failed");
                return Ok(PaymentResult::failed(description));
            }
            StatusClassification::Processing { code, .. } => {
                tracing::debug!(
                    reference,
                    %code,
                    attempt = session.attempts(),
                    "still processing"
                );
                emit(
                    updates,
                    reference,
                    format!(
                        "Waiting for payment confirmation... Please check your phone and \
                         enter your M-Pesa PIN. ({}/{}) - {} min remaining",
                        session.attempts(),
                        config.max_attempts,
                        minutes_remaining(config, session.attempts()),
                    ),
                );
            }
        }
    }

    session.advance(SessionState::Resolved(Resolution::TimedOut))?;
    tracing::warn!(
        reference,
        attempts = session.attempts(),
        "attempt budget exhausted"
    );
    let result = PaymentResult::timed_out();
    emit(updates, reference, result.error.clone().unwrap_or_default());
    Ok(result)
}
