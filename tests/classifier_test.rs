mod common;

use common::*;
use tiba_pay::domain::{
    session::{PaymentSession, Resolution, SessionState},
    status::{CodeTable, StatusClassification, UnknownCodePolicy},
};

// ── 1. push_code_table ─────────────────────────────────────────────────────

#[test]
fn push_code_table() {
    let table = CodeTable::mpesa();

    match table.classify(&success("QCX123")) {
        StatusClassification::Success { code, receipt } => {
            assert_eq!(code, "0");
            assert_eq!(receipt.as_deref(), Some("QCX123"));
        }
        other => panic!("expected success, got {other:?}"),
    }

    for code in ["1037", "4999", "1032", "1001"] {
        assert!(
            matches!(
                table.classify(&processing(code)),
                StatusClassification::Processing { .. }
            ),
            "code {code} must be non-terminal"
        );
    }

    for code in ["1", "2", "17", "26", "1025", "1026", "1027"] {
        assert!(
            matches!(
                table.classify(&failure(code, "declined")),
                StatusClassification::Failure { .. }
            ),
            "code {code} must be terminal"
        );
    }
}

// ── 2. unknown_codes_default_to_failure ────────────────────────────────────
// Bounded worst-case polling: a code in neither set is terminal.

#[test]
fn unknown_codes_default_to_failure() {
    let table = CodeTable::mpesa();
    for code in ["6", "999", "2001", "SDP-ERR", ""] {
        assert!(
            matches!(
                table.classify(&failure(code, "")),
                StatusClassification::Failure { .. }
            ),
            "unrecognized code {code:?} must classify as failure"
        );
    }
}

// ── 3. unknown_policy_is_injectable ────────────────────────────────────────

#[test]
fn unknown_policy_is_injectable() {
    let lenient = CodeTable::mpesa().with_unknown_policy(UnknownCodePolicy::Processing);
    assert!(matches!(
        lenient.classify(&failure("2001", "")),
        StatusClassification::Processing { .. }
    ));
    // Known terminal-by-omission behavior is unchanged for documented codes.
    assert!(matches!(
        lenient.classify(&success("QCX123")),
        StatusClassification::Success { .. }
    ));
}

// ── 4. failure_description_falls_back_to_code ──────────────────────────────

#[test]
fn failure_description_falls_back_to_code() {
    let table = CodeTable::mpesa();
    match table.classify(&failure("7777", "")) {
        StatusClassification::Failure { description, .. } => {
            assert!(description.contains("7777"), "got: {description}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

// ── 5. redirect_code_table ─────────────────────────────────────────────────

#[test]
fn redirect_code_table() {
    let table = CodeTable::pesapal();

    for word in ["COMPLETED", "SUCCESS"] {
        assert!(matches!(
            table.classify(&hosted_status(word, Some("AGJ7K9L2M1"))),
            StatusClassification::Success { .. }
        ));
    }
    // An empty status means the hosted page has not reported back yet.
    for word in ["PENDING", "PROCESSING", "INITIATED", ""] {
        assert!(matches!(
            table.classify(&hosted_status(word, None)),
            StatusClassification::Processing { .. }
        ));
    }
    for word in ["FAILED", "INVALID", "CANCELLED", "REVERSED"] {
        assert!(matches!(
            table.classify(&hosted_status(word, None)),
            StatusClassification::Failure { .. }
        ));
    }
}

// ── 6. session_transitions_are_strictly_forward ────────────────────────────

#[test]
fn session_transitions_are_strictly_forward() {
    let mut session = PaymentSession::new(
        tiba_pay::domain::id::CheckoutId::new(TEST_CHECKOUT_ID).unwrap(),
    );
    assert_eq!(session.state(), SessionState::Idle);

    session.advance(SessionState::Initiating).unwrap();
    session.advance(SessionState::AwaitingConfirmation).unwrap();
    session
        .advance(SessionState::Resolved(Resolution::Success))
        .unwrap();
    assert!(session.state().is_terminal());

    // Terminal is terminal: nothing follows Resolved.
    for next in [
        SessionState::Idle,
        SessionState::Initiating,
        SessionState::AwaitingConfirmation,
        SessionState::Resolved(Resolution::Failure),
    ] {
        let mut resolved = PaymentSession::new(
            tiba_pay::domain::id::CheckoutId::new(TEST_CHECKOUT_ID).unwrap(),
        );
        resolved.advance(SessionState::Initiating).unwrap();
        resolved.advance(SessionState::AwaitingConfirmation).unwrap();
        resolved
            .advance(SessionState::Resolved(Resolution::TimedOut))
            .unwrap();
        assert!(resolved.advance(next).is_err(), "accepted {next:?}");
    }

    // Skipping a state is rejected too.
    let mut fresh = PaymentSession::new(
        tiba_pay::domain::id::CheckoutId::new(TEST_CHECKOUT_ID).unwrap(),
    );
    assert!(fresh.advance(SessionState::AwaitingConfirmation).is_err());
}

// ── 7. attempts_accumulate_with_last_status ────────────────────────────────

#[test]
fn attempts_accumulate_with_last_status() {
    let mut session = PaymentSession::new(
        tiba_pay::domain::id::CheckoutId::new(TEST_CHECKOUT_ID).unwrap(),
    );
    let table = CodeTable::mpesa();

    session.record_attempt(Some(table.classify(&processing("1037"))));
    // A transport-level failure counts against the budget but leaves the
    // last classification in place.
    session.record_attempt(None);
    assert_eq!(session.attempts(), 2);
    assert!(matches!(
        session.last_status(),
        Some(StatusClassification::Processing { .. })
    ));
}
