#![allow(dead_code)]

use std::{
    collections::VecDeque,
    future::Future,
    pin::Pin,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

use tiba_pay::domain::{
    error::PaymentError,
    gateway::{InitiateAck, PaymentGateway, ProviderStatus},
    id::CheckoutId,
    request::PaymentRequest,
    status::CodeTable,
};
use tiba_pay::services::{orchestrator::PaymentOrchestrator, poller::PollerConfig};

pub const TEST_CHECKOUT_ID: &str = "ws_CO_191220191020363925";

enum InitiateScript {
    Accept(InitiateAck),
    Reject(String),
}

/// Scripted gateway double. `initiate` answers the same way on every
/// call; statuses are consumed front-to-back, and once the script is
/// empty every further check answers with `fallback`.
pub struct MockGateway {
    script: InitiateScript,
    statuses: Mutex<VecDeque<Result<ProviderStatus, PaymentError>>>,
    fallback: Option<ProviderStatus>,
    pub initiate_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
}

impl MockGateway {
    fn with_script(script: InitiateScript) -> Self {
        Self {
            script,
            statuses: Mutex::new(VecDeque::new()),
            fallback: None,
            initiate_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
        }
    }

    pub fn accepted() -> Self {
        Self::with_script(InitiateScript::Accept(InitiateAck::Accepted {
            checkout_id: CheckoutId::new(TEST_CHECKOUT_ID).unwrap(),
            accepted_immediately: true,
            description: String::new(),
        }))
    }

    /// Provider answered 2xx but declined to queue the push.
    pub fn soft_declined(description: &str) -> Self {
        Self::with_script(InitiateScript::Accept(InitiateAck::Accepted {
            checkout_id: CheckoutId::new(TEST_CHECKOUT_ID).unwrap(),
            accepted_immediately: false,
            description: description.to_string(),
        }))
    }

    pub fn rejecting(message: &str) -> Self {
        Self::with_script(InitiateScript::Reject(message.to_string()))
    }

    pub fn redirecting(tracking_id: &str, redirect_url: &str) -> Self {
        Self::with_script(InitiateScript::Accept(InitiateAck::Redirect {
            reference: CheckoutId::new(tracking_id).unwrap(),
            redirect_url: redirect_url.to_string(),
        }))
    }

    pub fn with_statuses(
        self,
        statuses: impl IntoIterator<Item = Result<ProviderStatus, PaymentError>>,
    ) -> Self {
        Self {
            statuses: Mutex::new(statuses.into_iter().collect()),
            ..self
        }
    }

    pub fn with_fallback(mut self, status: ProviderStatus) -> Self {
        self.fallback = Some(status);
        self
    }
}

impl PaymentGateway for MockGateway {
    fn initiate(
        &self,
        _request: &tiba_pay::domain::request::ValidatedRequest,
    ) -> Pin<Box<dyn Future<Output = Result<InitiateAck, PaymentError>> + Send + '_>> {
        self.initiate_calls.fetch_add(1, Ordering::SeqCst);
        let result = match &self.script {
            InitiateScript::Accept(ack) => Ok(ack.clone()),
            InitiateScript::Reject(message) => Err(PaymentError::Gateway(message.clone())),
        };
        Box::pin(async move { result })
    }

    fn check_status(
        &self,
        _checkout_id: &CheckoutId,
    ) -> Pin<Box<dyn Future<Output = Result<ProviderStatus, PaymentError>> + Send + '_>> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .statuses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let result = match next {
            Some(scripted) => scripted,
            None => match &self.fallback {
                Some(status) => Ok(status.clone()),
                None => Err(PaymentError::Gateway("status script exhausted".into())),
            },
        };
        Box::pin(async move { result })
    }
}

// ── Status builders ────────────────────────────────────────────────────────

pub fn processing(code: &str) -> ProviderStatus {
    ProviderStatus {
        code: code.to_string(),
        description: "The transaction is being processed".to_string(),
        receipt: None,
    }
}

pub fn success(receipt: &str) -> ProviderStatus {
    ProviderStatus {
        code: "0".to_string(),
        description: "The service request is processed successfully.".to_string(),
        receipt: Some(receipt.to_string()),
    }
}

pub fn failure(code: &str, description: &str) -> ProviderStatus {
    ProviderStatus {
        code: code.to_string(),
        description: description.to_string(),
        receipt: None,
    }
}

/// Redirect-provider status words.
pub fn hosted_status(word: &str, receipt: Option<&str>) -> ProviderStatus {
    ProviderStatus {
        code: word.to_uppercase(),
        description: word.to_string(),
        receipt: receipt.map(str::to_string),
    }
}

pub fn transport_err() -> PaymentError {
    PaymentError::Transport("connection reset by peer".to_string())
}

// ── Request / orchestrator builders ────────────────────────────────────────

pub fn make_request(reference: &str) -> PaymentRequest {
    PaymentRequest {
        amount: 250.0,
        phone_number: "0712345678".to_string(),
        email: Some("patient@example.com".to_string()),
        first_name: Some("Jane".to_string()),
        last_name: Some("Wanjiku".to_string()),
        description: "Lab test booking".to_string(),
        reference: reference.to_string(),
    }
}

pub fn push_orchestrator(gateway: Arc<MockGateway>) -> PaymentOrchestrator {
    PaymentOrchestrator::new(gateway, CodeTable::mpesa(), PollerConfig::default())
}

pub fn redirect_orchestrator(gateway: Arc<MockGateway>) -> PaymentOrchestrator {
    PaymentOrchestrator::new(gateway, CodeTable::pesapal(), PollerConfig::default())
}
