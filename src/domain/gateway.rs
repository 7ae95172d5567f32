use {
    super::error::PaymentError,
    super::id::CheckoutId,
    super::request::ValidatedRequest,
    std::{future::Future, pin::Pin},
};

/// Raw provider answer to a status check, before classification.
#[derive(Debug, Clone)]
pub struct ProviderStatus {
    pub code: String,
    pub description: String,
    pub receipt: Option<String>,
}

/// What a gateway hands back after accepting an initiate call. The two
/// provider integration shapes surface through one type: push providers
/// acknowledge and are then polled, redirect providers hand the payer a
/// hosted page and are probed once the payer returns.
#[derive(Debug, Clone)]
pub enum InitiateAck {
    Accepted {
        checkout_id: CheckoutId,
        /// Whether the provider queued the push right away. A `false`
        /// here is a soft decline: nothing will ever arrive on the
        /// payer's device, so no session is worth opening.
        accepted_immediately: bool,
        description: String,
    },
    Redirect {
        reference: CheckoutId,
        redirect_url: String,
    },
}

/// Seam between orchestration and the external payment provider.
///
/// `check_status` must be idempotent: safe to call repeatedly without
/// side effects on provider state.
pub trait PaymentGateway: Send + Sync {
    fn initiate(
        &self,
        request: &ValidatedRequest,
    ) -> Pin<Box<dyn Future<Output = Result<InitiateAck, PaymentError>> + Send + '_>>;

    fn check_status(
        &self,
        checkout_id: &CheckoutId,
    ) -> Pin<Box<dyn Future<Output = Result<ProviderStatus, PaymentError>> + Send + '_>>;
}
