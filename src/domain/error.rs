use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("gateway: {0}")]
    Gateway(String),

    #[error("transport: {0}")]
    Transport(String),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("a payment for '{0}' is already awaiting confirmation")]
    SessionActive(String),
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        // Drop the URL, keep the failure mode. Full detail goes to the
        // log at the call site, not to callers.
        Self::Transport(err.without_url().to_string())
    }
}
