use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::error::PaymentError;

/// Provider-issued checkout/tracking identifier correlating an initiate
/// call with subsequent status checks. Opaque; the push provider issues
/// `ws_CO_…` values, the redirect provider a GUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckoutId(String);

impl CheckoutId {
    pub fn new(id: impl Into<String>) -> Result<Self, PaymentError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(PaymentError::Validation(
                "checkout id must not be empty".into(),
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}
