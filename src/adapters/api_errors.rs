use crate::domain::error::PaymentError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Newtype over the domain error so the HTTP mapping lives in the
/// adapter layer. A raw transport error never reaches the caller.
pub struct ApiError(pub PaymentError);

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self.0 {
            PaymentError::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                msg.clone(),
            ),
            PaymentError::SessionActive(reference) => (
                StatusCode::CONFLICT,
                "session_active",
                format!("a payment for '{reference}' is already awaiting confirmation"),
            ),
            PaymentError::Gateway(msg) => {
                tracing::warn!("gateway error: {msg}");
                (StatusCode::BAD_GATEWAY, "gateway_error", msg.clone())
            }
            PaymentError::Transport(err) => {
                tracing::error!("transport error: {err}");
                (
                    StatusCode::BAD_GATEWAY,
                    "transport_error",
                    "payment provider unreachable".to_string(),
                )
            }
            PaymentError::Serialization(err) => {
                tracing::error!("serialization error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error_code": error_code,
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}
