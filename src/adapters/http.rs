use {
    crate::{
        AppState,
        adapters::api_errors::ApiError,
        domain::{id::CheckoutId, request::PaymentRequest},
        services::orchestrator::{InitiateResponse, PaymentOrchestrator},
    },
    axum::{
        Json,
        extract::{Path, State},
    },
};

fn initiate_json(response: InitiateResponse) -> serde_json::Value {
    match response {
        InitiateResponse::Resolved(result) => serde_json::json!({
            "status": if result.success { "success" } else { "failed" },
            "result": result,
        }),
        InitiateResponse::Redirect {
            reference,
            redirect_url,
        } => serde_json::json!({
            "status": "redirect",
            "reference": reference,
            "redirect_url": redirect_url,
        }),
    }
}

async fn initiate(
    orchestrator: &PaymentOrchestrator,
    request: PaymentRequest,
) -> Result<Json<serde_json::Value>, ApiError> {
    tracing::Span::current().record("reference", tracing::field::display(&request.reference));
    let response = orchestrator.initiate(request).await?;
    Ok(Json(initiate_json(response)))
}

async fn check(
    orchestrator: &PaymentOrchestrator,
    raw_id: String,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = CheckoutId::new(raw_id)?;
    tracing::Span::current().record("checkout_id", tracing::field::display(&id));
    let classification = orchestrator.check(&id).await?;
    Ok(Json(serde_json::json!({
        "checkout_id": id.as_str(),
        "status": classification,
    })))
}

/// Push-mode initiate. Responds only after the confirmation loop has
/// resolved, so a client should budget for the full polling ceiling.
#[tracing::instrument(name = "stk_push", skip_all, fields(reference = tracing::field::Empty))]
pub async fn stk_push_handler(
    State(state): State<AppState>,
    Json(request): Json<PaymentRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    initiate(&state.mpesa, request).await
}

#[tracing::instrument(name = "mpesa_status", skip_all, fields(checkout_id = tracing::field::Empty))]
pub async fn mpesa_status_handler(
    State(state): State<AppState>,
    Path(checkout_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check(&state.mpesa, checkout_id).await
}

#[tracing::instrument(name = "mpesa_reset", skip_all)]
pub async fn mpesa_reset_handler(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Json<serde_json::Value> {
    let existed = state.mpesa.reset(&reference);
    Json(serde_json::json!({
        "status": if existed { "reset" } else { "not_found" },
        "note": "local tracking only; a push request already sent to the payer's device is not retracted",
    }))
}

/// Redirect-mode initiate. Returns as soon as the hosted-page URL is
/// known; confirmation happens via the status route after the payer
/// returns.
#[tracing::instrument(name = "pesapal_initiate", skip_all, fields(reference = tracing::field::Empty))]
pub async fn pesapal_initiate_handler(
    State(state): State<AppState>,
    Json(request): Json<PaymentRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    initiate(&state.pesapal, request).await
}

#[tracing::instrument(name = "pesapal_status", skip_all, fields(checkout_id = tracing::field::Empty))]
pub async fn pesapal_status_handler(
    State(state): State<AppState>,
    Path(tracking_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check(&state.pesapal, tracking_id).await
}
