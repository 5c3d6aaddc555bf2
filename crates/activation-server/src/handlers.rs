//! HTTP Handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use activation_core::{PreferenceRequest, PreferenceResponse};
use activation_payments::{validate, PaymentError};

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub stripe_configured: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>, code: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
        }),
    )
}

fn payment_error(e: &PaymentError) -> ApiError {
    let (status, code) = match e {
        PaymentError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
        PaymentError::Config(_) => (StatusCode::SERVICE_UNAVAILABLE, "PAYMENTS_DISABLED"),
        PaymentError::Stripe(_) => (StatusCode::BAD_GATEWAY, "CHECKOUT_ERROR"),
        PaymentError::Reference(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CHECKOUT_ERROR"),
    };
    api_error(status, e.user_message(), code)
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        stripe_configured: state.stripe.is_some(),
    })
}

/// Create a hosted checkout for the trial or subscription initiator
pub async fn create_preference(
    State(state): State<AppState>,
    Json(payload): Json<PreferenceRequest>,
) -> Result<Json<PreferenceResponse>, ApiError> {
    let request_id = uuid::Uuid::new_v4();
    tracing::info!(
        %request_id,
        tenant_id = %payload.tenant_id,
        plan = payload.plan_type.as_str(),
        trial = payload.is_trial,
        "Preference requested"
    );

    validate(&payload).map_err(|e| {
        tracing::warn!(%request_id, error = %e, "Preference rejected");
        payment_error(&e)
    })?;

    let stripe = state.stripe.as_ref().ok_or_else(|| {
        api_error(StatusCode::SERVICE_UNAVAILABLE, "Payments not configured", "PAYMENTS_DISABLED")
    })?;

    let preference = stripe.create_preference(&payload).await.map_err(|e| {
        tracing::error!(%request_id, error = %e, "Checkout error");
        payment_error(&e)
    })?;

    Ok(Json(preference))
}
