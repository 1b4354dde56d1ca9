//! DocuSeal webhook endpoint

use super::error::ApiError;
use super::AppState;
use crate::core::submission::CallbackOutcome;
use crate::domain::IvrError;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};

/// `POST /webhooks/docuseal`
///
/// Accepted with an API key or a valid signature. Once accepted the answer
/// is always 200: `processed`, `ignored`, or `error` when the callback could
/// not be applied.
pub async fn docuseal(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    if !state.auth.is_authorized(&headers) && !state.auth.verify_signature(&headers, &body) {
        tracing::warn!("Webhook rejected: no valid API key or signature");
        return Err(ApiError::Unauthenticated);
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(error = %e, "Webhook body is not JSON");
            return Ok(Json(ignored("Invalid JSON payload")));
        }
    };

    match state.gateway.process_callback(&payload).await {
        Ok(outcome) => Ok(Json(outcome_json(&outcome)?)),
        Err(IvrError::MalformedInput(message)) => {
            tracing::warn!(reason = %message, "Webhook payload ignored");
            Ok(Json(ignored(&message)))
        }
        Err(e) => {
            crate::log_error_with_context!(e, "docuseal webhook");
            Ok(Json(json!({
                "status": "error",
                "message": "Callback could not be processed"
            })))
        }
    }
}

fn ignored(reason: &str) -> Value {
    json!({ "status": "ignored", "reason": reason })
}

fn outcome_json(outcome: &CallbackOutcome) -> Result<Value, ApiError> {
    serde_json::to_value(outcome).map_err(|e| ApiError::from(IvrError::from(e)))
}
