//! API key authentication and webhook signatures
//!
//! Every endpoint except `/health` requires a configured API key, sent as
//! `X-API-Key: <key>` or `Authorization: Bearer <key>`. The DocuSeal
//! webhook is also accepted with a valid `X-DocuSeal-Signature`: the hex
//! HMAC-SHA256 of the raw body under the webhook secret, optionally
//! prefixed with `sha256=`.

use super::error::ApiError;
use super::AppState;
use crate::config::SecretString;
use crate::domain::{IvrError, Result};
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use sha2::Sha256;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const SIGNATURE_HEADER: &str = "x-docuseal-signature";

type HmacSha256 = Hmac<Sha256>;

/// Credentials accepted by the API
#[derive(Clone, Default)]
pub struct ApiAuth {
    api_keys: Vec<SecretString>,
    webhook_secret: Option<SecretString>,
}

impl ApiAuth {
    pub fn new(api_keys: Vec<SecretString>, webhook_secret: Option<SecretString>) -> Self {
        Self {
            api_keys,
            webhook_secret,
        }
    }

    pub fn has_keys(&self) -> bool {
        !self.api_keys.is_empty()
    }

    /// Whether the headers carry a configured API key
    pub fn is_authorized(&self, headers: &HeaderMap) -> bool {
        match presented_key(headers) {
            Some(candidate) => self
                .api_keys
                .iter()
                .any(|key| key.expose_secret().matches(candidate)),
            None => false,
        }
    }

    /// Whether the body is signed with the webhook secret
    pub fn verify_signature(&self, headers: &HeaderMap, body: &[u8]) -> bool {
        let Some(secret) = self.webhook_secret.as_ref() else {
            return false;
        };
        let Some(signature) = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
        else {
            return false;
        };
        let signature = signature.strip_prefix("sha256=").unwrap_or(signature);
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };

        let key: &str = secret.expose_secret().as_ref();
        let Ok(mut mac) = HmacSha256::new_from_slice(key.as_bytes()) else {
            return false;
        };
        mac.update(body);
        mac.verify_slice(&expected).is_ok()
    }
}

fn presented_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get(axum::http::header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
        })
        .map(str::trim)
        .filter(|key| !key.is_empty())
}

/// Rejects requests without a valid API key
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> std::result::Result<Response, ApiError> {
    if !state.auth.is_authorized(request.headers()) {
        tracing::warn!(
            method = %request.method(),
            path = %request.uri().path(),
            "Unauthenticated request rejected"
        );
        return Err(ApiError::Unauthenticated);
    }
    Ok(next.run(request).await)
}

/// Hex HMAC-SHA256 signature of a body
///
/// # Errors
///
/// Returns [`IvrError::Configuration`] if the secret is rejected as a key.
pub fn sign(secret: &str, body: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| IvrError::Configuration(format!("Invalid webhook secret: {e}")))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}
