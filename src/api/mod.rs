//! HTTP API
//!
//! Routes, all behind API key authentication except `/health`:
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | POST | `/mapping/episode/:episode_id` | map one episode |
//! | GET | `/mapping/manufacturers` | manufacturer summaries |
//! | GET | `/mapping/manufacturer/:name` | one manufacturer profile |
//! | POST | `/mapping/validate` | validate caller-supplied data |
//! | POST | `/mapping/batch-map` | map many episodes |
//! | GET | `/mapping/analytics` | submission statistics |
//! | POST | `/submission/create` | create or update a submission |
//! | POST | `/submission/:id/send` | send to signers |
//! | POST | `/submission/:id/refresh` | pull the remote status |
//! | GET | `/submission/:id/download` | signed PDF |
//! | POST | `/webhooks/docuseal` | DocuSeal status callbacks |

pub mod auth;
pub mod error;
pub mod mapping;
pub mod submission;
pub mod webhook;

pub use auth::ApiAuth;
pub use error::ApiError;

use crate::config::ServerConfig;
use crate::core::analytics::AnalyticsAggregator;
use crate::core::mapping::MappingOrchestrator;
use crate::core::submission::SubmissionGateway;
use crate::domain::{IvrError, Result};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use serde_json::{json, Value};
use tokio::sync::watch;
use tower_http::cors::CorsLayer;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub mapping: MappingOrchestrator,
    pub gateway: SubmissionGateway,
    pub analytics: AnalyticsAggregator,
    pub auth: ApiAuth,
}

impl AppState {
    pub fn new(gateway: SubmissionGateway, analytics: AnalyticsAggregator, auth: ApiAuth) -> Self {
        Self {
            mapping: gateway.mapping().clone(),
            gateway,
            analytics,
            auth,
        }
    }
}

/// `GET /health`
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

/// Builds the API router
pub fn router(state: AppState, cors_permissive: bool) -> Router {
    let protected = Router::new()
        .route("/mapping/episode/:episode_id", post(mapping::map_episode))
        .route("/mapping/manufacturers", get(mapping::list_manufacturers))
        .route("/mapping/manufacturer/:name", get(mapping::get_manufacturer))
        .route("/mapping/validate", post(mapping::validate))
        .route("/mapping/batch-map", post(mapping::batch_map))
        .route("/mapping/analytics", get(mapping::analytics))
        .route("/submission/create", post(submission::create))
        .route("/submission/:id/send", post(submission::send))
        .route("/submission/:id/refresh", post(submission::refresh))
        .route("/submission/:id/download", get(submission::download))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    // the webhook checks credentials itself so it can verify signatures
    let app = Router::new()
        .route("/health", get(health))
        .route("/webhooks/docuseal", post(webhook::docuseal))
        .merge(protected)
        .with_state(state);

    if cors_permissive {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Serves the API until the shutdown signal flips to true
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn serve(
    state: AppState,
    config: &ServerConfig,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    if !state.auth.has_keys() {
        tracing::warn!("No API keys configured; every authenticated endpoint will answer 401");
    }

    let app = router(state, config.cors_permissive);
    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .map_err(|e| {
            IvrError::Connection(format!("Failed to bind {}: {e}", config.bind_address))
        })?;

    tracing::info!(bind_address = %config.bind_address, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
            tracing::info!("API server shutting down");
        })
        .await
        .map_err(|e| IvrError::Io(format!("API server failed: {e}")))
}
