//! Submission endpoints

use super::error::ApiError;
use super::mapping::{field_bag, require_manufacturer};
use super::AppState;
use crate::adapters::esignature::RemoteSubmission;
use crate::domain::ids::{EpisodeId, SubmissionId};
use crate::domain::mapping::MappingResult;
use crate::domain::submission::{Signer, SubmissionEpisode};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct CreateSubmissionRequest {
    #[serde(default)]
    pub episode_id: Value,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub additional_data: Value,
}

#[derive(Debug, Serialize)]
pub struct CreateSubmissionResponse {
    pub success: bool,
    pub created: bool,
    pub submission: RemoteSubmission,
    pub ivr_episode: SubmissionEpisode,
    pub mapping: MappingResult,
}

fn parse_submission_id(raw: &str) -> Result<SubmissionId, ApiError> {
    SubmissionId::new(raw).map_err(ApiError::malformed)
}

/// `POST /submission/create`
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<CreateSubmissionRequest>, JsonRejection>,
) -> Result<Json<CreateSubmissionResponse>, ApiError> {
    let Json(request) = body?;
    let episode_id = EpisodeId::from_json(&request.episode_id)
        .map_err(|e| ApiError::malformed(format!("episode_id: {e}")))?;
    let manufacturer = require_manufacturer(request.manufacturer.as_deref())?;
    let additional = field_bag(&request.additional_data, "additional_data")?;

    let outcome = state
        .gateway
        .create_or_update(episode_id, manufacturer, &additional)
        .await?;

    Ok(Json(CreateSubmissionResponse {
        success: true,
        created: outcome.created,
        submission: outcome.submission,
        ivr_episode: outcome.ivr_episode,
        mapping: outcome.mapping,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    #[serde(default)]
    pub signers: Vec<Signer>,
}

/// `POST /submission/:id/send`
pub async fn send(
    State(state): State<AppState>,
    Path(submission_id): Path<String>,
    body: Result<Json<SendRequest>, JsonRejection>,
) -> Result<Json<SubmissionEpisode>, ApiError> {
    let Json(request) = body?;
    let submission_id = parse_submission_id(&submission_id)?;
    let record = state
        .gateway
        .send_for_signing(&submission_id, &request.signers)
        .await?;
    Ok(Json(record))
}

/// `POST /submission/:id/refresh`
pub async fn refresh(
    State(state): State<AppState>,
    Path(submission_id): Path<String>,
) -> Result<Json<SubmissionEpisode>, ApiError> {
    let submission_id = parse_submission_id(&submission_id)?;
    Ok(Json(state.gateway.refresh_submission(&submission_id).await?))
}

/// `GET /submission/:id/download`
pub async fn download(
    State(state): State<AppState>,
    Path(submission_id): Path<String>,
) -> Result<Response, ApiError> {
    let submission_id = parse_submission_id(&submission_id)?;
    let pdf = state.gateway.download_document(&submission_id).await?;
    let disposition = format!("attachment; filename=\"submission-{submission_id}.pdf\"");

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf,
    )
        .into_response())
}
