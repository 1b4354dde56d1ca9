//! Mapping endpoints

use super::error::ApiError;
use super::AppState;
use crate::core::analytics::{AnalyticsQuery, AnalyticsReport};
use crate::core::batch::BatchOutcome;
use crate::domain::field::SourceFieldBag;
use crate::domain::ids::EpisodeId;
use crate::domain::mapping::{Completeness, FieldMapping, MappingResult, ValidationReport};
use crate::domain::profile::{ManufacturerDetail, ManufacturerSummary};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
pub struct MapEpisodeRequest {
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub additional_data: Value,
}

#[derive(Debug, Serialize)]
pub struct MappingMetadata {
    pub episode_id: Option<EpisodeId>,
    pub mapped_at: DateTime<Utc>,
    pub field_mappings: Vec<FieldMapping>,
    pub unmatched_targets: Vec<String>,
    pub unmatched_sources: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MapEpisodeResponse {
    pub data: BTreeMap<String, String>,
    pub validation: ValidationReport,
    pub manufacturer: ManufacturerSummary,
    pub completeness: Completeness,
    pub metadata: MappingMetadata,
}

impl From<MappingResult> for MapEpisodeResponse {
    fn from(result: MappingResult) -> Self {
        Self {
            data: result.data,
            validation: result.validation,
            manufacturer: result.manufacturer,
            completeness: result.completeness,
            metadata: MappingMetadata {
                episode_id: result.episode_id,
                mapped_at: result.mapped_at,
                field_mappings: result.fields,
                unmatched_targets: result
                    .unmatched_targets
                    .into_iter()
                    .map(String::from)
                    .collect(),
                unmatched_sources: result
                    .unmatched_sources
                    .into_iter()
                    .map(String::from)
                    .collect(),
            },
        }
    }
}

/// Non-blank manufacturer parameter
pub(crate) fn require_manufacturer(manufacturer: Option<&str>) -> Result<&str, ApiError> {
    manufacturer
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ApiError::malformed("manufacturer is required"))
}

pub(crate) fn parse_episode_path(raw: &str) -> Result<EpisodeId, ApiError> {
    raw.parse::<EpisodeId>()
        .map_err(|e| ApiError::malformed(format!("Invalid episode id '{raw}': {e}")))
}

pub(crate) fn field_bag(value: &Value, name: &str) -> Result<SourceFieldBag, ApiError> {
    SourceFieldBag::from_json_object(value).map_err(|e| ApiError::malformed(format!("{name}: {e}")))
}

/// `POST /mapping/episode/:episode_id`
pub async fn map_episode(
    State(state): State<AppState>,
    Path(episode_id): Path<String>,
    body: Result<Json<MapEpisodeRequest>, JsonRejection>,
) -> Result<Json<MapEpisodeResponse>, ApiError> {
    let Json(request) = body?;
    let episode_id = parse_episode_path(&episode_id)?;
    let manufacturer = require_manufacturer(request.manufacturer.as_deref())?;
    let additional = field_bag(&request.additional_data, "additional_data")?;

    let result = state
        .mapping
        .map_episode(episode_id, manufacturer, &additional)
        .await?;
    Ok(Json(result.into()))
}

/// `GET /mapping/manufacturers`
pub async fn list_manufacturers(State(state): State<AppState>) -> Json<Vec<ManufacturerSummary>> {
    Json(state.mapping.catalog().list())
}

/// `GET /mapping/manufacturer/:name`
pub async fn get_manufacturer(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ManufacturerDetail>, Response> {
    match state.mapping.catalog().get(&name) {
        Ok(profile) => Ok(Json(profile.detail())),
        Err(e) if e.is_not_found() => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Manufacturer not found" })),
        )
            .into_response()),
        Err(e) => Err(ApiError::from(e).into_response()),
    }
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub data: Value,
}

/// `POST /mapping/validate`
pub async fn validate(
    State(state): State<AppState>,
    body: Result<Json<ValidateRequest>, JsonRejection>,
) -> Result<Json<ValidationReport>, ApiError> {
    let Json(request) = body?;
    let manufacturer = require_manufacturer(request.manufacturer.as_deref())?;
    let data = field_bag(&request.data, "data")?;

    let result = state.mapping.validate_data(manufacturer, &data).await?;
    Ok(Json(result.validation))
}

#[derive(Debug, Deserialize)]
pub struct BatchMapRequest {
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub episode_ids: Vec<Value>,
}

/// Parses a list of JSON episode ids, rejecting the whole list on any bad entry
pub(crate) fn parse_episode_ids(values: &[Value]) -> Result<Vec<EpisodeId>, ApiError> {
    if values.is_empty() {
        return Err(ApiError::malformed("episode_ids must not be empty"));
    }
    values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            EpisodeId::from_json(value)
                .map_err(|e| ApiError::malformed(format!("episode_ids[{index}]: {e}")))
        })
        .collect()
}

/// `POST /mapping/batch-map`
pub async fn batch_map(
    State(state): State<AppState>,
    body: Result<Json<BatchMapRequest>, JsonRejection>,
) -> Result<Json<BatchOutcome<MapEpisodeResponse>>, ApiError> {
    let Json(request) = body?;
    let manufacturer = require_manufacturer(request.manufacturer.as_deref())?;
    let episode_ids = parse_episode_ids(&request.episode_ids)?;

    let outcome = state.mapping.map_batch(&episode_ids, manufacturer).await?;
    Ok(Json(outcome.map(MapEpisodeResponse::from)))
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsParams {
    pub manufacturer: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// `GET /mapping/analytics`
pub async fn analytics(
    State(state): State<AppState>,
    Query(params): Query<AnalyticsParams>,
) -> Result<Json<AnalyticsReport>, ApiError> {
    let query = AnalyticsQuery::parse(
        params.manufacturer.as_deref(),
        params.start_date.as_deref(),
        params.end_date.as_deref(),
    )?;
    Ok(Json(state.analytics.generate(&query).await?))
}
