//! Remote ML field prediction
//!
//! [`RemotePredictor`] asks an external model service to rank source keys
//! for a target. Transport failures, malformed answers and predictions
//! below the confidence threshold fall back to the local
//! [`HeuristicPredictor`].

use crate::config::MlConfig;
use crate::core::matching::predictor::MAX_INEXACT_CONFIDENCE;
use crate::core::matching::{FieldPredictor, HeuristicPredictor, Prediction};
use crate::domain::field::FieldKey;
use crate::domain::mapping::{Candidate, ResolutionMethod};
use crate::domain::{IvrError, Result};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

const DOCUMENT_TYPE: &str = "ivr";

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    target_field: &'a str,
    source_fields: Vec<&'a str>,
    document_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predicted_field: Option<String>,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    alternative_suggestions: Vec<ScoredField>,
    #[serde(default)]
    model_used: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScoredField {
    field: String,
    confidence: f64,
}

/// Predictor backed by the ML service
pub struct RemotePredictor {
    client: Client,
    endpoint: String,
    confidence_threshold: f64,
    max_alternatives: usize,
    fallback: HeuristicPredictor,
}

impl RemotePredictor {
    /// # Errors
    ///
    /// Returns [`IvrError::Configuration`] without a base URL or when the
    /// HTTP client cannot be built.
    pub fn new(
        config: &MlConfig,
        fallback: HeuristicPredictor,
        max_alternatives: usize,
    ) -> Result<Self> {
        let base_url = config
            .base_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| IvrError::Configuration("ml.base_url is required".to_string()))?;

        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| IvrError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/predict", base_url.trim_end_matches('/')),
            confidence_threshold: config.confidence_threshold,
            max_alternatives,
            fallback,
        })
    }

    async fn remote_rank(&self, sources: &[FieldKey], target: &FieldKey) -> Result<Prediction> {
        let request = PredictRequest {
            target_field: target.as_str(),
            source_fields: sources.iter().map(FieldKey::as_str).collect(),
            document_type: DOCUMENT_TYPE,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| IvrError::Connection(format!("ML service unreachable: {e}")))?;

        if !response.status().is_success() {
            return Err(IvrError::Connection(format!(
                "ML service returned HTTP {}",
                response.status()
            )));
        }

        let body: PredictResponse = response
            .json()
            .await
            .map_err(|e| IvrError::Serialization(format!("Invalid ML response: {e}")))?;

        tracing::debug!(
            target = %target,
            model = body.model_used.as_deref().unwrap_or("unknown"),
            "ML prediction received"
        );

        let best = body.predicted_field.map(|field| ScoredField {
            field,
            confidence: body.confidence,
        });

        // the model may only choose among the offered keys
        let offered: BTreeSet<&str> = sources.iter().map(FieldKey::as_str).collect();
        let candidates = best
            .into_iter()
            .chain(body.alternative_suggestions)
            .filter(|p| offered.contains(p.field.as_str()) && p.confidence.is_finite())
            .filter_map(|p| {
                FieldKey::new(p.field)
                    .ok()
                    .map(|key| Candidate::new(key, p.confidence.clamp(0.0, MAX_INEXACT_CONFIDENCE)))
            })
            .collect();

        Ok(Prediction::from_ranked(
            candidates,
            ResolutionMethod::Predicted,
            self.max_alternatives,
        ))
    }
}

#[async_trait]
impl FieldPredictor for RemotePredictor {
    async fn predict(&self, sources: &[FieldKey], target: &FieldKey) -> Result<Prediction> {
        match self.remote_rank(sources, target).await {
            Ok(prediction)
                if prediction
                    .best
                    .as_ref()
                    .is_some_and(|best| best.confidence >= self.confidence_threshold) =>
            {
                Ok(prediction)
            }
            Ok(_) => {
                tracing::debug!(target = %target, "ML prediction below threshold, using heuristics");
                Ok(self.fallback.rank(sources, target))
            }
            Err(e) => {
                tracing::warn!(target = %target, error = %e, "ML prediction failed, using heuristics");
                Ok(self.fallback.rank(sources, target))
            }
        }
    }

    fn name(&self) -> &'static str {
        "ml"
    }
}

/// Predictor for the configured backend
///
/// # Errors
///
/// Returns an error if the ML service is enabled but misconfigured.
pub fn create_predictor(
    config: &MlConfig,
    heuristic: HeuristicPredictor,
    max_alternatives: usize,
) -> Result<Arc<dyn FieldPredictor>> {
    if config.enabled {
        tracing::info!("Using ML field predictor");
        Ok(Arc::new(RemotePredictor::new(config, heuristic, max_alternatives)?))
    } else {
        Ok(Arc::new(heuristic))
    }
}
