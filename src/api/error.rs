//! HTTP error responses
//!
//! Every failure is rendered as `{"error": ..., "message": ...}` with the
//! status derived from the [`IvrError`] variant.

use crate::domain::IvrError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// API-level errors with HTTP status mapping
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unauthenticated")]
    Unauthenticated,

    #[error(transparent)]
    Service(#[from] IvrError),
}

impl ApiError {
    pub fn malformed(message: impl Into<String>) -> Self {
        ApiError::Service(IvrError::MalformedInput(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Service(e) => match e {
                IvrError::NotFound(_) => StatusCode::NOT_FOUND,
                IvrError::ValidationFailed { .. } | IvrError::MalformedInput(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                IvrError::Authentication(_) => StatusCode::UNAUTHORIZED,
                IvrError::UpstreamService(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::malformed(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Unauthenticated => ErrorBody {
                error: "Unauthenticated".to_string(),
                message: None,
                errors: Vec::new(),
            },
            ApiError::Service(IvrError::NotFound(message)) => ErrorBody {
                error: "Not found".to_string(),
                message: Some(message),
                errors: Vec::new(),
            },
            ApiError::Service(IvrError::ValidationFailed { errors }) => ErrorBody {
                error: "Validation failed".to_string(),
                message: Some("Mapping validation failed".to_string()),
                errors,
            },
            ApiError::Service(IvrError::MalformedInput(message)) => ErrorBody {
                error: "Malformed input".to_string(),
                message: Some(message),
                errors: Vec::new(),
            },
            ApiError::Service(IvrError::UpstreamService(detail)) => {
                tracing::error!(
                    episode_id = detail.episode_id.as_deref().unwrap_or("-"),
                    manufacturer = detail.manufacturer.as_deref().unwrap_or("-"),
                    operation = detail.operation.as_deref().unwrap_or("-"),
                    "Upstream service error"
                );
                ErrorBody {
                    error: "Upstream service error".to_string(),
                    message: Some(detail.message),
                    errors: Vec::new(),
                }
            }
            ApiError::Service(other) => {
                tracing::error!(error = %other, "API request failed");
                ErrorBody {
                    error: "Internal error".to_string(),
                    message: Some(other.to_string()),
                    errors: Vec::new(),
                }
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SubmissionErrorDetail;
    use test_case::test_case;

    #[test_case(IvrError::NotFound("x".into()), StatusCode::NOT_FOUND)]
    #[test_case(IvrError::validation_failed(vec!["x".into()]), StatusCode::UNPROCESSABLE_ENTITY)]
    #[test_case(IvrError::MalformedInput("x".into()), StatusCode::UNPROCESSABLE_ENTITY)]
    #[test_case(IvrError::Authentication("x".into()), StatusCode::UNAUTHORIZED)]
    #[test_case(IvrError::UpstreamService(SubmissionErrorDetail::new("x")), StatusCode::BAD_GATEWAY)]
    #[test_case(IvrError::Database("x".into()), StatusCode::INTERNAL_SERVER_ERROR)]
    fn test_status_mapping(error: IvrError, expected: StatusCode) {
        assert_eq!(ApiError::from(error).status(), expected);
    }

    #[test]
    fn test_unauthenticated_status() {
        let response = ApiError::Unauthenticated.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
