//! DocuSeal HTTP client
//!
//! Talks to the DocuSeal REST API with the `X-Auth-Token` header. Reads
//! (`GET /submissions/{id}`, combined document download) are retried with
//! exponential backoff on connection errors, timeouts, 429 and 5xx. Writes
//! are sent once.

use super::traits::{RemoteSubmission, SignatureService, SubmissionRequest};
use crate::config::schema::{DocuSealConfig, RetryConfig};
use crate::domain::errors::DocuSealError;
use crate::domain::ids::SubmissionId;
use crate::domain::submission::{Signer, SubmissionStatus};
use crate::domain::{IvrError, Result};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, RequestBuilder, StatusCode};
use crate::config::secret::SecretString;
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use std::time::Duration;

const AUTH_HEADER: &str = "X-Auth-Token";
const REDACTED: &str = "[redacted]";

/// DocuSeal implementation of [`SignatureService`]
pub struct DocuSealClient {
    base_url: String,
    client: Client,
    api_key: SecretString,
    retry: RetryConfig,
}

impl DocuSealClient {
    /// Create a new DocuSeal client
    ///
    /// # Errors
    ///
    /// Returns [`IvrError::Configuration`] if the HTTP client cannot be built.
    pub fn new(config: &DocuSealConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .build()
            .map_err(|e| IvrError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            api_key: config.api_key.clone(),
            retry: config.retry.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let token: &str = self.api_key.expose_secret().as_ref();
        request.header(AUTH_HEADER, token)
    }

    /// Backoff before retry `attempt` (1-based)
    fn backoff_delay(&self, attempt: usize) -> Duration {
        let factor = self
            .retry
            .backoff_multiplier
            .powi(attempt.saturating_sub(1) as i32);
        let delay_ms = (self.retry.initial_delay_ms as f64 * factor) as u64;
        Duration::from_millis(delay_ms.min(self.retry.max_delay_ms))
    }

    /// Retry an idempotent request with exponential backoff
    async fn retry_request<F, T, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<T, DocuSealError>>,
    {
        let max_retries = self.retry.max_retries;
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    attempt += 1;
                    if !e.is_retryable() || attempt > max_retries {
                        return Err(e.into());
                    }

                    let delay = self.backoff_delay(attempt);
                    tracing::warn!(
                        attempt = attempt,
                        max_retries = max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying request after error"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn send(&self, request: RequestBuilder) -> std::result::Result<reqwest::Response, DocuSealError> {
        let response = self.authorized(request).send().await.map_err(transport_error)?;
        check_status(response).await
    }

    async fn send_json(&self, request: RequestBuilder) -> std::result::Result<Value, DocuSealError> {
        self.send(request)
            .await?
            .json::<Value>()
            .await
            .map_err(|e| DocuSealError::InvalidResponse(e.to_string()))
    }
}

fn transport_error(e: reqwest::Error) -> DocuSealError {
    if e.is_timeout() {
        DocuSealError::Timeout(e.to_string())
    } else {
        DocuSealError::ConnectionFailed(e.to_string())
    }
}

async fn check_status(
    response: reqwest::Response,
) -> std::result::Result<reqwest::Response, DocuSealError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body, status);
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DocuSealError::AuthenticationFailed(message),
        StatusCode::NOT_FOUND => DocuSealError::NotFound(message),
        StatusCode::TOO_MANY_REQUESTS => DocuSealError::RateLimited(message),
        s if s.is_server_error() => DocuSealError::ServerError {
            status: s.as_u16(),
            message,
        },
        s => DocuSealError::ClientError {
            status: s.as_u16(),
            message,
        },
    })
}

/// `error` or `message` from a JSON error body, else the raw body
fn error_message(body: &str, status: StatusCode) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let field = parsed.as_ref().and_then(|v| {
        v.get("error")
            .or_else(|| v.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });
    match field {
        Some(message) => message,
        None if body.trim().is_empty() => format!("HTTP {status}"),
        None => body.trim().to_string(),
    }
}

/// Reads a submission out of a DocuSeal response
///
/// Create returns an array of submitters carrying `submission_id`; the
/// other endpoints return the submission object with `id`.
pub fn parse_submission(body: &Value) -> std::result::Result<RemoteSubmission, DocuSealError> {
    let (record, id) = match body {
        Value::Array(items) => {
            let first = items.first().ok_or_else(|| {
                DocuSealError::InvalidResponse("empty submitter list".to_string())
            })?;
            let id = first
                .get("submission_id")
                .or_else(|| first.get("id"))
                .and_then(SubmissionId::from_json);
            (first, id)
        }
        other => {
            let id = other
                .get("id")
                .or_else(|| other.get("submission_id"))
                .and_then(SubmissionId::from_json);
            (other, id)
        }
    };

    let id = id.ok_or_else(|| {
        DocuSealError::InvalidResponse("response carries no submission id".to_string())
    })?;

    let status = record
        .get("status")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<SubmissionStatus>().ok());

    let document_url = record
        .get("documents")
        .and_then(|docs| docs.get(0))
        .and_then(|doc| doc.get("url"))
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(RemoteSubmission {
        id,
        status,
        document_url,
    })
}

fn submission_body(request: &SubmissionRequest) -> Value {
    json!({
        "template_id": request.template_id,
        "send_email": false,
        "metadata": { "episode_id": request.episode_id },
        "fields": request.fields,
    })
}

/// Copy of a request body with every prefilled value replaced
pub fn sanitize_payload(payload: &Value) -> Value {
    let mut sanitized = payload.clone();
    if let Some(fields) = sanitized.get_mut("fields").and_then(Value::as_array_mut) {
        for field in fields {
            if let Some(value) = field.get_mut("default_value") {
                *value = Value::String(REDACTED.to_string());
            }
        }
    }
    if let Some(submitters) = sanitized.get_mut("submitters").and_then(Value::as_array_mut) {
        for submitter in submitters {
            for key in ["email", "name"] {
                if let Some(value) = submitter.get_mut(key) {
                    *value = Value::String(REDACTED.to_string());
                }
            }
        }
    }
    sanitized
}

#[async_trait]
impl SignatureService for DocuSealClient {
    async fn create_submission(&self, request: &SubmissionRequest) -> Result<RemoteSubmission> {
        let body = submission_body(request);
        tracing::debug!(
            episode_id = %request.episode_id,
            template_id = %request.template_id,
            payload = %sanitize_payload(&body),
            "Creating DocuSeal submission"
        );

        let response = self
            .send_json(self.client.post(self.url("/submissions")).json(&body))
            .await?;
        Ok(parse_submission(&response)?)
    }

    async fn update_submission(
        &self,
        submission_id: &SubmissionId,
        request: &SubmissionRequest,
    ) -> Result<RemoteSubmission> {
        let body = json!({
            "fields": request.fields,
            "metadata": { "episode_id": request.episode_id },
        });
        tracing::debug!(
            submission_id = %submission_id,
            payload = %sanitize_payload(&body),
            "Updating DocuSeal submission"
        );

        let url = self.url(&format!("/submissions/{submission_id}"));
        let response = self.send_json(self.client.put(url).json(&body)).await?;

        // some deployments answer updates with an empty object
        Ok(parse_submission(&response).unwrap_or_else(|_| RemoteSubmission {
            id: submission_id.clone(),
            status: None,
            document_url: None,
        }))
    }

    async fn get_submission(&self, submission_id: &SubmissionId) -> Result<RemoteSubmission> {
        let url = self.url(&format!("/submissions/{submission_id}"));
        self.retry_request(|| async {
            let response = self.send_json(self.client.get(&url)).await?;
            parse_submission(&response)
        })
        .await
    }

    async fn download_document(&self, submission_id: &SubmissionId) -> Result<Vec<u8>> {
        let url = self.url(&format!("/submissions/{submission_id}/documents/combined/pdf"));
        self.retry_request(|| async {
            let response = self.send(self.client.get(&url)).await?;
            let bytes = response
                .bytes()
                .await
                .map_err(|e| DocuSealError::InvalidResponse(e.to_string()))?;
            Ok(bytes.to_vec())
        })
        .await
    }

    async fn send_for_signing(
        &self,
        submission_id: &SubmissionId,
        signers: &[Signer],
    ) -> Result<RemoteSubmission> {
        let submitters: Vec<Value> = signers
            .iter()
            .map(|s| {
                json!({
                    "email": s.email.trim(),
                    "name": s.name.trim(),
                    "role": s.role_or_default(),
                })
            })
            .collect();
        let body = json!({ "submitters": submitters });
        tracing::debug!(
            submission_id = %submission_id,
            payload = %sanitize_payload(&body),
            "Sending DocuSeal submission for signing"
        );

        let url = self.url(&format!("/submissions/{submission_id}/send"));
        let response = self.send_json(self.client.post(url).json(&body)).await?;
        Ok(parse_submission(&response).unwrap_or_else(|_| RemoteSubmission {
            id: submission_id.clone(),
            status: Some(SubmissionStatus::Sent),
            document_url: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;
    use crate::domain::ids::EpisodeId;
    use crate::adapters::esignature::PrefillField;

    fn config(base_url: &str) -> DocuSealConfig {
        DocuSealConfig {
            base_url: base_url.to_string(),
            api_key: secret_string("test-key".to_string()),
            timeout_seconds: 5,
            connect_timeout_seconds: 5,
            webhook_secret: None,
            retry: RetryConfig {
                max_retries: 2,
                initial_delay_ms: 1,
                max_delay_ms: 5,
                backoff_multiplier: 2.0,
            },
        }
    }

    fn request() -> SubmissionRequest {
        SubmissionRequest {
            template_id: "852440".to_string(),
            episode_id: EpisodeId::new(42).unwrap(),
            fields: vec![PrefillField {
                name: "Patient Name".to_string(),
                default_value: "Jane Doe".to_string(),
            }],
        }
    }

    #[test]
    fn test_parse_submission_shapes() {
        let created = json!([{ "id": 11, "submission_id": 1879, "status": "awaiting" }]);
        let parsed = parse_submission(&created).unwrap();
        assert_eq!(parsed.id.as_str(), "1879");
        assert_eq!(parsed.status, Some(SubmissionStatus::Pending));

        let fetched = json!({
            "id": "1879",
            "status": "completed",
            "documents": [{ "url": "https://docs.example/signed.pdf" }]
        });
        let parsed = parse_submission(&fetched).unwrap();
        assert_eq!(parsed.status, Some(SubmissionStatus::Completed));
        assert_eq!(parsed.document_url.as_deref(), Some("https://docs.example/signed.pdf"));

        assert!(parse_submission(&json!([])).is_err());
        assert!(parse_submission(&json!({ "status": "sent" })).is_err());
    }

    #[test]
    fn test_sanitize_payload_hides_values() {
        let body = submission_body(&request());
        let sanitized = sanitize_payload(&body).to_string();
        assert!(!sanitized.contains("Jane Doe"));
        assert!(sanitized.contains("Patient Name"));
        assert!(sanitized.contains(REDACTED));
    }

    #[test]
    fn test_backoff_delay_is_capped() {
        let client = DocuSealClient::new(&config("http://localhost")).unwrap();
        assert_eq!(client.backoff_delay(1), Duration::from_millis(1));
        assert_eq!(client.backoff_delay(2), Duration::from_millis(2));
        assert_eq!(client.backoff_delay(10), Duration::from_millis(5));
    }

    #[tokio::test]
    async fn test_create_submission_sends_auth_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/submissions")
            .match_header("X-Auth-Token", "test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"id": 5, "submission_id": 1879, "status": "pending"}]"#)
            .expect(1)
            .create_async()
            .await;

        let client = DocuSealClient::new(&config(&server.url())).unwrap();
        let created = client.create_submission(&request()).await.unwrap();
        assert_eq!(created.id.as_str(), "1879");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/submissions")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;

        let client = DocuSealClient::new(&config(&server.url())).unwrap();
        let err = client.create_submission(&request()).await.unwrap_err();
        assert!(matches!(
            err,
            IvrError::DocuSeal(DocuSealError::ServerError { status: 503, .. })
        ));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_submission_retries_server_errors() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/submissions/1879")
            .with_status(500)
            .expect(3)
            .create_async()
            .await;

        let client = DocuSealClient::new(&config(&server.url())).unwrap();
        let err = client
            .get_submission(&SubmissionId::new("1879").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, IvrError::DocuSeal(DocuSealError::ServerError { .. })));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/submissions/404")
            .with_status(404)
            .with_body(r#"{"error": "Not found"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = DocuSealClient::new(&config(&server.url())).unwrap();
        let err = client
            .get_submission(&SubmissionId::new("404").unwrap())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_authentication_failed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/submissions/1879/send")
            .with_status(401)
            .with_body(r#"{"message": "Invalid token"}"#)
            .create_async()
            .await;

        let client = DocuSealClient::new(&config(&server.url())).unwrap();
        let signer = Signer {
            email: "dr@example.com".to_string(),
            name: "Dr Lee".to_string(),
            role: None,
        };
        let err = client
            .send_for_signing(&SubmissionId::new("1879").unwrap(), &[signer])
            .await
            .unwrap_err();
        match err {
            IvrError::DocuSeal(DocuSealError::AuthenticationFailed(message)) => {
                assert_eq!(message, "Invalid token")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_download_document_returns_bytes() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/submissions/1879/documents/combined/pdf")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body(b"%PDF-1.7".to_vec())
            .create_async()
            .await;

        let client = DocuSealClient::new(&config(&server.url())).unwrap();
        let bytes = client
            .download_document(&SubmissionId::new("1879").unwrap())
            .await
            .unwrap();
        assert_eq!(bytes, b"%PDF-1.7");
    }
}
