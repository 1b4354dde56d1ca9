//! DocuSeal status callbacks

use crate::domain::errors::IvrError;
use crate::domain::ids::SubmissionId;
use crate::domain::submission::SubmissionStatus;
use crate::domain::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Parsed webhook payload
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackEvent {
    pub event_type: String,
    pub submission_id: SubmissionId,
    /// When the event happened, if the payload says so
    pub occurred_at: Option<DateTime<Utc>>,
    /// URL of the first signed document
    pub document_url: Option<String>,
}

impl CallbackEvent {
    /// Reads the event type, submission id, timestamp and document URL
    ///
    /// The submission id is taken from `data.submission_id`,
    /// `data.submission.id` or `data.id`, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`IvrError::MalformedInput`] when no submission id is present.
    pub fn parse(payload: &Value) -> Result<Self> {
        let event_type = payload
            .get("event_type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();

        let data = payload.get("data").unwrap_or(&Value::Null);
        let submission_id = data
            .get("submission_id")
            .and_then(SubmissionId::from_json)
            .or_else(|| {
                data.get("submission")
                    .and_then(|s| s.get("id"))
                    .and_then(SubmissionId::from_json)
            })
            .or_else(|| data.get("id").and_then(SubmissionId::from_json))
            .ok_or_else(|| {
                IvrError::MalformedInput("No submission ID in webhook payload".to_string())
            })?;

        let occurred_at = data
            .get("completed_at")
            .filter(|_| is_completion(&event_type))
            .or_else(|| payload.get("timestamp"))
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc));

        let document_url = data
            .get("documents")
            .and_then(|docs| docs.get(0))
            .and_then(|doc| doc.get("url"))
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .map(str::to_string);

        Ok(Self {
            event_type,
            submission_id,
            occurred_at,
            document_url,
        })
    }

    /// Status the event moves the submission to
    ///
    /// # Errors
    ///
    /// Returns [`IvrError::UnknownCallback`] for unhandled event types.
    pub fn target_status(&self) -> Result<SubmissionStatus> {
        status_for_event(&self.event_type)
    }

    pub fn is_completion(&self) -> bool {
        is_completion(&self.event_type)
    }
}

fn is_completion(event_type: &str) -> bool {
    matches!(event_type, "submission.completed" | "form.completed")
}

/// Maps a DocuSeal event type to a submission status
pub fn status_for_event(event_type: &str) -> Result<SubmissionStatus> {
    if is_completion(event_type) {
        return Ok(SubmissionStatus::Completed);
    }
    match event_type {
        "submission.sent" => return Ok(SubmissionStatus::Sent),
        "submission.expired" => return Ok(SubmissionStatus::Expired),
        _ => {}
    }
    match event_type.rsplit_once('.').map(|(_, action)| action) {
        Some("viewed") => Ok(SubmissionStatus::Viewed),
        Some("started") => Ok(SubmissionStatus::InProgress),
        Some("declined") => Ok(SubmissionStatus::Failed),
        _ => Err(IvrError::UnknownCallback(format!(
            "Unhandled event type '{event_type}'"
        ))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackDisposition {
    Processed,
    Ignored,
}

/// Result of processing one callback
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallbackOutcome {
    pub status: CallbackDisposition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<SubmissionId>,
    /// Stored status after processing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_status: Option<SubmissionStatus>,
}

impl CallbackOutcome {
    pub fn processed(event: &CallbackEvent, status: SubmissionStatus) -> Self {
        Self {
            status: CallbackDisposition::Processed,
            event: Some(event.event_type.clone()),
            reason: None,
            submission_id: Some(event.submission_id.clone()),
            submission_status: Some(status),
        }
    }

    pub fn ignored(event: &CallbackEvent, reason: impl Into<String>) -> Self {
        Self {
            status: CallbackDisposition::Ignored,
            event: Some(event.event_type.clone()),
            reason: Some(reason.into()),
            submission_id: Some(event.submission_id.clone()),
            submission_status: None,
        }
    }

    pub fn is_processed(&self) -> bool {
        self.status == CallbackDisposition::Processed
    }
}
