//! E-signature service abstraction

use crate::domain::ids::{EpisodeId, SubmissionId};
use crate::domain::mapping::MappingResult;
use crate::domain::profile::ManufacturerProfile;
use crate::domain::submission::{Signer, SubmissionStatus};
use crate::domain::Result;
use async_trait::async_trait;
use serde::Serialize;

/// One prefilled form value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrefillField {
    /// Field label on the external template
    pub name: String,
    pub default_value: String,
}

/// Payload for creating or updating a remote submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionRequest {
    pub template_id: String,
    pub episode_id: EpisodeId,
    pub fields: Vec<PrefillField>,
}

impl SubmissionRequest {
    /// Builds the request from a mapping result
    ///
    /// Internal (`_`-prefixed) and empty targets are left out; names use the
    /// template label where the profile declares one.
    pub fn from_mapping(
        episode_id: EpisodeId,
        mapping: &MappingResult,
        profile: &ManufacturerProfile,
    ) -> Self {
        let fields = mapping
            .fields
            .iter()
            .filter(|m| !m.target.is_internal() && m.is_filled())
            .map(|m| PrefillField {
                name: profile
                    .field(m.target.as_str())
                    .map(|f| f.template_label().to_string())
                    .unwrap_or_else(|| m.target.as_str().to_string()),
                default_value: m.value.clone(),
            })
            .collect();

        Self {
            template_id: profile.template_id.clone(),
            episode_id,
            fields,
        }
    }
}

/// Submission as reported by the remote service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteSubmission {
    pub id: SubmissionId,

    /// Remote status, when the response carried a recognizable one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SubmissionStatus>,

    /// URL of the first signed document, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_url: Option<String>,
}

/// Operations on the external e-signature service
///
/// Implementations wrap service failures in
/// [`crate::domain::IvrError::DocuSeal`].
#[async_trait]
pub trait SignatureService: Send + Sync {
    /// Create a submission from a template with prefilled values
    ///
    /// Never retried.
    async fn create_submission(&self, request: &SubmissionRequest) -> Result<RemoteSubmission>;

    /// Replace the prefilled values of an existing submission
    ///
    /// Never retried.
    async fn update_submission(
        &self,
        submission_id: &SubmissionId,
        request: &SubmissionRequest,
    ) -> Result<RemoteSubmission>;

    /// Fetch the current state of a submission
    async fn get_submission(&self, submission_id: &SubmissionId) -> Result<RemoteSubmission>;

    /// Download the combined PDF of a submission
    async fn download_document(&self, submission_id: &SubmissionId) -> Result<Vec<u8>>;

    /// Send a submission to its signers
    ///
    /// Never retried.
    async fn send_for_signing(
        &self,
        submission_id: &SubmissionId,
        signers: &[Signer],
    ) -> Result<RemoteSubmission>;
}
