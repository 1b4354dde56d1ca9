//! Submission gateway
//!
//! Turns mapping results into DocuSeal submissions and keeps the local
//! submission record for each (episode, manufacturer) pair in step with the
//! remote state.
//!
//! - **create or update**: one record and one remote submission per pair;
//!   resubmitting updates both
//! - **callbacks**: webhook events advance the record's status
//! - **signing**: send a submission to its signers, refresh it, download
//!   the signed document
//!
//! Work on the same pair is serialized by [`PairLocks`]. Across processes the
//! pair is claimed in the store before DocuSeal is asked to create anything:
//! the row is inserted first without an external id, and only the claim
//! holder calls create.

pub mod callback;
pub mod locks;

pub use callback::{CallbackDisposition, CallbackEvent, CallbackOutcome};
pub use locks::PairLocks;

use crate::adapters::esignature::{RemoteSubmission, SignatureService, SubmissionRequest};
use crate::adapters::storage::{InsertOutcome, SubmissionStore};
use crate::core::batch::{run_batch, BatchOutcome};
use crate::core::mapping::MappingOrchestrator;
use crate::domain::errors::{IvrError, SubmissionErrorDetail};
use crate::domain::field::SourceFieldBag;
use crate::domain::ids::{EpisodeId, ManufacturerId, SubmissionId};
use crate::domain::mapping::{MappingPurpose, MappingResult};
use crate::domain::submission::{Signer, SubmissionEpisode, SubmissionStatus};
use crate::domain::Result;
use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Result of [`SubmissionGateway::create_or_update`]
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    pub submission: RemoteSubmission,
    pub ivr_episode: SubmissionEpisode,
    pub mapping: MappingResult,
    /// False when an existing submission was updated
    pub created: bool,
}

/// How long a create claim blocks other creators by default
const DEFAULT_CREATE_LEASE_SECONDS: i64 = 120;

/// Orchestrates e-signature submissions
#[derive(Clone)]
pub struct SubmissionGateway {
    mapping: MappingOrchestrator,
    signatures: Arc<dyn SignatureService>,
    submissions: Arc<dyn SubmissionStore>,
    locks: Arc<PairLocks>,
    create_lease: Duration,
}

impl SubmissionGateway {
    pub fn new(
        mapping: MappingOrchestrator,
        signatures: Arc<dyn SignatureService>,
        submissions: Arc<dyn SubmissionStore>,
    ) -> Self {
        Self {
            mapping,
            signatures,
            submissions,
            locks: Arc::new(PairLocks::new()),
            create_lease: Duration::seconds(DEFAULT_CREATE_LEASE_SECONDS),
        }
    }

    /// Sets how long an unfinished create keeps other creators away
    ///
    /// Should exceed the DocuSeal request timeout.
    pub fn with_create_lease(mut self, lease: std::time::Duration) -> Self {
        self.create_lease = Duration::from_std(lease)
            .unwrap_or_else(|_| Duration::seconds(DEFAULT_CREATE_LEASE_SECONDS));
        self
    }

    pub fn mapping(&self) -> &MappingOrchestrator {
        &self.mapping
    }

    /// Map an episode and create or update its DocuSeal submission
    ///
    /// # Errors
    ///
    /// - [`IvrError::NotFound`] for an unknown manufacturer or episode
    /// - [`IvrError::ValidationFailed`] when the mapping is not valid; no
    ///   remote call is made
    /// - [`IvrError::UpstreamService`] when DocuSeal rejects the request
    pub async fn create_or_update(
        &self,
        episode_id: EpisodeId,
        manufacturer: &str,
        additional: &SourceFieldBag,
    ) -> Result<SubmissionOutcome> {
        let profile = self.mapping.catalog().get(manufacturer)?;
        let _guard = self.locks.acquire(episode_id, &profile.id).await;

        let mapping = self
            .mapping
            .map_episode_for(
                episode_id,
                profile.id.as_str(),
                additional,
                MappingPurpose::SubmissionPrep,
            )
            .await?;

        if !mapping.validation.valid {
            tracing::warn!(
                episode_id = %episode_id,
                manufacturer = %profile.id,
                errors = mapping.validation.errors.len(),
                "Mapping validation failed, submission not sent"
            );
            return Err(IvrError::validation_failed(mapping.validation.errors.clone()));
        }

        let request = SubmissionRequest::from_mapping(episode_id, &mapping, &profile);

        let record = match self.submissions.find_by_pair(episode_id, &profile.id).await? {
            Some(record) => match record.submission_id.clone() {
                Some(submission_id) => {
                    return self
                        .update_existing(record, submission_id, &request, mapping)
                        .await;
                }
                // left by a create that failed or is still running elsewhere
                None => self.claim_unsent(record).await?,
            },
            None => {
                let mut placeholder = SubmissionEpisode::new(episode_id, &mapping);
                placeholder.create_claimed_until = Some(Utc::now() + self.create_lease);
                match self.submissions.insert(placeholder).await? {
                    InsertOutcome::Inserted(record) => record,
                    InsertOutcome::Conflict(winner) => {
                        tracing::debug!(
                            episode_id = %episode_id,
                            manufacturer = %profile.id,
                            "Submission row already claimed by a concurrent request"
                        );
                        match winner.submission_id.clone() {
                            Some(submission_id) => {
                                return self
                                    .update_existing(winner, submission_id, &request, mapping)
                                    .await;
                            }
                            None => self.claim_unsent(winner).await?,
                        }
                    }
                }
            }
        };

        self.create_claimed(record, &request, mapping).await
    }

    /// Takes over the create of a row without an external id
    async fn claim_unsent(&self, mut record: SubmissionEpisode) -> Result<SubmissionEpisode> {
        let now = Utc::now();
        let until = now + self.create_lease;
        if !self.submissions.claim_create(record.id, until, now).await? {
            tracing::warn!(
                episode_id = %record.episode_id,
                manufacturer = %record.manufacturer_id,
                "Submission create already in progress"
            );
            let detail = SubmissionErrorDetail::new(format!(
                "Submission for episode {} is already being created",
                record.episode_id
            ))
            .with_episode_id(record.episode_id.to_string())
            .with_manufacturer(record.manufacturer_id.as_str())
            .with_operation("create")
            .retryable();
            return Err(IvrError::UpstreamService(detail));
        }
        record.create_claimed_until = Some(until);
        record.updated_at = now;
        Ok(record)
    }

    /// Calls DocuSeal create for a claimed row and attaches the external id
    ///
    /// A failed create releases the claim and leaves the row unsent.
    async fn create_claimed(
        &self,
        mut record: SubmissionEpisode,
        request: &SubmissionRequest,
        mapping: MappingResult,
    ) -> Result<SubmissionOutcome> {
        let remote = match self.signatures.create_submission(request).await {
            Ok(remote) => remote,
            Err(e) => {
                record.create_claimed_until = None;
                if let Err(release) = self.submissions.update(&record).await {
                    tracing::warn!(
                        episode_id = %record.episode_id,
                        manufacturer = %record.manufacturer_id,
                        error = %release,
                        "Failed to release submission create claim"
                    );
                }
                return Err(upstream_error(
                    e,
                    record.episode_id,
                    &record.manufacturer_id,
                    "create",
                ));
            }
        };

        tracing::info!(
            episode_id = %record.episode_id,
            manufacturer = %record.manufacturer_id,
            submission_id = %remote.id,
            "DocuSeal submission created"
        );

        record.apply_mapping(&mapping);
        record.submission_id = Some(remote.id.clone());
        record.status = SubmissionStatus::Pending;
        record.create_claimed_until = None;
        self.submissions.update(&record).await?;

        Ok(SubmissionOutcome {
            submission: remote,
            ivr_episode: record,
            mapping,
            created: true,
        })
    }

    async fn update_existing(
        &self,
        mut record: SubmissionEpisode,
        submission_id: SubmissionId,
        request: &SubmissionRequest,
        mapping: MappingResult,
    ) -> Result<SubmissionOutcome> {
        let remote = self
            .signatures
            .update_submission(&submission_id, request)
            .await
            .map_err(|e| {
                upstream_error(e, record.episode_id, &record.manufacturer_id, "update")
            })?;

        record.apply_mapping(&mapping);
        apply_remote_state(&mut record, &remote);
        self.submissions.update(&record).await?;

        tracing::info!(
            episode_id = %record.episode_id,
            manufacturer = %record.manufacturer_id,
            submission_id = %submission_id,
            status = %record.status,
            "DocuSeal submission updated"
        );

        Ok(SubmissionOutcome {
            submission: remote,
            ivr_episode: record,
            mapping,
            created: false,
        })
    }

    /// Apply a DocuSeal webhook payload to the stored record
    ///
    /// Unknown submissions, unhandled events and non-completion events for
    /// finished submissions are ignored without changes.
    ///
    /// # Errors
    ///
    /// Returns [`IvrError::MalformedInput`] when the payload has no
    /// submission id, or a storage error.
    pub async fn process_callback(&self, payload: &Value) -> Result<CallbackOutcome> {
        let event = CallbackEvent::parse(payload)?;

        let Some(record) = self
            .submissions
            .find_by_submission_id(&event.submission_id)
            .await?
        else {
            tracing::warn!(
                submission_id = %event.submission_id,
                event = %event.event_type,
                "Received webhook for unknown submission"
            );
            return Ok(CallbackOutcome::ignored(&event, "Unknown submission"));
        };

        let status = match event.target_status() {
            Ok(status) => status,
            Err(e) => {
                tracing::info!(
                    submission_id = %event.submission_id,
                    error = %e,
                    "Unhandled DocuSeal webhook event"
                );
                return Ok(CallbackOutcome::ignored(&event, "Unhandled event"));
            }
        };

        let _guard = self
            .locks
            .acquire(record.episode_id, &record.manufacturer_id)
            .await;
        // re-read so writes made while waiting for the lock are kept
        let Some(mut record) = self
            .submissions
            .find_by_submission_id(&event.submission_id)
            .await?
        else {
            return Ok(CallbackOutcome::ignored(&event, "Unknown submission"));
        };

        if record.status.is_terminal() && !event.is_completion() {
            tracing::info!(
                submission_id = %event.submission_id,
                event = %event.event_type,
                status = %record.status,
                "Ignoring event for finished submission"
            );
            return Ok(CallbackOutcome::ignored(&event, "Submission already finalized"));
        }

        let at = event.occurred_at.unwrap_or_else(Utc::now);
        if status == SubmissionStatus::Completed
            || record.status.can_advance_to(status)
        {
            record.apply_status(status, at);
        } else {
            // late event: keep the later status, record when it happened
            let current = record.status;
            record.apply_status(status, at);
            record.status = current;
        }
        if let Some(url) = &event.document_url {
            record.signed_document_url = Some(url.clone());
        }
        self.submissions.update(&record).await?;

        tracing::info!(
            episode_id = %record.episode_id,
            manufacturer = %record.manufacturer_id,
            submission_id = %event.submission_id,
            event = %event.event_type,
            status = %record.status,
            "DocuSeal webhook processed"
        );
        Ok(CallbackOutcome::processed(&event, record.status))
    }

    /// Create or update submissions for many episodes
    ///
    /// # Errors
    ///
    /// Returns [`IvrError::NotFound`] only when the manufacturer is unknown;
    /// per-episode failures are recorded in the outcome.
    pub async fn batch_process(
        &self,
        episode_ids: &[EpisodeId],
        manufacturer: &str,
    ) -> Result<BatchOutcome<SubmissionOutcome>> {
        let profile = self.mapping.catalog().get(manufacturer)?;
        let empty = SourceFieldBag::new();

        let outcome = run_batch(
            episode_ids,
            self.mapping.batch_concurrency(),
            |episode_id| {
                let manufacturer = profile.id.as_str();
                let empty = &empty;
                async move { self.create_or_update(episode_id, manufacturer, empty).await }
            },
        )
        .await;
        Ok(outcome)
    }

    /// Send a submission to its signers
    ///
    /// # Errors
    ///
    /// - [`IvrError::MalformedInput`] for no signers, an invalid signer or a
    ///   finished submission
    /// - [`IvrError::NotFound`] for a submission that is not on file
    /// - [`IvrError::UpstreamService`] when DocuSeal rejects the request
    pub async fn send_for_signing(
        &self,
        submission_id: &SubmissionId,
        signers: &[Signer],
    ) -> Result<SubmissionEpisode> {
        if signers.is_empty() {
            return Err(IvrError::MalformedInput(
                "At least one signer is required".to_string(),
            ));
        }
        for (index, signer) in signers.iter().enumerate() {
            signer
                .validate()
                .map_err(|e| IvrError::MalformedInput(format!("signers[{index}]: {e}")))?;
        }

        let record = self.find(submission_id).await?;
        let _guard = self
            .locks
            .acquire(record.episode_id, &record.manufacturer_id)
            .await;
        let mut record = self.find(submission_id).await?;

        if record.status.is_terminal() {
            return Err(IvrError::MalformedInput(format!(
                "Submission {submission_id} is already {}",
                record.status
            )));
        }

        self.signatures
            .send_for_signing(submission_id, signers)
            .await
            .map_err(|e| {
                upstream_error(e, record.episode_id, &record.manufacturer_id, "send")
            })?;

        let now = Utc::now();
        if record.status.can_advance_to(SubmissionStatus::Sent) {
            record.apply_status(SubmissionStatus::Sent, now);
        } else {
            record.sent_at = Some(now);
            record.updated_at = now;
        }
        self.submissions.update(&record).await?;

        tracing::info!(
            episode_id = %record.episode_id,
            manufacturer = %record.manufacturer_id,
            submission_id = %submission_id,
            signers = signers.len(),
            "Submission sent for signing"
        );
        Ok(record)
    }

    /// Fetch the remote state and fold it into the stored record
    ///
    /// # Errors
    ///
    /// - [`IvrError::NotFound`] for a submission that is not on file
    /// - [`IvrError::UpstreamService`] when DocuSeal cannot be read
    pub async fn refresh_submission(&self, submission_id: &SubmissionId) -> Result<SubmissionEpisode> {
        let record = self.find(submission_id).await?;
        let _guard = self
            .locks
            .acquire(record.episode_id, &record.manufacturer_id)
            .await;
        let mut record = self.find(submission_id).await?;

        let remote = self
            .signatures
            .get_submission(submission_id)
            .await
            .map_err(|e| {
                upstream_error(e, record.episode_id, &record.manufacturer_id, "refresh")
            })?;

        if apply_remote_state(&mut record, &remote) {
            self.submissions.update(&record).await?;
        }
        Ok(record)
    }

    /// Combined PDF of a submission
    ///
    /// # Errors
    ///
    /// - [`IvrError::NotFound`] for a submission that is not on file
    /// - [`IvrError::UpstreamService`] when the download fails
    pub async fn download_document(&self, submission_id: &SubmissionId) -> Result<Vec<u8>> {
        let record = self.find(submission_id).await?;
        self.signatures
            .download_document(submission_id)
            .await
            .map_err(|e| {
                upstream_error(e, record.episode_id, &record.manufacturer_id, "download")
            })
    }

    /// Stored record for an external submission id
    ///
    /// # Errors
    ///
    /// Returns [`IvrError::NotFound`] if no record carries the id.
    pub async fn find(&self, submission_id: &SubmissionId) -> Result<SubmissionEpisode> {
        self.submissions
            .find_by_submission_id(submission_id)
            .await?
            .ok_or_else(|| IvrError::NotFound(format!("Submission {submission_id} not found")))
    }
}

/// Folds a remote status and document URL into the record
///
/// Returns true when anything changed.
fn apply_remote_state(record: &mut SubmissionEpisode, remote: &RemoteSubmission) -> bool {
    let mut changed = false;
    if let Some(status) = remote.status {
        if record.status.can_advance_to(status) {
            record.apply_status(status, Utc::now());
            changed = true;
        }
    }
    if let Some(url) = &remote.document_url {
        if record.signed_document_url.as_deref() != Some(url.as_str()) {
            record.signed_document_url = Some(url.clone());
            changed = true;
        }
    }
    changed
}

/// Wraps a DocuSeal failure with the submission's context
fn upstream_error(
    error: IvrError,
    episode_id: EpisodeId,
    manufacturer_id: &ManufacturerId,
    operation: &str,
) -> IvrError {
    tracing::error!(
        episode_id = %episode_id,
        manufacturer = %manufacturer_id,
        operation = operation,
        error = %error,
        "Submission operation failed"
    );

    let retryable = matches!(&error, IvrError::DocuSeal(e) if e.is_retryable());
    let mut detail = SubmissionErrorDetail::new(error.to_string())
        .with_episode_id(episode_id.to_string())
        .with_manufacturer(manufacturer_id.as_str())
        .with_operation(operation);
    if retryable {
        detail = detail.retryable();
    }
    IvrError::UpstreamService(detail)
}
