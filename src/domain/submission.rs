//! Submission episode records
//!
//! A [`SubmissionEpisode`] tracks one (episode, manufacturer) pair on the
//! e-signature service. Rows are created on the first successful submission,
//! updated in place afterwards and never deleted.

use super::ids::{EpisodeId, ManufacturerId, SubmissionId};
use super::mapping::MappingResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Status of a submission on the e-signature service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    #[default]
    Pending,
    Sent,
    Viewed,
    InProgress,
    Completed,
    Expired,
    Failed,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Sent => "sent",
            SubmissionStatus::Viewed => "viewed",
            SubmissionStatus::InProgress => "in_progress",
            SubmissionStatus::Completed => "completed",
            SubmissionStatus::Expired => "expired",
            SubmissionStatus::Failed => "failed",
        }
    }

    /// Position in the signing lifecycle
    fn rank(&self) -> u8 {
        match self {
            SubmissionStatus::Pending => 0,
            SubmissionStatus::Sent => 1,
            SubmissionStatus::Viewed => 2,
            SubmissionStatus::InProgress => 3,
            SubmissionStatus::Completed | SubmissionStatus::Expired | SubmissionStatus::Failed => 4,
        }
    }

    /// No further status changes are expected
    pub fn is_terminal(&self) -> bool {
        self.rank() == 4
    }

    /// Whether moving to `next` goes forward in the lifecycle
    pub fn can_advance_to(&self, next: SubmissionStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = String;

    /// Accepts local names and the DocuSeal status vocabulary
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" | "awaiting" | "draft" => Ok(SubmissionStatus::Pending),
            "sent" => Ok(SubmissionStatus::Sent),
            "viewed" | "opened" => Ok(SubmissionStatus::Viewed),
            "in_progress" | "started" => Ok(SubmissionStatus::InProgress),
            "completed" => Ok(SubmissionStatus::Completed),
            "expired" => Ok(SubmissionStatus::Expired),
            "failed" | "declined" => Ok(SubmissionStatus::Failed),
            other => Err(format!("Unknown submission status '{other}'")),
        }
    }
}

/// Persisted submission row, unique per (episode, manufacturer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionEpisode {
    pub id: Uuid,
    pub episode_id: EpisodeId,
    pub manufacturer_id: ManufacturerId,
    pub manufacturer_name: String,
    pub template_id: String,
    /// External id; `None` until the create call succeeded
    pub submission_id: Option<SubmissionId>,
    pub status: SubmissionStatus,
    pub field_completeness: f64,
    pub required_completeness: f64,
    pub mapped_fields: BTreeMap<String, String>,
    pub validation_warnings: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub viewed_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub expired_at: Option<DateTime<Utc>>,
    pub signed_document_url: Option<String>,
    /// While set and in the future, a create call for this row is in flight
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_claimed_until: Option<DateTime<Utc>>,
}

impl SubmissionEpisode {
    /// New pending row built from a mapping result
    pub fn new(episode_id: EpisodeId, mapping: &MappingResult) -> Self {
        let now = Utc::now();
        let mut record = Self {
            id: Uuid::new_v4(),
            episode_id,
            manufacturer_id: mapping.manufacturer.id.clone(),
            manufacturer_name: mapping.manufacturer.name.clone(),
            template_id: mapping.manufacturer.template_id.clone(),
            submission_id: None,
            status: SubmissionStatus::Pending,
            field_completeness: 0.0,
            required_completeness: 0.0,
            mapped_fields: BTreeMap::new(),
            validation_warnings: Vec::new(),
            created_at: now,
            updated_at: now,
            sent_at: None,
            viewed_at: None,
            started_at: None,
            completed_at: None,
            expired_at: None,
            signed_document_url: None,
            create_claimed_until: None,
        };
        record.apply_mapping(mapping);
        record
    }

    /// Refreshes the completeness and field snapshots
    pub fn apply_mapping(&mut self, mapping: &MappingResult) {
        self.field_completeness = mapping.completeness.percentage;
        self.required_completeness = mapping.completeness.required_percentage;
        self.mapped_fields = mapping.data.clone();
        self.validation_warnings = mapping.validation.warnings.clone();
        self.template_id = mapping.manufacturer.template_id.clone();
        self.updated_at = Utc::now();
    }

    /// Sets the status and stamps the matching timestamp column
    pub fn apply_status(&mut self, status: SubmissionStatus, at: DateTime<Utc>) {
        self.status = status;
        match status {
            SubmissionStatus::Sent => self.sent_at = Some(at),
            SubmissionStatus::Viewed => self.viewed_at = Some(at),
            SubmissionStatus::InProgress => self.started_at = Some(at),
            SubmissionStatus::Completed => self.completed_at = Some(at),
            SubmissionStatus::Expired => self.expired_at = Some(at),
            SubmissionStatus::Pending | SubmissionStatus::Failed => {}
        }
        self.updated_at = Utc::now();
    }

    /// Minutes between creation and completion
    pub fn time_to_complete_minutes(&self) -> Option<f64> {
        self.completed_at
            .map(|completed| (completed - self.created_at).num_seconds() as f64 / 60.0)
            .filter(|minutes| *minutes >= 0.0)
    }
}

/// Recipient of a signing request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl Signer {
    /// Role used when the caller gives none
    pub const DEFAULT_ROLE: &'static str = "signer";

    /// Checks the required sub-fields
    pub fn validate(&self) -> Result<(), String> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err("signer email is required".to_string());
        }
        let valid_email = email
            .split_once('@')
            .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
            .unwrap_or(false);
        if !valid_email {
            return Err(format!("signer email '{email}' is not a valid address"));
        }
        if self.name.trim().is_empty() {
            return Err(format!("signer name is required for {email}"));
        }
        if let Some(ref role) = self.role {
            if role.trim().is_empty() {
                return Err(format!("signer role cannot be blank for {email}"));
            }
        }
        Ok(())
    }

    /// Role, defaulted
    pub fn role_or_default(&self) -> &str {
        self.role.as_deref().unwrap_or(Self::DEFAULT_ROLE)
    }
}
