//! Storage abstraction traits
//!
//! This module defines the traits that storage adapters must implement to
//! persist submission episodes and the mapping log.

use crate::domain::ids::{EpisodeId, ManufacturerId, SubmissionId};
use crate::domain::mapping::MappingLogEntry;
use crate::domain::submission::SubmissionEpisode;
use crate::domain::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// Result of inserting a submission episode
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// The row was stored as given
    Inserted(SubmissionEpisode),

    /// Another row for the same (episode, manufacturer) pair already exists;
    /// carries that row
    Conflict(SubmissionEpisode),
}

/// Selection of submission episodes for reporting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionFilter {
    pub manufacturer_id: Option<ManufacturerId>,

    /// Inclusive lower bound on the creation date
    pub start_date: Option<NaiveDate>,

    /// Inclusive upper bound on the creation date
    pub end_date: Option<NaiveDate>,
}

impl SubmissionFilter {
    pub fn for_manufacturer(manufacturer_id: ManufacturerId) -> Self {
        Self {
            manufacturer_id: Some(manufacturer_id),
            ..Default::default()
        }
    }

    /// Whether a record falls inside the filter
    pub fn matches(&self, record: &SubmissionEpisode) -> bool {
        if let Some(ref manufacturer_id) = self.manufacturer_id {
            if &record.manufacturer_id != manufacturer_id {
                return false;
            }
        }
        let created = record.created_at.date_naive();
        if self.start_date.is_some_and(|start| created < start) {
            return false;
        }
        if self.end_date.is_some_and(|end| created > end) {
            return false;
        }
        true
    }
}

/// Persistence of submission episodes
///
/// Rows are unique per (episode, manufacturer) and are never deleted.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Test the storage connection
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store is unreachable.
    async fn test_connection(&self) -> Result<()>;

    /// Look up the row for an (episode, manufacturer) pair
    async fn find_by_pair(
        &self,
        episode_id: EpisodeId,
        manufacturer_id: &ManufacturerId,
    ) -> Result<Option<SubmissionEpisode>>;

    /// Look up a row by its external submission id
    async fn find_by_submission_id(
        &self,
        submission_id: &SubmissionId,
    ) -> Result<Option<SubmissionEpisode>>;

    /// Insert a new row
    ///
    /// A row already present for the same pair is not overwritten; it is
    /// returned as [`InsertOutcome::Conflict`].
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails for any other reason.
    async fn insert(&self, record: SubmissionEpisode) -> Result<InsertOutcome>;

    /// Replace an existing row, matched by its local id
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::IvrError::NotFound`] if no such row exists.
    async fn update(&self, record: &SubmissionEpisode) -> Result<()>;

    /// Claim the create call for a row that has no external id yet
    ///
    /// Succeeds only while the row is still unsent and no other claim is
    /// live at `now`; the claim then lasts until `until`. Returns whether
    /// the claim was taken.
    async fn claim_create(
        &self,
        id: Uuid,
        until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    /// All rows matching the filter, oldest first
    async fn list(&self, filter: &SubmissionFilter) -> Result<Vec<SubmissionEpisode>>;
}

/// Append-only log of mapping operations
#[async_trait]
pub trait MappingLogStore: Send + Sync {
    /// Append one entry
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be written.
    async fn append(&self, entry: &MappingLogEntry) -> Result<()>;

    /// Entries recorded for an episode, oldest first
    async fn entries_for_episode(&self, episode_id: EpisodeId) -> Result<Vec<MappingLogEntry>>;
}
