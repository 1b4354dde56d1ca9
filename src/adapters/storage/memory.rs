//! In-memory storage adapter
//!
//! Used for tests, the CLI and single-process deployments without a
//! database. Holds the same uniqueness rules as the PostgreSQL schema.

use super::traits::{InsertOutcome, MappingLogStore, SubmissionFilter, SubmissionStore};
use crate::domain::errors::IvrError;
use crate::domain::ids::{EpisodeId, ManufacturerId, SubmissionId};
use crate::domain::mapping::MappingLogEntry;
use crate::domain::submission::SubmissionEpisode;
use crate::domain::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Submission episodes and mapping log held in memory
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    submissions: RwLock<Vec<SubmissionEpisode>>,
    logs: RwLock<Vec<MappingLogEntry>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored submission episodes
    pub async fn submission_count(&self) -> usize {
        self.submissions.read().await.len()
    }

    /// Number of mapping log entries
    pub async fn log_count(&self) -> usize {
        self.logs.read().await.len()
    }
}

#[async_trait]
impl SubmissionStore for InMemoryStorage {
    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn find_by_pair(
        &self,
        episode_id: EpisodeId,
        manufacturer_id: &ManufacturerId,
    ) -> Result<Option<SubmissionEpisode>> {
        Ok(self
            .submissions
            .read()
            .await
            .iter()
            .find(|r| r.episode_id == episode_id && &r.manufacturer_id == manufacturer_id)
            .cloned())
    }

    async fn find_by_submission_id(
        &self,
        submission_id: &SubmissionId,
    ) -> Result<Option<SubmissionEpisode>> {
        Ok(self
            .submissions
            .read()
            .await
            .iter()
            .find(|r| r.submission_id.as_ref() == Some(submission_id))
            .cloned())
    }

    async fn insert(&self, record: SubmissionEpisode) -> Result<InsertOutcome> {
        let mut submissions = self.submissions.write().await;
        if let Some(existing) = submissions.iter().find(|r| {
            r.episode_id == record.episode_id && r.manufacturer_id == record.manufacturer_id
        }) {
            return Ok(InsertOutcome::Conflict(existing.clone()));
        }
        if let Some(ref submission_id) = record.submission_id {
            if submissions
                .iter()
                .any(|r| r.submission_id.as_ref() == Some(submission_id))
            {
                return Err(IvrError::Database(format!(
                    "Submission {submission_id} is already attached to another episode"
                )));
            }
        }
        submissions.push(record.clone());
        Ok(InsertOutcome::Inserted(record))
    }

    async fn update(&self, record: &SubmissionEpisode) -> Result<()> {
        let mut submissions = self.submissions.write().await;
        let slot = submissions
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or_else(|| IvrError::NotFound(format!("Submission episode {}", record.id)))?;
        *slot = record.clone();
        Ok(())
    }

    async fn claim_create(
        &self,
        id: Uuid,
        until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut submissions = self.submissions.write().await;
        let Some(row) = submissions.iter_mut().find(|r| r.id == id) else {
            return Ok(false);
        };
        let claim_live = row.create_claimed_until.is_some_and(|claimed| claimed >= now);
        if row.submission_id.is_some() || claim_live {
            return Ok(false);
        }
        row.create_claimed_until = Some(until);
        row.updated_at = now;
        Ok(true)
    }

    async fn list(&self, filter: &SubmissionFilter) -> Result<Vec<SubmissionEpisode>> {
        let mut rows: Vec<SubmissionEpisode> = self
            .submissions
            .read()
            .await
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.created_at);
        Ok(rows)
    }
}

#[async_trait]
impl MappingLogStore for InMemoryStorage {
    async fn append(&self, entry: &MappingLogEntry) -> Result<()> {
        self.logs.write().await.push(entry.clone());
        Ok(())
    }

    async fn entries_for_episode(&self, episode_id: EpisodeId) -> Result<Vec<MappingLogEntry>> {
        Ok(self
            .logs
            .read()
            .await
            .iter()
            .filter(|e| e.episode_id == episode_id)
            .cloned()
            .collect())
    }
}
