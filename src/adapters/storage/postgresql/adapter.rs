//! PostgreSQL adapter implementing the storage traits

use super::client::PostgreSQLClient;
use super::models::{
    episode_to_sql, mapping_log_from_row, submission_from_row, MAPPING_LOG_COLUMNS,
    SUBMISSION_COLUMNS,
};
use crate::adapters::storage::traits::{
    InsertOutcome, MappingLogStore, SubmissionFilter, SubmissionStore,
};
use crate::domain::ids::{EpisodeId, ManufacturerId, SubmissionId};
use crate::domain::mapping::MappingLogEntry;
use crate::domain::submission::SubmissionEpisode;
use crate::domain::{IvrError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio_postgres::types::ToSql;
use uuid::Uuid;

/// PostgreSQL implementation of [`SubmissionStore`] and [`MappingLogStore`]
pub struct PostgreSQLStorage {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLStorage {
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    pub fn new_with_arc(client: Arc<PostgreSQLClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }

    async fn select_one(
        &self,
        predicate: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Option<SubmissionEpisode>> {
        let query = format!(
            "SELECT {} FROM submission_episodes WHERE {}",
            SUBMISSION_COLUMNS, predicate
        );
        self.client
            .query_opt(&query, params)
            .await?
            .as_ref()
            .map(submission_from_row)
            .transpose()
    }
}

#[async_trait]
impl SubmissionStore for PostgreSQLStorage {
    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn find_by_pair(
        &self,
        episode_id: EpisodeId,
        manufacturer_id: &ManufacturerId,
    ) -> Result<Option<SubmissionEpisode>> {
        let episode = episode_to_sql(episode_id)?;
        self.select_one(
            "episode_id = $1 AND manufacturer_id = $2",
            &[&episode, &manufacturer_id.as_str()],
        )
        .await
    }

    async fn find_by_submission_id(
        &self,
        submission_id: &SubmissionId,
    ) -> Result<Option<SubmissionEpisode>> {
        self.select_one("submission_id = $1", &[&submission_id.as_str()])
            .await
    }

    async fn insert(&self, record: SubmissionEpisode) -> Result<InsertOutcome> {
        let episode = episode_to_sql(record.episode_id)?;
        let submission_id = record.submission_id.as_ref().map(|s| s.as_str());
        let mapped_fields = serde_json::to_value(&record.mapped_fields)?;
        let warnings = serde_json::to_value(&record.validation_warnings)?;

        let statement = format!(
            "INSERT INTO submission_episodes ({}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20) \
             ON CONFLICT (episode_id, manufacturer_id) DO NOTHING",
            SUBMISSION_COLUMNS
        );
        let inserted = self
            .client
            .execute(
                &statement,
                &[
                    &record.id,
                    &episode,
                    &record.manufacturer_id.as_str(),
                    &record.manufacturer_name,
                    &record.template_id,
                    &submission_id,
                    &record.status.as_str(),
                    &record.field_completeness,
                    &record.required_completeness,
                    &mapped_fields,
                    &warnings,
                    &record.created_at,
                    &record.updated_at,
                    &record.sent_at,
                    &record.viewed_at,
                    &record.started_at,
                    &record.completed_at,
                    &record.expired_at,
                    &record.signed_document_url,
                    &record.create_claimed_until,
                ],
            )
            .await?;

        if inserted == 1 {
            return Ok(InsertOutcome::Inserted(record));
        }

        tracing::debug!(
            episode_id = %record.episode_id,
            manufacturer = %record.manufacturer_id,
            "Submission episode insert lost to an existing row"
        );
        let existing = self
            .find_by_pair(record.episode_id, &record.manufacturer_id)
            .await?
            .ok_or_else(|| {
                IvrError::Database(format!(
                    "Insert conflict for episode {} without a visible row",
                    record.episode_id
                ))
            })?;
        Ok(InsertOutcome::Conflict(existing))
    }

    async fn update(&self, record: &SubmissionEpisode) -> Result<()> {
        let submission_id = record.submission_id.as_ref().map(|s| s.as_str());
        let mapped_fields = serde_json::to_value(&record.mapped_fields)?;
        let warnings = serde_json::to_value(&record.validation_warnings)?;

        let updated = self
            .client
            .execute(
                r#"
                UPDATE submission_episodes SET
                    manufacturer_name = $2,
                    template_id = $3,
                    submission_id = $4,
                    status = $5,
                    field_completeness = $6,
                    required_completeness = $7,
                    mapped_fields = $8,
                    validation_warnings = $9,
                    updated_at = $10,
                    sent_at = $11,
                    viewed_at = $12,
                    started_at = $13,
                    completed_at = $14,
                    expired_at = $15,
                    signed_document_url = $16,
                    create_claimed_until = $17
                WHERE id = $1
                "#,
                &[
                    &record.id,
                    &record.manufacturer_name,
                    &record.template_id,
                    &submission_id,
                    &record.status.as_str(),
                    &record.field_completeness,
                    &record.required_completeness,
                    &mapped_fields,
                    &warnings,
                    &record.updated_at,
                    &record.sent_at,
                    &record.viewed_at,
                    &record.started_at,
                    &record.completed_at,
                    &record.expired_at,
                    &record.signed_document_url,
                    &record.create_claimed_until,
                ],
            )
            .await?;

        if updated == 0 {
            return Err(IvrError::NotFound(format!(
                "Submission episode {}",
                record.id
            )));
        }
        Ok(())
    }

    async fn claim_create(
        &self,
        id: Uuid,
        until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let claimed = self
            .client
            .execute(
                r#"
                UPDATE submission_episodes SET
                    create_claimed_until = $2,
                    updated_at = $3
                WHERE id = $1
                  AND submission_id IS NULL
                  AND (create_claimed_until IS NULL OR create_claimed_until < $3)
                "#,
                &[&id, &until, &now],
            )
            .await?;
        Ok(claimed == 1)
    }

    async fn list(&self, filter: &SubmissionFilter) -> Result<Vec<SubmissionEpisode>> {
        let manufacturer = filter.manufacturer_id.as_ref().map(|m| m.as_str());
        let query = format!(
            "SELECT {} FROM submission_episodes \
             WHERE ($1::TEXT IS NULL OR manufacturer_id = $1) \
               AND ($2::DATE IS NULL OR created_at::DATE >= $2) \
               AND ($3::DATE IS NULL OR created_at::DATE <= $3) \
             ORDER BY created_at",
            SUBMISSION_COLUMNS
        );
        let rows = self
            .client
            .query(&query, &[&manufacturer, &filter.start_date, &filter.end_date])
            .await?;
        rows.iter().map(submission_from_row).collect()
    }
}

#[async_trait]
impl MappingLogStore for PostgreSQLStorage {
    async fn append(&self, entry: &MappingLogEntry) -> Result<()> {
        let episode = episode_to_sql(entry.episode_id)?;
        let statement = format!(
            "INSERT INTO mapping_logs ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            MAPPING_LOG_COLUMNS
        );
        self.client
            .execute(
                &statement,
                &[
                    &entry.id,
                    &episode,
                    &entry.manufacturer_id.as_str(),
                    &entry.mapping_type.as_str(),
                    &entry.component,
                    &entry.completeness,
                    &entry.required_completeness,
                    &entry.created_at,
                ],
            )
            .await?;
        Ok(())
    }

    async fn entries_for_episode(&self, episode_id: EpisodeId) -> Result<Vec<MappingLogEntry>> {
        let episode = episode_to_sql(episode_id)?;
        let query = format!(
            "SELECT {} FROM mapping_logs WHERE episode_id = $1 ORDER BY created_at",
            MAPPING_LOG_COLUMNS
        );
        let rows = self.client.query(&query, &[&episode]).await?;
        rows.iter().map(mapping_log_from_row).collect()
    }
}
