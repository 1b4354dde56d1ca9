//! Row conversions for the PostgreSQL tables

use crate::domain::ids::{EpisodeId, ManufacturerId, SubmissionId};
use crate::domain::mapping::{MappingLogEntry, MappingPurpose};
use crate::domain::submission::{SubmissionEpisode, SubmissionStatus};
use crate::domain::{IvrError, Result};
use std::collections::BTreeMap;
use tokio_postgres::Row;

/// Columns of `submission_episodes`, in the order [`submission_from_row`] reads them
pub const SUBMISSION_COLUMNS: &str = "id, episode_id, manufacturer_id, manufacturer_name, \
     template_id, submission_id, status, field_completeness, required_completeness, \
     mapped_fields, validation_warnings, created_at, updated_at, sent_at, viewed_at, \
     started_at, completed_at, expired_at, signed_document_url, create_claimed_until";

pub const MAPPING_LOG_COLUMNS: &str = "id, episode_id, manufacturer_id, mapping_type, component, \
     completeness, required_completeness, created_at";

fn column<'a, T: tokio_postgres::types::FromSql<'a>>(row: &'a Row, name: &str) -> Result<T> {
    row.try_get(name)
        .map_err(|e| IvrError::Database(format!("Failed to read column '{}': {}", name, e)))
}

/// Stored episode ids are positive BIGINTs
pub fn episode_to_sql(episode_id: EpisodeId) -> Result<i64> {
    i64::try_from(episode_id.value())
        .map_err(|_| IvrError::Database(format!("Episode id {} exceeds BIGINT", episode_id)))
}

fn episode_from_sql(value: i64) -> Result<EpisodeId> {
    u64::try_from(value)
        .map_err(|_| IvrError::Database(format!("Negative episode id {} in storage", value)))
        .and_then(|v| EpisodeId::new(v).map_err(IvrError::Database))
}

pub fn submission_from_row(row: &Row) -> Result<SubmissionEpisode> {
    let status: String = column(row, "status")?;
    let submission_id: Option<String> = column(row, "submission_id")?;
    let mapped_fields: serde_json::Value = column(row, "mapped_fields")?;
    let warnings: serde_json::Value = column(row, "validation_warnings")?;

    Ok(SubmissionEpisode {
        id: column(row, "id")?,
        episode_id: episode_from_sql(column(row, "episode_id")?)?,
        manufacturer_id: ManufacturerId::new(column::<String>(row, "manufacturer_id")?)
            .map_err(IvrError::Database)?,
        manufacturer_name: column(row, "manufacturer_name")?,
        template_id: column(row, "template_id")?,
        submission_id: submission_id
            .map(SubmissionId::new)
            .transpose()
            .map_err(IvrError::Database)?,
        status: status.parse::<SubmissionStatus>().map_err(IvrError::Database)?,
        field_completeness: column(row, "field_completeness")?,
        required_completeness: column(row, "required_completeness")?,
        mapped_fields: serde_json::from_value::<BTreeMap<String, String>>(mapped_fields)?,
        validation_warnings: serde_json::from_value::<Vec<String>>(warnings)?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
        sent_at: column(row, "sent_at")?,
        viewed_at: column(row, "viewed_at")?,
        started_at: column(row, "started_at")?,
        completed_at: column(row, "completed_at")?,
        expired_at: column(row, "expired_at")?,
        signed_document_url: column(row, "signed_document_url")?,
        create_claimed_until: column(row, "create_claimed_until")?,
    })
}

pub fn mapping_log_from_row(row: &Row) -> Result<MappingLogEntry> {
    let mapping_type: String = column(row, "mapping_type")?;
    Ok(MappingLogEntry {
        id: column(row, "id")?,
        episode_id: episode_from_sql(column(row, "episode_id")?)?,
        manufacturer_id: ManufacturerId::new(column::<String>(row, "manufacturer_id")?)
            .map_err(IvrError::Database)?,
        mapping_type: mapping_type
            .parse::<MappingPurpose>()
            .map_err(IvrError::Database)?,
        component: column(row, "component")?,
        completeness: column(row, "completeness")?,
        required_completeness: column(row, "required_completeness")?,
        created_at: column(row, "created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_id_conversions() {
        let id = EpisodeId::new(42).unwrap();
        assert_eq!(episode_to_sql(id).unwrap(), 42);
        assert_eq!(episode_from_sql(42).unwrap(), id);
        assert!(episode_from_sql(-1).is_err());
        assert!(episode_from_sql(0).is_err());
        assert!(episode_to_sql(EpisodeId::new(u64::MAX).unwrap()).is_err());
    }

    #[test]
    fn test_column_lists_cover_tables() {
        assert_eq!(SUBMISSION_COLUMNS.split(',').count(), 20);
        assert_eq!(MAPPING_LOG_COLUMNS.split(',').count(), 8);
    }
}
