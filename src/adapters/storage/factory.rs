//! Storage factory
//!
//! Builds the submission store and mapping log from configuration, sharing
//! one backend between them.

use super::memory::InMemoryStorage;
use super::postgresql::{PostgreSQLClient, PostgreSQLStorage};
use super::traits::{MappingLogStore, SubmissionStore};
use crate::config::schema::{IvrConfig, StorageBackend};
use crate::domain::{IvrError, Result};
use std::sync::Arc;

/// Submission store and mapping log over the same backend
#[derive(Clone)]
pub struct Storage {
    pub submissions: Arc<dyn SubmissionStore>,
    pub mapping_logs: Arc<dyn MappingLogStore>,
}

impl Storage {
    /// Fresh in-memory storage
    pub fn in_memory() -> Self {
        let storage = Arc::new(InMemoryStorage::new());
        Self {
            submissions: storage.clone() as Arc<dyn SubmissionStore>,
            mapping_logs: storage as Arc<dyn MappingLogStore>,
        }
    }
}

/// Create the storage backend selected by `storage_backend`
///
/// The PostgreSQL backend applies the schema migration before returning.
///
/// # Errors
///
/// Returns an error if the PostgreSQL section is missing, the pool cannot be
/// built or the migration fails.
pub async fn create_storage(config: &IvrConfig) -> Result<Storage> {
    match config.storage_backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory storage");
            Ok(Storage::in_memory())
        }
        StorageBackend::PostgreSQL => {
            let pg_config = config.postgresql.as_ref().ok_or_else(|| {
                IvrError::Configuration(
                    "postgresql configuration is required when storage_backend is postgresql"
                        .to_string(),
                )
            })?;

            let client = Arc::new(PostgreSQLClient::new(pg_config.clone())?);
            tracing::info!(
                target = %client.connection_string_safe(),
                "Creating PostgreSQL storage"
            );
            client.ensure_schema().await?;

            let storage = Arc::new(PostgreSQLStorage::new_with_arc(client));
            Ok(Storage {
                submissions: storage.clone() as Arc<dyn SubmissionStore>,
                mapping_logs: storage as Arc<dyn MappingLogStore>,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    #[tokio::test]
    async fn test_create_memory_storage() {
        let config = parse_config(
            r#"
            storage_backend = "memory"

            [docuseal]
            base_url = "https://api.docuseal.com"
            api_key = "test-key"
            "#,
        )
        .unwrap();
        let storage = create_storage(&config).await.unwrap();
        storage.submissions.test_connection().await.unwrap();
    }
}
