//! JSON fixture file provider

use super::memory::{ClinicalDataset, InMemoryClinicalStore};
use crate::domain::errors::IvrError;
use crate::domain::Result;
use std::path::Path;

/// Loads a JSON fixture into an in-memory store
///
/// The file holds `{episodes, patients, providers, facilities, orders}`
/// arrays; every key is optional.
///
/// # Errors
///
/// Returns [`IvrError::Configuration`] if the file is missing, unreadable
/// or not a valid dataset.
pub fn load_fixture(path: impl AsRef<Path>) -> Result<InMemoryClinicalStore> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| {
        IvrError::Configuration(format!(
            "Failed to read clinical fixture {}: {}",
            path.display(),
            e
        ))
    })?;

    let dataset: ClinicalDataset = serde_json::from_str(&contents).map_err(|e| {
        IvrError::Configuration(format!(
            "Failed to parse clinical fixture {}: {}",
            path.display(),
            e
        ))
    })?;

    tracing::info!(
        path = %path.display(),
        episodes = dataset.episodes.len(),
        patients = dataset.patients.len(),
        "Clinical fixture loaded"
    );
    Ok(InMemoryClinicalStore::from_dataset(dataset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clinical::ClinicalRecordProvider;
    use crate::domain::EpisodeId;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_load_fixture() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "episodes": [{{"id": 101, "patient_id": "p-1",
                               "clinical": {{"wound_type": "DFU", "wound_start_date": "2025-01-02"}}}}],
                "patients": [{{"id": "p-1", "first_name": "Jane", "date_of_birth": "1980-12-25"}}]
            }}"#
        )
        .unwrap();

        let store = load_fixture(file.path()).unwrap();
        let episode = store
            .get_episode(EpisodeId::new(101).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(episode.clinical.wound_type.as_deref(), Some("DFU"));
        let patient = store.get_patient("p-1").await.unwrap().unwrap();
        assert_eq!(patient.first_name.as_deref(), Some("Jane"));
    }

    #[test]
    fn test_load_fixture_errors() {
        assert!(matches!(
            load_fixture("/nonexistent/fixture.json"),
            Err(IvrError::Configuration(_))
        ));

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[1, 2, 3]").unwrap();
        assert!(load_fixture(file.path()).is_err());
    }

    #[tokio::test]
    async fn test_shipped_fixture() {
        let store = load_fixture("config/clinical-fixture.json").unwrap();
        let episode = store
            .get_episode(EpisodeId::new(1001).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(episode.patient_id.as_deref(), Some("pat-1001"));
        assert!(store.get_order("ord-1001").await.unwrap().is_some());
    }
}
