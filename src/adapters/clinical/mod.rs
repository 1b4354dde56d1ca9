//! Clinical record providers
//!
//! The extractor reads episodes and the patient, provider, facility and order
//! records they reference through [`ClinicalRecordProvider`]. Two adapters
//! ship with the crate:
//!
//! - [`InMemoryClinicalStore`] - records held in memory (tests, embedding)
//! - [`load_fixture`] - an in-memory store loaded from a JSON fixture file

pub mod file;
pub mod memory;

pub use file::load_fixture;
pub use memory::{ClinicalDataset, InMemoryClinicalStore};

use crate::config::ClinicalConfig;
use crate::domain::clinical::{
    EpisodeRecord, FacilityRecord, OrderRecord, PatientRecord, ProviderRecord,
};
use crate::domain::ids::EpisodeId;
use crate::domain::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Read access to upstream clinical records
///
/// A missing record is `Ok(None)`; errors are reserved for failures of the
/// backing store.
#[async_trait]
pub trait ClinicalRecordProvider: Send + Sync {
    async fn get_episode(&self, id: EpisodeId) -> Result<Option<EpisodeRecord>>;

    async fn get_patient(&self, id: &str) -> Result<Option<PatientRecord>>;

    async fn get_provider(&self, id: &str) -> Result<Option<ProviderRecord>>;

    async fn get_facility(&self, id: &str) -> Result<Option<FacilityRecord>>;

    async fn get_order(&self, id: &str) -> Result<Option<OrderRecord>>;
}

/// Creates the clinical record provider described by the configuration
///
/// A configured fixture file is loaded; otherwise an empty in-memory store
/// is returned.
///
/// # Errors
///
/// Returns an error if the fixture file cannot be read or parsed
pub fn create_clinical_provider(config: &ClinicalConfig) -> Result<Arc<dyn ClinicalRecordProvider>> {
    match config.fixture_path.as_deref() {
        Some(path) => {
            let store = load_fixture(path)?;
            Ok(Arc::new(store) as Arc<dyn ClinicalRecordProvider>)
        }
        None => {
            tracing::warn!("No clinical fixture configured; episode lookups will return not found");
            Ok(Arc::new(InMemoryClinicalStore::new()) as Arc<dyn ClinicalRecordProvider>)
        }
    }
}
