//! In-memory clinical record store

use super::ClinicalRecordProvider;
use crate::domain::clinical::{
    EpisodeRecord, FacilityRecord, OrderRecord, PatientRecord, ProviderRecord,
};
use crate::domain::ids::EpisodeId;
use crate::domain::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Serializable set of records, the shape of a fixture file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClinicalDataset {
    #[serde(default)]
    pub episodes: Vec<EpisodeRecord>,
    #[serde(default)]
    pub patients: Vec<PatientRecord>,
    #[serde(default)]
    pub providers: Vec<ProviderRecord>,
    #[serde(default)]
    pub facilities: Vec<FacilityRecord>,
    #[serde(default)]
    pub orders: Vec<OrderRecord>,
}

#[derive(Debug, Default)]
struct Records {
    episodes: HashMap<EpisodeId, EpisodeRecord>,
    patients: HashMap<String, PatientRecord>,
    providers: HashMap<String, ProviderRecord>,
    facilities: HashMap<String, FacilityRecord>,
    orders: HashMap<String, OrderRecord>,
}

/// Clinical records held in memory
#[derive(Debug, Default)]
pub struct InMemoryClinicalStore {
    records: RwLock<Records>,
}

impl InMemoryClinicalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with a dataset; later duplicates replace earlier ones
    pub fn from_dataset(dataset: ClinicalDataset) -> Self {
        let records = Records {
            episodes: dataset.episodes.into_iter().map(|e| (e.id, e)).collect(),
            patients: dataset
                .patients
                .into_iter()
                .map(|p| (p.id.clone(), p))
                .collect(),
            providers: dataset
                .providers
                .into_iter()
                .map(|p| (p.id.clone(), p))
                .collect(),
            facilities: dataset
                .facilities
                .into_iter()
                .map(|f| (f.id.clone(), f))
                .collect(),
            orders: dataset
                .orders
                .into_iter()
                .map(|o| (o.id.clone(), o))
                .collect(),
        };
        Self {
            records: RwLock::new(records),
        }
    }

    pub async fn insert_episode(&self, episode: EpisodeRecord) {
        self.records.write().await.episodes.insert(episode.id, episode);
    }

    pub async fn insert_patient(&self, patient: PatientRecord) {
        self.records
            .write()
            .await
            .patients
            .insert(patient.id.clone(), patient);
    }

    pub async fn insert_provider(&self, provider: ProviderRecord) {
        self.records
            .write()
            .await
            .providers
            .insert(provider.id.clone(), provider);
    }

    pub async fn insert_facility(&self, facility: FacilityRecord) {
        self.records
            .write()
            .await
            .facilities
            .insert(facility.id.clone(), facility);
    }

    pub async fn insert_order(&self, order: OrderRecord) {
        self.records
            .write()
            .await
            .orders
            .insert(order.id.clone(), order);
    }

    /// Number of stored episodes
    pub async fn episode_count(&self) -> usize {
        self.records.read().await.episodes.len()
    }
}

#[async_trait]
impl ClinicalRecordProvider for InMemoryClinicalStore {
    async fn get_episode(&self, id: EpisodeId) -> Result<Option<EpisodeRecord>> {
        Ok(self.records.read().await.episodes.get(&id).cloned())
    }

    async fn get_patient(&self, id: &str) -> Result<Option<PatientRecord>> {
        Ok(self.records.read().await.patients.get(id).cloned())
    }

    async fn get_provider(&self, id: &str) -> Result<Option<ProviderRecord>> {
        Ok(self.records.read().await.providers.get(id).cloned())
    }

    async fn get_facility(&self, id: &str) -> Result<Option<FacilityRecord>> {
        Ok(self.records.read().await.facilities.get(id).cloned())
    }

    async fn get_order(&self, id: &str) -> Result<Option<OrderRecord>> {
        Ok(self.records.read().await.orders.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = InMemoryClinicalStore::new();
        let id = EpisodeId::new(7).unwrap();
        let mut episode = EpisodeRecord::new(id);
        episode.patient_id = Some("p-1".to_string());
        store.insert_episode(episode.clone()).await;
        store
            .insert_patient(PatientRecord {
                id: "p-1".to_string(),
                first_name: Some("Jane".to_string()),
                ..Default::default()
            })
            .await;

        assert_eq!(store.get_episode(id).await.unwrap(), Some(episode));
        assert!(store.get_patient("p-1").await.unwrap().is_some());
        assert!(store.get_patient("p-2").await.unwrap().is_none());
        assert!(store
            .get_episode(EpisodeId::new(8).unwrap())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_from_dataset() {
        let dataset = ClinicalDataset {
            episodes: vec![EpisodeRecord::new(EpisodeId::new(1).unwrap())],
            orders: vec![OrderRecord {
                id: "o-1".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let store = InMemoryClinicalStore::from_dataset(dataset);
        assert_eq!(store.episode_count().await, 1);
        assert!(store.get_order("o-1").await.unwrap().is_some());
    }
}
