//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use ivr_mapper::adapters::clinical::InMemoryClinicalStore;
use ivr_mapper::adapters::esignature::{RemoteSubmission, SignatureService, SubmissionRequest};
use ivr_mapper::adapters::storage::InMemoryStorage;
use ivr_mapper::config::{load_catalog, ManufacturerCatalog, MatchingConfig};
use ivr_mapper::core::analytics::AnalyticsAggregator;
use ivr_mapper::core::extract::DataExtractor;
use ivr_mapper::core::mapping::MappingOrchestrator;
use ivr_mapper::core::matching::{FieldMatcher, HeuristicPredictor};
use ivr_mapper::core::submission::SubmissionGateway;
use ivr_mapper::domain::clinical::{
    Coverage, EpisodeRecord, FacilityRecord, PatientRecord, ProviderRecord,
};
use ivr_mapper::domain::errors::DocuSealError;
use ivr_mapper::domain::{EpisodeId, Result, Signer, SubmissionId, SubmissionStatus};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const ACZ: &str = "acz-associates";

pub fn episode(id: u64) -> EpisodeId {
    EpisodeId::new(id).unwrap()
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn catalog() -> Arc<ManufacturerCatalog> {
    Arc::new(load_catalog("config/manufacturers.toml").unwrap())
}

/// Adds a fully documented episode whose wound started `wound_weeks` ago
pub async fn seed_episode(store: &InMemoryClinicalStore, id: u64, wound_weeks: i64) {
    let patient_id = format!("p-{id}");
    let mut record = EpisodeRecord::new(episode(id));
    record.patient_id = Some(patient_id.clone());
    record.provider_id = Some("dr-1".to_string());
    record.facility_id = Some("fac-1".to_string());
    record.clinical.wound_type = Some("Diabetic foot ulcer".to_string());
    record.clinical.wound_location = Some("Left heel".to_string());
    record.clinical.wound_length = Some(5.2);
    record.clinical.wound_width = Some(3.1);
    record.clinical.wound_start_date = Some(today() - Duration::weeks(wound_weeks));
    record.clinical.primary_diagnosis_code = Some("E11.621".to_string());
    record.clinical.place_of_service = Some("11".to_string());
    record.clinical.hospice_status = Some(false);
    store.insert_episode(record).await;

    store
        .insert_patient(PatientRecord {
            id: patient_id,
            first_name: Some("Jane".to_string()),
            last_name: Some("Doe".to_string()),
            date_of_birth: NaiveDate::from_ymd_opt(1980, 12, 25),
            gender: Some("female".to_string()),
            phone: Some("15551234567".to_string()),
            email: Some("Jane.Doe@Example.com".to_string()),
            address_line1: Some("1 Main St".to_string()),
            address_line2: Some("Apt 2".to_string()),
            city: Some("Austin".to_string()),
            state: Some("tx".to_string()),
            zip: Some("78701".to_string()),
            primary_insurance: Some(Coverage {
                payer_name: Some("Medicare".to_string()),
                member_id: Some("1EG4TE5MK72".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        })
        .await;
}

/// Clinical store with shared provider and facility records
pub async fn clinical_store() -> Arc<InMemoryClinicalStore> {
    let store = Arc::new(InMemoryClinicalStore::new());
    store
        .insert_provider(ProviderRecord {
            id: "dr-1".to_string(),
            first_name: Some("Sam".to_string()),
            last_name: Some("Lee".to_string()),
            npi: Some("1234567890".to_string()),
            ..Default::default()
        })
        .await;
    store
        .insert_facility(FacilityRecord {
            id: "fac-1".to_string(),
            name: Some("Austin Wound Center".to_string()),
            npi: Some("9876543210".to_string()),
            zip: Some("78701".to_string()),
            place_of_service: Some("11".to_string()),
            ..Default::default()
        })
        .await;
    store
}

pub fn orchestrator(
    clinical: Arc<InMemoryClinicalStore>,
    storage: Arc<InMemoryStorage>,
) -> MappingOrchestrator {
    let catalog = catalog();
    let config = MatchingConfig::default();
    let predictor = HeuristicPredictor::from_catalog(&catalog, config.clone());
    MappingOrchestrator::new(
        catalog,
        DataExtractor::new(clinical),
        FieldMatcher::new(Arc::new(predictor), &config),
        storage,
    )
}

/// In-process stand-in for DocuSeal
#[derive(Default)]
pub struct FakeSignatureService {
    next_id: AtomicUsize,
    pub creates: AtomicUsize,
    pub updates: AtomicUsize,
    pub sends: AtomicUsize,
    failing_episodes: Mutex<HashSet<EpisodeId>>,
}

impl FakeSignatureService {
    /// Makes every call for `episode_id` fail with a server error
    pub fn fail_for(&self, episode_id: EpisodeId) {
        self.failing_episodes.lock().unwrap().insert(episode_id);
    }

    fn check(&self, request: &SubmissionRequest) -> Result<()> {
        if self.failing_episodes.lock().unwrap().contains(&request.episode_id) {
            return Err(DocuSealError::ServerError {
                status: 503,
                message: "Service unavailable".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl SignatureService for FakeSignatureService {
    async fn create_submission(&self, request: &SubmissionRequest) -> Result<RemoteSubmission> {
        self.check(request)?;
        // widen the window for concurrent callers
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        self.creates.fetch_add(1, Ordering::SeqCst);
        let id = 5000 + self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(RemoteSubmission {
            id: SubmissionId::new(id.to_string()).unwrap(),
            status: Some(SubmissionStatus::Pending),
            document_url: None,
        })
    }

    async fn update_submission(
        &self,
        submission_id: &SubmissionId,
        request: &SubmissionRequest,
    ) -> Result<RemoteSubmission> {
        self.check(request)?;
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(RemoteSubmission {
            id: submission_id.clone(),
            status: None,
            document_url: None,
        })
    }

    async fn get_submission(&self, submission_id: &SubmissionId) -> Result<RemoteSubmission> {
        Ok(RemoteSubmission {
            id: submission_id.clone(),
            status: Some(SubmissionStatus::Viewed),
            document_url: None,
        })
    }

    async fn download_document(&self, _submission_id: &SubmissionId) -> Result<Vec<u8>> {
        Ok(b"%PDF-1.7".to_vec())
    }

    async fn send_for_signing(
        &self,
        submission_id: &SubmissionId,
        _signers: &[Signer],
    ) -> Result<RemoteSubmission> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        Ok(RemoteSubmission {
            id: submission_id.clone(),
            status: Some(SubmissionStatus::Sent),
            document_url: None,
        })
    }
}

/// Gateway over a fake DocuSeal with episodes 1 to 3 seeded
pub struct GatewayFixture {
    pub gateway: SubmissionGateway,
    pub analytics: AnalyticsAggregator,
    pub docuseal: Arc<FakeSignatureService>,
    pub storage: Arc<InMemoryStorage>,
    pub clinical: Arc<InMemoryClinicalStore>,
}

pub async fn gateway_fixture() -> GatewayFixture {
    let clinical = clinical_store().await;
    for id in 1..=3 {
        seed_episode(&clinical, id, 6).await;
    }
    let storage = Arc::new(InMemoryStorage::new());
    let mapping = orchestrator(Arc::clone(&clinical), Arc::clone(&storage));
    let docuseal = Arc::new(FakeSignatureService::default());
    let gateway = SubmissionGateway::new(mapping.clone(), docuseal.clone(), storage.clone());
    let analytics = AnalyticsAggregator::new(storage.clone(), Arc::clone(mapping.catalog()));
    GatewayFixture {
        gateway,
        analytics,
        docuseal,
        storage,
        clinical,
    }
}
