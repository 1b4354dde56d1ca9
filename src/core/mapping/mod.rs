//! Mapping orchestration
//!
//! The [`MappingOrchestrator`] composes the pipeline for one episode and one
//! manufacturer:
//!
//! 1. **Resolve profile**: by id or case-insensitive display name
//! 2. **Source bag**: cached extraction, extracted and cached on a miss
//! 3. **Overlay**: caller-supplied values replace extracted ones
//! 4. **Match**: declared expressions, then the predictor
//! 5. **Transform**: format every resolved value for the form
//! 6. **Validate**: required fields, business rules, format checks
//! 7. **Score**: completeness over all and required targets
//! 8. **Log**: append a mapping log entry
//!
//! The log append is the only write; its failure fails the mapping.
//!
//! Cache entries last for one mapping transaction. The entry is dropped when
//! the mapping finishes, successful or not, so the next transaction for the
//! episode reads the clinical records again.

pub mod completeness;

pub use completeness::compute as compute_completeness;

use crate::adapters::storage::MappingLogStore;
use crate::config::ManufacturerCatalog;
use crate::core::batch::{run_batch, BatchOutcome};
use crate::core::extract::{DataExtractor, ExtractionCache, InMemoryExtractionCache};
use crate::core::matching::FieldMatcher;
use crate::core::transform::FieldTransformer;
use crate::core::validate::{RuleValidator, ValidationContext};
use crate::domain::errors::IvrError;
use crate::domain::field::SourceFieldBag;
use crate::domain::ids::EpisodeId;
use crate::domain::mapping::{MappingLogEntry, MappingPurpose, MappingResult};
use crate::domain::profile::ManufacturerProfile;
use crate::domain::Result;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// Component name recorded on mapping log entries
pub const COMPONENT: &str = "mapping-orchestrator";

const DEFAULT_BATCH_CONCURRENCY: usize = 4;

/// Runs the mapping pipeline
#[derive(Clone)]
pub struct MappingOrchestrator {
    catalog: Arc<ManufacturerCatalog>,
    extractor: DataExtractor,
    cache: Arc<dyn ExtractionCache>,
    matcher: FieldMatcher,
    transformer: FieldTransformer,
    validator: RuleValidator,
    mapping_logs: Arc<dyn MappingLogStore>,
    batch_concurrency: usize,
}

impl MappingOrchestrator {
    /// Create an orchestrator with an in-memory cache and the catalog's
    /// format checks
    pub fn new(
        catalog: Arc<ManufacturerCatalog>,
        extractor: DataExtractor,
        matcher: FieldMatcher,
        mapping_logs: Arc<dyn MappingLogStore>,
    ) -> Self {
        let validator = RuleValidator::from_catalog(&catalog);
        Self {
            catalog,
            extractor,
            cache: Arc::new(InMemoryExtractionCache::new()),
            matcher,
            transformer: FieldTransformer::new(),
            validator,
            mapping_logs,
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn ExtractionCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_transformer(mut self, transformer: FieldTransformer) -> Self {
        self.transformer = transformer;
        self
    }

    pub fn with_batch_concurrency(mut self, concurrency: usize) -> Self {
        self.batch_concurrency = concurrency.max(1);
        self
    }

    pub fn catalog(&self) -> &Arc<ManufacturerCatalog> {
        &self.catalog
    }

    pub fn batch_concurrency(&self) -> usize {
        self.batch_concurrency
    }

    /// Map an episode for preview
    ///
    /// # Errors
    ///
    /// - [`IvrError::NotFound`] for an unknown manufacturer or episode
    /// - the log store's error if the mapping log entry cannot be written
    pub async fn map_episode(
        &self,
        episode_id: EpisodeId,
        manufacturer: &str,
        additional: &SourceFieldBag,
    ) -> Result<MappingResult> {
        self.map_episode_for(episode_id, manufacturer, additional, MappingPurpose::Preview)
            .await
    }

    /// Map an episode, recording `purpose` in the mapping log
    pub async fn map_episode_for(
        &self,
        episode_id: EpisodeId,
        manufacturer: &str,
        additional: &SourceFieldBag,
        purpose: MappingPurpose,
    ) -> Result<MappingResult> {
        let profile = self.catalog.get(manufacturer)?;
        self.map_with_profile(episode_id, &profile, additional, purpose)
            .await
    }

    async fn map_with_profile(
        &self,
        episode_id: EpisodeId,
        profile: &ManufacturerProfile,
        additional: &SourceFieldBag,
        purpose: MappingPurpose,
    ) -> Result<MappingResult> {
        let result = self
            .run_mapping(episode_id, profile, additional, purpose)
            .await;
        self.invalidate(episode_id);
        result
    }

    async fn run_mapping(
        &self,
        episode_id: EpisodeId,
        profile: &ManufacturerProfile,
        additional: &SourceFieldBag,
        purpose: MappingPurpose,
    ) -> Result<MappingResult> {
        let started = Instant::now();
        crate::log_mapping_start!(episode_id, profile.id, purpose);

        let cached = self.source_bag(episode_id).await?;
        let mut bag = (*cached).clone();
        bag.overlay(additional);

        let result = self.map_bag(Some(episode_id), profile, &bag).await;

        let entry = MappingLogEntry::new(
            episode_id,
            profile.id.clone(),
            purpose,
            COMPONENT,
            &result.completeness,
        );
        self.mapping_logs.append(&entry).await?;

        crate::log_mapping_complete!(
            episode_id,
            profile.id,
            result.completeness.percentage,
            result.validation.valid,
            started.elapsed()
        );
        Ok(result)
    }

    /// Match, format and validate caller-supplied data only
    ///
    /// Nothing is extracted and nothing is logged.
    ///
    /// # Errors
    ///
    /// Returns [`IvrError::NotFound`] for an unknown manufacturer.
    pub async fn validate_data(
        &self,
        manufacturer: &str,
        data: &SourceFieldBag,
    ) -> Result<MappingResult> {
        let profile = self.catalog.get(manufacturer)?;
        Ok(self.map_bag(None, &profile, data).await)
    }

    /// Map many episodes for one manufacturer
    ///
    /// Each episode is mapped independently; failures are recorded per item.
    ///
    /// # Errors
    ///
    /// Returns [`IvrError::NotFound`] only when the manufacturer is unknown.
    pub async fn map_batch(
        &self,
        episode_ids: &[EpisodeId],
        manufacturer: &str,
    ) -> Result<BatchOutcome<MappingResult>> {
        let profile = self.catalog.get(manufacturer)?;
        let empty = SourceFieldBag::new();

        let outcome = run_batch(episode_ids, self.batch_concurrency, |episode_id| {
            let profile = Arc::clone(&profile);
            let empty = &empty;
            async move {
                self.map_with_profile(episode_id, &profile, empty, MappingPurpose::Batch)
                    .await
            }
        })
        .await;
        Ok(outcome)
    }

    /// Drop the cached source bag of an episode
    pub fn invalidate(&self, episode_id: EpisodeId) -> bool {
        let removed = self.cache.invalidate(episode_id);
        if removed {
            tracing::debug!(episode_id = %episode_id, "Extraction cache entry invalidated");
        }
        removed
    }

    async fn source_bag(&self, episode_id: EpisodeId) -> Result<Arc<SourceFieldBag>> {
        if let Some(bag) = self.cache.get(episode_id) {
            tracing::debug!(episode_id = %episode_id, "Extraction cache hit");
            return Ok(bag);
        }

        let bag = self
            .extractor
            .extract_as_of(episode_id, self.transformer.today())
            .await
            .map_err(|e| match e {
                IvrError::NotFound(message) => IvrError::NotFound(message),
                other => {
                    tracing::warn!(
                        episode_id = %episode_id,
                        error = %other,
                        "Episode could not be loaded"
                    );
                    IvrError::NotFound(format!("Episode {episode_id} could not be loaded"))
                }
            })?;

        let bag = Arc::new(bag);
        self.cache.put(episode_id, Arc::clone(&bag));
        Ok(bag)
    }

    /// Match, transform, validate and score one bag
    async fn map_bag(
        &self,
        episode_id: Option<EpisodeId>,
        profile: &ManufacturerProfile,
        bag: &SourceFieldBag,
    ) -> MappingResult {
        let outcome = self.matcher.match_fields(bag, profile).await;

        let mut fields = outcome.mappings;
        for (mapping, field) in fields.iter_mut().zip(&profile.fields) {
            mapping.value =
                self.transformer
                    .transform_field(mapping.raw_value.as_ref(), field, profile);
        }

        let data: BTreeMap<String, String> = fields
            .iter()
            .map(|m| (m.target.as_str().to_string(), m.value.clone()))
            .collect();

        let context = ValidationContext::new(Some(bag), self.transformer.today());
        let validation = self
            .validator
            .validate_with_context(&data, profile, &context);
        let completeness = compute_completeness(&fields);

        MappingResult {
            episode_id,
            manufacturer: profile.summary(),
            fields,
            data,
            unmatched_targets: outcome.unmatched_targets,
            unmatched_sources: outcome.unmatched_sources,
            validation,
            completeness,
            mapped_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clinical::InMemoryClinicalStore;
    use crate::adapters::storage::InMemoryStorage;
    use crate::config::MatchingConfig;
    use crate::core::matching::HeuristicPredictor;
    use crate::domain::clinical::{EpisodeRecord, PatientRecord};
    use chrono::{Duration, NaiveDate};

    const CATALOG: &str = r#"
[[manufacturers]]
id = "test-co"
name = "Test Co"
template_id = "1"

[[manufacturers.fields]]
name = "patient_name"
source = "patient_first_name + patient_last_name"
required = true

[[manufacturers.fields]]
name = "patient_dob"
source = "patient_dob"
required = true

[[manufacturers.fields]]
name = "wound_size"
source = "wound_size_total"
transform = "number:2"

[[manufacturers.rules]]
kind = "min_wound_duration"
weeks = 4
severity = "warning"
"#;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    async fn setup() -> (MappingOrchestrator, Arc<InMemoryClinicalStore>, Arc<InMemoryStorage>) {
        let catalog = Arc::new(ManufacturerCatalog::from_toml_str(CATALOG).unwrap());
        let clinical = Arc::new(InMemoryClinicalStore::new());

        let mut episode = EpisodeRecord::new(EpisodeId::new(1).unwrap());
        episode.patient_id = Some("p-1".to_string());
        episode.clinical.wound_start_date = Some(today() - Duration::weeks(2));
        episode.clinical.wound_length = Some(5.2);
        episode.clinical.wound_width = Some(3.1);
        clinical.insert_episode(episode).await;
        clinical
            .insert_patient(PatientRecord {
                id: "p-1".to_string(),
                first_name: Some("Jane".to_string()),
                last_name: Some("Doe".to_string()),
                date_of_birth: NaiveDate::from_ymd_opt(1980, 12, 25),
                ..Default::default()
            })
            .await;

        let config = MatchingConfig::default();
        let predictor = HeuristicPredictor::from_catalog(&catalog, config.clone());
        let matcher = FieldMatcher::new(Arc::new(predictor), &config);
        let logs = Arc::new(InMemoryStorage::new());

        let orchestrator = MappingOrchestrator::new(
            catalog,
            DataExtractor::new(clinical.clone()),
            matcher,
            logs.clone(),
        )
        .with_transformer(FieldTransformer::with_reference_date(today()));
        (orchestrator, clinical, logs)
    }

    #[tokio::test]
    async fn test_map_episode_end_to_end() {
        let (orchestrator, _, logs) = setup().await;
        let episode = EpisodeId::new(1).unwrap();
        let result = orchestrator
            .map_episode(episode, "Test Co", &SourceFieldBag::new())
            .await
            .unwrap();

        assert_eq!(result.value("patient_name"), Some("Jane Doe"));
        assert_eq!(result.value("patient_dob"), Some("12/25/1980"));
        assert_eq!(result.value("wound_size"), Some("16.12"));
        assert!(result.validation.valid);
        assert!(result
            .validation
            .warnings
            .iter()
            .any(|w| w.contains("greater than 4 weeks")));
        assert_eq!(result.completeness.percentage, 100.0);

        let entries = logs.entries_for_episode(episode).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].mapping_type, MappingPurpose::Preview);
        assert_eq!(entries[0].component, COMPONENT);
    }

    #[tokio::test]
    async fn test_additional_data_wins() {
        let (orchestrator, _, _) = setup().await;
        let mut extra = SourceFieldBag::new();
        extra.set("patient_first_name", "Janet");
        let result = orchestrator
            .map_episode(EpisodeId::new(1).unwrap(), "test-co", &extra)
            .await
            .unwrap();
        assert_eq!(result.value("patient_name"), Some("Janet Doe"));
    }

    #[tokio::test]
    async fn test_next_mapping_reads_fresh_records() {
        let (orchestrator, clinical, _) = setup().await;
        let episode = EpisodeId::new(1).unwrap();
        let empty = SourceFieldBag::new();

        let first = orchestrator.map_episode(episode, "test-co", &empty).await.unwrap();
        assert_eq!(first.value("wound_size"), Some("16.12"));
        assert!(first
            .validation
            .warnings
            .iter()
            .any(|w| w.contains("greater than 4 weeks")));

        let mut episode_record = EpisodeRecord::new(episode);
        episode_record.patient_id = Some("p-1".to_string());
        episode_record.clinical.wound_start_date = Some(today() - Duration::weeks(8));
        episode_record.clinical.wound_length = Some(2.0);
        episode_record.clinical.wound_width = Some(2.0);
        clinical.insert_episode(episode_record).await;

        let second = orchestrator.map_episode(episode, "test-co", &empty).await.unwrap();
        assert_eq!(second.value("wound_size"), Some("4.00"));
        assert!(!second
            .validation
            .warnings
            .iter()
            .any(|w| w.contains("Wound duration")));
    }

    #[tokio::test]
    async fn test_cache_entry_dropped_after_mapping() {
        let (orchestrator, _, _) = setup().await;
        let cache = Arc::new(InMemoryExtractionCache::new());
        let orchestrator = orchestrator.with_cache(cache.clone());
        let episode = EpisodeId::new(1).unwrap();

        orchestrator
            .map_episode(episode, "test-co", &SourceFieldBag::new())
            .await
            .unwrap();
        assert!(cache.is_empty());

        // failed mappings release their entry too
        orchestrator
            .map_episode(EpisodeId::new(404).unwrap(), "test-co", &SourceFieldBag::new())
            .await
            .unwrap_err();
        assert!(cache.is_empty());
        assert!(!orchestrator.invalidate(episode));
    }

    #[tokio::test]
    async fn test_unknown_manufacturer_and_episode() {
        let (orchestrator, _, logs) = setup().await;
        let empty = SourceFieldBag::new();

        let err = orchestrator
            .map_episode(EpisodeId::new(1).unwrap(), "nobody", &empty)
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = orchestrator
            .map_episode(EpisodeId::new(404).unwrap(), "test-co", &empty)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(logs.log_count().await, 0);
    }

    #[tokio::test]
    async fn test_validate_data_does_not_log() {
        let (orchestrator, _, logs) = setup().await;
        let mut data = SourceFieldBag::new();
        data.set("patient_first_name", "Jane");

        let result = orchestrator.validate_data("test-co", &data).await.unwrap();
        assert!(!result.validation.valid);
        assert!(result
            .validation
            .errors
            .contains(&"Required field 'patient_dob' is missing or empty".to_string()));
        assert!(result.episode_id.is_none());
        assert_eq!(logs.log_count().await, 0);
    }

    #[tokio::test]
    async fn test_map_batch_isolates_missing_episode() {
        let (orchestrator, _, logs) = setup().await;
        let ids = vec![EpisodeId::new(1).unwrap(), EpisodeId::new(99).unwrap()];
        let outcome = orchestrator.map_batch(&ids, "test-co").await.unwrap();

        assert_eq!(outcome.summary.total, 2);
        assert_eq!(outcome.summary.successful, 1);
        assert_eq!(outcome.summary.failed, 1);
        assert!(outcome.results[0].success);
        assert!(!outcome.results[1].success);

        let entries = logs.entries_for_episode(ids[0]).await.unwrap();
        assert_eq!(entries[0].mapping_type, MappingPurpose::Batch);
    }
}
