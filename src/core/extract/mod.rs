//! Source data extraction
//!
//! The [`DataExtractor`] reads an episode and the patient, provider, facility
//! and order records it references, then flattens them into a
//! [`SourceFieldBag`] using the `patient_*`, `primary_*`, `provider_*`,
//! `facility_*`, `wound_*` and `product_*` key vocabulary. Derived values
//! (wound area, wound duration buckets, patient age, full name and address)
//! are computed here so every manufacturer profile sees the same inputs.
//!
//! Missing records and attributes become absent keys. Only an unknown
//! episode is an error.

pub mod cache;

pub use cache::{ExtractionCache, InMemoryExtractionCache};

use crate::adapters::clinical::ClinicalRecordProvider;
use crate::core::transform::numeric::round_to;
use crate::core::transform::WoundDuration;
use crate::domain::clinical::{
    ClinicalSummary, Coverage, EpisodeRecord, FacilityRecord, OrderRecord, PatientRecord,
    ProviderRecord,
};
use crate::domain::errors::IvrError;
use crate::domain::field::{FieldValue, SourceFieldBag};
use crate::domain::ids::EpisodeId;
use crate::domain::Result;
use chrono::{Datelike, NaiveDate, Utc};
use std::future::Future;
use std::sync::Arc;

/// Builds source field bags from clinical records
#[derive(Clone)]
pub struct DataExtractor {
    provider: Arc<dyn ClinicalRecordProvider>,
}

impl DataExtractor {
    pub fn new(provider: Arc<dyn ClinicalRecordProvider>) -> Self {
        Self { provider }
    }

    /// Extracts the bag for an episode as of today
    ///
    /// # Errors
    ///
    /// Returns [`IvrError::NotFound`] for an unknown episode, or the
    /// provider's error if the episode itself cannot be read.
    pub async fn extract(&self, episode_id: EpisodeId) -> Result<SourceFieldBag> {
        self.extract_as_of(episode_id, Utc::now().date_naive()).await
    }

    /// Extracts the bag, computing durations and age relative to `today`
    pub async fn extract_as_of(
        &self,
        episode_id: EpisodeId,
        today: NaiveDate,
    ) -> Result<SourceFieldBag> {
        let episode = self
            .provider
            .get_episode(episode_id)
            .await?
            .ok_or_else(|| IvrError::NotFound(format!("Episode {episode_id} not found")))?;

        let patient = match episode.patient_id.as_deref() {
            Some(id) => linked(episode_id, "patient", self.provider.get_patient(id)).await,
            None => None,
        };
        let provider = match episode.provider_id.as_deref() {
            Some(id) => linked(episode_id, "provider", self.provider.get_provider(id)).await,
            None => None,
        };
        let facility = match episode.facility_id.as_deref() {
            Some(id) => linked(episode_id, "facility", self.provider.get_facility(id)).await,
            None => None,
        };
        let order = match episode.order_id.as_deref() {
            Some(id) => linked(episode_id, "order", self.provider.get_order(id)).await,
            None => None,
        };

        let mut bag = SourceFieldBag::new();
        bag.set("episode_id", episode_id.value().to_string());
        if let Some(ref patient) = patient {
            flatten_patient(&mut bag, patient, today);
        }
        if let Some(ref provider) = provider {
            flatten_provider(&mut bag, provider);
        }
        if let Some(ref facility) = facility {
            flatten_facility(&mut bag, facility);
        }
        flatten_clinical(&mut bag, &episode.clinical, today);
        if let Some(ref order) = order {
            flatten_order(&mut bag, order);
        }
        flatten_metadata(&mut bag, &episode);

        tracing::debug!(
            episode_id = %episode_id,
            fields = bag.len(),
            has_patient = patient.is_some(),
            has_provider = provider.is_some(),
            has_facility = facility.is_some(),
            has_order = order.is_some(),
            "Episode data extracted"
        );
        Ok(bag)
    }
}

/// Resolves a referenced record; lookup failures degrade to absent data
async fn linked<T>(
    episode_id: EpisodeId,
    kind: &'static str,
    lookup: impl Future<Output = Result<Option<T>>>,
) -> Option<T> {
    match lookup.await {
        Ok(Some(record)) => Some(record),
        Ok(None) => {
            tracing::debug!(episode_id = %episode_id, record = kind, "Referenced record not found");
            None
        }
        Err(e) => {
            tracing::warn!(
                episode_id = %episode_id,
                record = kind,
                error = %e,
                "Failed to fetch referenced record"
            );
            None
        }
    }
}

fn join_non_empty<'a>(parts: impl IntoIterator<Item = Option<&'a str>>, separator: &str) -> String {
    parts
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Whole years from `birth` to `today`
pub fn age_in_years(birth: NaiveDate, today: NaiveDate) -> Option<u32> {
    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

fn flatten_patient(bag: &mut SourceFieldBag, patient: &PatientRecord, today: NaiveDate) {
    bag.set_opt("patient_first_name", patient.first_name.as_deref());
    bag.set_opt("patient_last_name", patient.last_name.as_deref());
    bag.set(
        "patient_full_name",
        join_non_empty(
            [patient.first_name.as_deref(), patient.last_name.as_deref()],
            " ",
        ),
    );
    if let Some(dob) = patient.date_of_birth {
        bag.set("patient_dob", dob);
        if let Some(age) = age_in_years(dob, today) {
            bag.set("patient_age", age);
        }
    }
    bag.set_opt("patient_gender", patient.gender.as_deref());
    bag.set_opt("patient_phone", patient.phone.as_deref());
    bag.set_opt("patient_email", patient.email.as_deref());
    bag.set_opt("patient_address_line1", patient.address_line1.as_deref());
    bag.set_opt("patient_address_line2", patient.address_line2.as_deref());
    bag.set_opt("patient_city", patient.city.as_deref());
    bag.set_opt("patient_state", patient.state.as_deref());
    bag.set_opt("patient_zip", patient.zip.as_deref());
    bag.set(
        "patient_full_address",
        join_non_empty(
            [
                patient.address_line1.as_deref(),
                patient.address_line2.as_deref(),
                patient.city.as_deref(),
                patient.state.as_deref(),
                patient.zip.as_deref(),
            ],
            ", ",
        ),
    );
    bag.set_opt("patient_member_id", patient.member_id.as_deref());

    if let Some(ref coverage) = patient.primary_insurance {
        flatten_coverage(bag, "primary", coverage);
    }
    if let Some(ref coverage) = patient.secondary_insurance {
        flatten_coverage(bag, "secondary", coverage);
    }
}

fn flatten_coverage(bag: &mut SourceFieldBag, rank: &str, coverage: &Coverage) {
    bag.set_opt(&format!("{rank}_insurance_name"), coverage.payer_name.as_deref());
    bag.set_opt(&format!("{rank}_member_id"), coverage.member_id.as_deref());
    bag.set_opt(&format!("{rank}_plan_type"), coverage.plan_type.as_deref());
    bag.set_opt(&format!("{rank}_payer_phone"), coverage.payer_phone.as_deref());
}

fn flatten_provider(bag: &mut SourceFieldBag, provider: &ProviderRecord) {
    bag.set_opt("provider_first_name", provider.first_name.as_deref());
    bag.set_opt("provider_last_name", provider.last_name.as_deref());
    bag.set(
        "provider_name",
        join_non_empty(
            [provider.first_name.as_deref(), provider.last_name.as_deref()],
            " ",
        ),
    );
    bag.set_opt("provider_npi", provider.npi.as_deref());
    bag.set_opt("provider_email", provider.email.as_deref());
    bag.set_opt("provider_phone", provider.phone.as_deref());
    bag.set_opt("provider_credentials", provider.credentials.as_deref());
    bag.set_opt("provider_tax_id", provider.tax_id.as_deref());
    bag.set_opt("provider_specialty", provider.specialty.as_deref());
}

fn flatten_facility(bag: &mut SourceFieldBag, facility: &FacilityRecord) {
    bag.set_opt("facility_name", facility.name.as_deref());
    bag.set_opt("facility_npi", facility.npi.as_deref());
    bag.set_opt("facility_address", facility.address.as_deref());
    bag.set_opt("facility_city", facility.city.as_deref());
    bag.set_opt("facility_state", facility.state.as_deref());
    bag.set_opt("facility_zip", facility.zip.as_deref());
    bag.set_opt("facility_phone", facility.phone.as_deref());
    bag.set_opt("facility_fax", facility.fax.as_deref());
    bag.set_opt("facility_tax_id", facility.tax_id.as_deref());
    bag.set_opt("place_of_service", facility.place_of_service.as_deref());
}

fn flatten_clinical(bag: &mut SourceFieldBag, clinical: &ClinicalSummary, today: NaiveDate) {
    bag.set_opt("wound_type", clinical.wound_type.as_deref());
    bag.set_opt("wound_location", clinical.wound_location.as_deref());
    bag.set_opt("wound_size_length", clinical.wound_length);
    bag.set_opt("wound_size_width", clinical.wound_width);
    bag.set_opt("wound_size_depth", clinical.wound_depth);

    if let (Some(length), Some(width)) = (clinical.wound_length, clinical.wound_width) {
        bag.set("wound_size_total", round_to(length * width, 2));
    }

    if let Some(start) = clinical.wound_start_date {
        bag.set("wound_start_date", start);
        let duration = WoundDuration::between(start, today);
        bag.set("wound_duration_days", FieldValue::from(duration.days));
        bag.set("wound_duration_weeks", FieldValue::from(duration.weeks));
        bag.set("wound_duration_months", FieldValue::from(duration.months));
        bag.set("wound_duration_years", FieldValue::from(duration.years));
    }

    bag.set_opt(
        "primary_diagnosis_code",
        clinical.primary_diagnosis_code.as_deref(),
    );
    bag.set_opt(
        "secondary_diagnosis_code",
        clinical.secondary_diagnosis_code.as_deref(),
    );
    let diagnosis = clinical
        .primary_diagnosis_code
        .as_deref()
        .or_else(|| clinical.diagnosis_codes.first().map(String::as_str));
    bag.set_opt("diagnosis_code", diagnosis);
    bag.set("diagnosis_codes", clinical.diagnosis_codes.clone());

    bag.set_opt("expected_service_date", clinical.expected_service_date);
    bag.set_opt("hospice_status", clinical.hospice_status);
    bag.set_opt("prior_application", clinical.prior_application);
    bag.set_opt("prior_application_count", clinical.prior_application_count);
    bag.set("previous_therapies", clinical.previous_therapies.clone());
    bag.set("comorbidities", clinical.comorbidities.clone());
    // episode-level place of service wins over the facility default
    bag.set_opt("place_of_service", clinical.place_of_service.as_deref());
}

fn flatten_order(bag: &mut SourceFieldBag, order: &OrderRecord) {
    bag.set_opt("order_number", order.order_number.as_deref());
    if !bag.contains("expected_service_date") {
        bag.set_opt("expected_service_date", order.expected_service_date);
    }
    if let Some(product) = order.products.first() {
        bag.set_opt("product_name", product.name.as_deref());
        bag.set_opt("product_code", product.code.as_deref());
        bag.set_opt("product_manufacturer", product.manufacturer.as_deref());
        bag.set_opt("product_category", product.category.as_deref());
        bag.set_opt("product_size", product.size.as_deref());
        bag.set_opt("product_quantity", product.quantity);
    }
}

fn flatten_metadata(bag: &mut SourceFieldBag, episode: &EpisodeRecord) {
    for (name, raw) in &episode.metadata {
        if let Some(value) = FieldValue::from_json(raw) {
            if !bag.set(name, value) {
                tracing::debug!(
                    episode_id = %episode.id,
                    key = %name,
                    "Skipping unusable episode metadata entry"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clinical::InMemoryClinicalStore;
    use crate::domain::clinical::OrderedProduct;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    async fn store_with_episode() -> (Arc<InMemoryClinicalStore>, EpisodeId) {
        let store = Arc::new(InMemoryClinicalStore::new());
        let id = EpisodeId::new(42).unwrap();

        let mut episode = EpisodeRecord::new(id);
        episode.patient_id = Some("p-1".to_string());
        episode.provider_id = Some("dr-1".to_string());
        episode.facility_id = Some("missing-facility".to_string());
        episode.order_id = Some("o-1".to_string());
        episode.clinical.wound_length = Some(5.2);
        episode.clinical.wound_width = Some(3.1);
        episode.clinical.wound_start_date = Some(today() - Duration::weeks(6));
        episode.clinical.diagnosis_codes = vec!["E11.621".to_string(), "L97.412".to_string()];
        episode
            .metadata
            .insert("referral_source".to_string(), serde_json::json!("Clinic A"));
        episode
            .metadata
            .insert("bad key".to_string(), serde_json::json!("ignored"));
        store.insert_episode(episode).await;

        store
            .insert_patient(PatientRecord {
                id: "p-1".to_string(),
                first_name: Some("Jane".to_string()),
                last_name: Some("Doe".to_string()),
                date_of_birth: NaiveDate::from_ymd_opt(1980, 12, 25),
                address_line1: Some("1 Main St".to_string()),
                city: Some("Austin".to_string()),
                state: Some("TX".to_string()),
                zip: Some("78701".to_string()),
                primary_insurance: Some(Coverage {
                    payer_name: Some("Medicare".to_string()),
                    member_id: Some("1EG4-TE5-MK72".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            })
            .await;
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
            .insert_order(OrderRecord {
                id: "o-1".to_string(),
                order_number: Some("ORD-9".to_string()),
                expected_service_date: None,
                products: vec![OrderedProduct {
                    name: Some("Amnio Graft".to_string()),
                    code: Some("Q4151".to_string()),
                    quantity: Some(2),
                    ..Default::default()
                }],
            })
            .await;

        (store, id)
    }

    #[tokio::test]
    async fn test_extract_flattens_records() {
        let (store, id) = store_with_episode().await;
        let extractor = DataExtractor::new(store);
        let bag = extractor.extract_as_of(id, today()).await.unwrap();

        let text = |key: &str| bag.get(key).map(FieldValue::as_text);
        assert_eq!(text("patient_full_name").as_deref(), Some("Jane Doe"));
        assert_eq!(text("patient_dob").as_deref(), Some("1980-12-25"));
        assert_eq!(text("patient_age").as_deref(), Some("44"));
        assert_eq!(
            text("patient_full_address").as_deref(),
            Some("1 Main St, Austin, TX, 78701")
        );
        assert_eq!(text("primary_insurance_name").as_deref(), Some("Medicare"));
        assert_eq!(text("provider_name").as_deref(), Some("Sam Lee"));
        assert_eq!(text("product_code").as_deref(), Some("Q4151"));
        assert_eq!(text("order_number").as_deref(), Some("ORD-9"));
        assert_eq!(text("referral_source").as_deref(), Some("Clinic A"));
        assert_eq!(text("diagnosis_code").as_deref(), Some("E11.621"));
    }

    #[tokio::test]
    async fn test_extract_computes_derived_fields() {
        let (store, id) = store_with_episode().await;
        let bag = DataExtractor::new(store)
            .extract_as_of(id, today())
            .await
            .unwrap();

        assert_eq!(bag.get("wound_size_total"), Some(&FieldValue::Number(16.12)));
        assert_eq!(bag.get("wound_duration_weeks"), Some(&FieldValue::Number(6.0)));
        let days = bag.get("wound_duration_days").unwrap().as_number().unwrap();
        assert!((35.0..49.0).contains(&days));
    }

    #[tokio::test]
    async fn test_missing_records_are_absent_keys() {
        let (store, id) = store_with_episode().await;
        let bag = DataExtractor::new(store)
            .extract_as_of(id, today())
            .await
            .unwrap();

        assert!(!bag.contains("facility_name"));
        assert!(!bag.contains("patient_email"));
        assert!(!bag.contains("secondary_insurance_name"));
        assert!(!bag.contains("previous_therapies"));
    }

    #[tokio::test]
    async fn test_unknown_episode_is_not_found() {
        let store = Arc::new(InMemoryClinicalStore::new());
        let err = DataExtractor::new(store)
            .extract(EpisodeId::new(999).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, IvrError::NotFound(_)));
    }

    #[test]
    fn test_age_in_years() {
        let dob = NaiveDate::from_ymd_opt(1980, 12, 25).unwrap();
        assert_eq!(age_in_years(dob, NaiveDate::from_ymd_opt(2025, 12, 24).unwrap()), Some(44));
        assert_eq!(age_in_years(dob, NaiveDate::from_ymd_opt(2025, 12, 25).unwrap()), Some(45));
        assert_eq!(age_in_years(dob, NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()), None);
    }
}
