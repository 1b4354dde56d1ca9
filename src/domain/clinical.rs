//! Upstream clinical records
//!
//! Shapes returned by a [`ClinicalRecordProvider`](crate::adapters::clinical::ClinicalRecordProvider).
//! Every attribute is optional; the extractor turns absent data into absent keys.

use super::ids::EpisodeId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wound-care treatment episode and the records it references
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub id: EpisodeId,
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub provider_id: Option<String>,
    #[serde(default)]
    pub facility_id: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub clinical: ClinicalSummary,
    /// Extra values attached to the episode, copied verbatim into the bag
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl EpisodeRecord {
    /// Episode with no linked records
    pub fn new(id: EpisodeId) -> Self {
        Self {
            id,
            patient_id: None,
            provider_id: None,
            facility_id: None,
            order_id: None,
            clinical: ClinicalSummary::default(),
            metadata: BTreeMap::new(),
        }
    }
}

/// Wound and diagnosis details of an episode
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicalSummary {
    pub wound_type: Option<String>,
    pub wound_location: Option<String>,
    /// Centimetres
    pub wound_length: Option<f64>,
    pub wound_width: Option<f64>,
    pub wound_depth: Option<f64>,
    pub wound_start_date: Option<NaiveDate>,
    pub primary_diagnosis_code: Option<String>,
    pub secondary_diagnosis_code: Option<String>,
    #[serde(default)]
    pub diagnosis_codes: Vec<String>,
    pub expected_service_date: Option<NaiveDate>,
    pub hospice_status: Option<bool>,
    pub prior_application: Option<bool>,
    pub prior_application_count: Option<u32>,
    #[serde(default)]
    pub previous_therapies: Vec<String>,
    #[serde(default)]
    pub comorbidities: Vec<String>,
    pub place_of_service: Option<String>,
}

/// Patient demographics and coverage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub member_id: Option<String>,
    pub primary_insurance: Option<Coverage>,
    pub secondary_insurance: Option<Coverage>,
}

/// Insurance coverage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Coverage {
    pub payer_name: Option<String>,
    pub member_id: Option<String>,
    pub plan_type: Option<String>,
    pub payer_phone: Option<String>,
}

/// Treating provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderRecord {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub npi: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub credentials: Option<String>,
    pub tax_id: Option<String>,
    pub specialty: Option<String>,
}

/// Treating facility
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacilityRecord {
    pub id: String,
    pub name: Option<String>,
    pub npi: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub phone: Option<String>,
    pub fax: Option<String>,
    pub tax_id: Option<String>,
    pub place_of_service: Option<String>,
}

/// Product order submitted for the episode
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: String,
    pub order_number: Option<String>,
    pub expected_service_date: Option<NaiveDate>,
    #[serde(default)]
    pub products: Vec<OrderedProduct>,
}

/// Line item of an order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderedProduct {
    pub name: Option<String>,
    /// HCPCS Q-code
    pub code: Option<String>,
    pub manufacturer: Option<String>,
    pub category: Option<String>,
    pub size: Option<String>,
    pub quantity: Option<u32>,
}
