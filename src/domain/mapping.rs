//! Mapping results
//!
//! Output types of the mapping pipeline: per-field [`FieldMapping`]s, the
//! [`ValidationReport`], [`Completeness`] scores and the aggregate
//! [`MappingResult`], plus the append-only [`MappingLogEntry`].

use super::field::{FieldKey, FieldValue};
use super::ids::{EpisodeId, ManufacturerId};
use super::profile::ManufacturerSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// How a target field was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    /// Direct expression or exact name match
    Exact,
    /// `a + b` expression
    Concat,
    /// `a * b` expression
    Computed,
    /// `a || b` expression
    Fallback,
    /// Name-similarity heuristics
    Fuzzy,
    /// ML-assisted prediction
    Predicted,
}

/// A scored source-field candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub field: FieldKey,
    pub confidence: f64,
}

impl Candidate {
    pub fn new(field: FieldKey, confidence: f64) -> Self {
        Self { field, confidence }
    }
}

/// Sorts candidates by confidence descending, ties by field name
pub fn rank_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.field.cmp(&b.field))
    });
}

/// Resolution of one target field
#[derive(Debug, Clone, Serialize)]
pub struct FieldMapping {
    pub target: FieldKey,
    /// Source keys that supplied the value
    pub sources: Vec<FieldKey>,
    /// Value before formatting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_value: Option<FieldValue>,
    /// Manufacturer-ready value
    pub value: String,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<ResolutionMethod>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<Candidate>,
    pub required: bool,
}

impl FieldMapping {
    /// Mapping for a target that nothing resolved
    pub fn unresolved(target: FieldKey, required: bool) -> Self {
        Self {
            target,
            sources: Vec::new(),
            raw_value: None,
            value: String::new(),
            confidence: 0.0,
            method: None,
            alternatives: Vec::new(),
            required,
        }
    }

    /// Whether the formatted value is non-empty
    pub fn is_filled(&self) -> bool {
        !self.value.trim().is_empty()
    }
}

/// Outcome of rule validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// An empty, passing report
    pub fn passing() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Records a blocking error
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(message.into());
    }

    /// Records a non-blocking warning
    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::passing()
    }
}

/// Completeness scores of a mapping
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Completeness {
    pub filled: usize,
    pub total: usize,
    /// Filled targets over all targets, 0–100
    pub percentage: f64,
    pub required_filled: usize,
    pub required_total: usize,
    /// Filled required targets over required targets, 0–100
    pub required_percentage: f64,
}

/// Why a mapping was run; recorded on the mapping log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MappingPurpose {
    Preview,
    SubmissionPrep,
    Batch,
}

impl MappingPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingPurpose::Preview => "preview",
            MappingPurpose::SubmissionPrep => "submission-prep",
            MappingPurpose::Batch => "batch",
        }
    }
}

impl fmt::Display for MappingPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MappingPurpose {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preview" => Ok(MappingPurpose::Preview),
            "submission-prep" => Ok(MappingPurpose::SubmissionPrep),
            "batch" => Ok(MappingPurpose::Batch),
            other => Err(format!("Unknown mapping type '{other}'")),
        }
    }
}

/// Aggregate result of mapping one episode to one manufacturer
#[derive(Debug, Clone, Serialize)]
pub struct MappingResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_id: Option<EpisodeId>,
    pub manufacturer: ManufacturerSummary,
    /// Per-field resolutions in form order
    pub fields: Vec<FieldMapping>,
    /// Target name to formatted value
    pub data: BTreeMap<String, String>,
    pub unmatched_targets: Vec<FieldKey>,
    pub unmatched_sources: Vec<FieldKey>,
    pub validation: ValidationReport,
    pub completeness: Completeness,
    pub mapped_at: DateTime<Utc>,
}

impl MappingResult {
    /// Looks up a formatted value
    pub fn value(&self, target: &str) -> Option<&str> {
        self.data.get(target).map(String::as_str)
    }

    /// Looks up a field resolution
    pub fn field(&self, target: &str) -> Option<&FieldMapping> {
        self.fields.iter().find(|f| f.target.as_str() == target)
    }
}

/// Append-only audit row written for every mapping invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingLogEntry {
    pub id: Uuid,
    pub episode_id: EpisodeId,
    pub manufacturer_id: ManufacturerId,
    pub mapping_type: MappingPurpose,
    /// Component that produced the mapping
    pub component: String,
    pub completeness: f64,
    pub required_completeness: f64,
    pub created_at: DateTime<Utc>,
}

impl MappingLogEntry {
    pub fn new(
        episode_id: EpisodeId,
        manufacturer_id: ManufacturerId,
        mapping_type: MappingPurpose,
        component: impl Into<String>,
        completeness: &Completeness,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            episode_id,
            manufacturer_id,
            mapping_type,
            component: component.into(),
            completeness: completeness.percentage,
            required_completeness: completeness.required_percentage,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> FieldKey {
        FieldKey::new(name).unwrap()
    }

    #[test]
    fn test_rank_candidates_descending_with_name_ties() {
        let mut candidates = vec![
            Candidate::new(key("b_field"), 0.8),
            Candidate::new(key("c_field"), 0.95),
            Candidate::new(key("a_field"), 0.8),
        ];
        rank_candidates(&mut candidates);
        let order: Vec<&str> = candidates.iter().map(|c| c.field.as_str()).collect();
        assert_eq!(order, vec!["c_field", "a_field", "b_field"]);
    }

    #[test]
    fn test_validation_report_error_flips_valid() {
        let mut report = ValidationReport::passing();
        report.add_warning("Wound duration must be greater than 4 weeks");
        assert!(report.valid);
        report.add_error("Required field 'patient_dob' is missing or empty");
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_field_mapping_filled() {
        let mut mapping = FieldMapping::unresolved(key("patient_dob"), true);
        assert!(!mapping.is_filled());
        mapping.value = "0".to_string();
        assert!(mapping.is_filled());
    }

    #[test]
    fn test_mapping_purpose_strings() {
        assert_eq!(MappingPurpose::SubmissionPrep.as_str(), "submission-prep");
        assert_eq!(
            "batch".parse::<MappingPurpose>().unwrap(),
            MappingPurpose::Batch
        );
        assert_eq!(
            serde_json::to_string(&MappingPurpose::SubmissionPrep).unwrap(),
            "\"submission-prep\""
        );
    }
}
