//! Rule validation
//!
//! The [`RuleValidator`] checks a mapped payload against a manufacturer
//! profile: required fields, the profile's business rules and the catalog's
//! suffix-based format checks. Rule failures with [`Severity::Error`] make
//! the report invalid; everything else is a warning.

use crate::config::{FormatCheck, ManufacturerCatalog};
use crate::core::transform::date::{date_of, parse_date};
use crate::core::transform::WoundDuration;
use crate::domain::field::SourceFieldBag;
use crate::domain::mapping::ValidationReport;
use crate::domain::profile::{BusinessRule, ManufacturerProfile, Severity};
use chrono::{NaiveDate, Utc};
use std::collections::BTreeMap;

/// Source values rules may consult besides the mapped payload
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub source: Option<&'a SourceFieldBag>,
    /// Reference day for durations computed from a start date
    pub today: NaiveDate,
}

impl<'a> ValidationContext<'a> {
    pub fn new(source: Option<&'a SourceFieldBag>, today: NaiveDate) -> Self {
        Self { source, today }
    }
}

impl Default for ValidationContext<'_> {
    fn default() -> Self {
        Self {
            source: None,
            today: Utc::now().date_naive(),
        }
    }
}

/// Lookup over the mapped payload first, then the source bag
struct Values<'a> {
    mapped: &'a BTreeMap<String, String>,
    context: &'a ValidationContext<'a>,
}

impl Values<'_> {
    fn text(&self, name: &str) -> Option<String> {
        if let Some(value) = self.mapped.get(name).filter(|v| !v.trim().is_empty()) {
            return Some(value.trim().to_string());
        }
        self.context
            .source
            .and_then(|bag| bag.get_filled(name))
            .map(|value| value.as_text())
            .filter(|text| !text.is_empty())
    }

    fn number(&self, name: &str) -> Option<f64> {
        if let Some(value) = self.context.source.and_then(|bag| bag.get_filled(name)) {
            if let Some(n) = value.as_number() {
                return Some(n);
            }
        }
        self.mapped
            .get(name)
            .and_then(|text| text.trim().parse::<f64>().ok())
    }

    /// Elapsed wound days from the computed fields or the start date
    fn wound_days(&self) -> Option<i64> {
        if let Some(days) = self.number("wound_duration_days") {
            return Some(days as i64);
        }
        if let Some(weeks) = self.number("wound_duration_weeks") {
            return Some(weeks as i64 * 7);
        }
        let start = self
            .context
            .source
            .and_then(|bag| bag.get_filled("wound_start_date"))
            .and_then(date_of)
            .or_else(|| {
                self.mapped
                    .get("wound_start_date")
                    .and_then(|text| parse_date(text))
            })?;
        Some(WoundDuration::between(start, self.context.today).days)
    }
}

/// Validates mapped payloads against manufacturer profiles
#[derive(Debug, Clone, Default)]
pub struct RuleValidator {
    format_checks: Vec<FormatCheck>,
}

impl RuleValidator {
    pub fn new(format_checks: Vec<FormatCheck>) -> Self {
        Self { format_checks }
    }

    /// Validator using the catalog's format checks
    pub fn from_catalog(catalog: &ManufacturerCatalog) -> Self {
        Self::new(catalog.format_checks().to_vec())
    }

    /// Validates the payload alone
    ///
    /// # Examples
    ///
    /// ```
    /// use ivr_mapper::config::ManufacturerCatalog;
    /// use ivr_mapper::core::validate::RuleValidator;
    /// use std::collections::BTreeMap;
    ///
    /// let catalog = ManufacturerCatalog::builtin().unwrap();
    /// let profile = catalog.get("acz-associates").unwrap();
    /// let report = RuleValidator::from_catalog(&catalog).validate(&BTreeMap::new(), &profile);
    /// assert!(!report.valid);
    /// assert!(report.errors.iter().any(|e| e.contains("patient_name")));
    /// ```
    pub fn validate(
        &self,
        mapped: &BTreeMap<String, String>,
        profile: &ManufacturerProfile,
    ) -> ValidationReport {
        self.validate_with_context(mapped, profile, &ValidationContext::default())
    }

    /// Validates the payload, letting rules read source values not exported
    /// as target fields
    pub fn validate_with_context(
        &self,
        mapped: &BTreeMap<String, String>,
        profile: &ManufacturerProfile,
        context: &ValidationContext<'_>,
    ) -> ValidationReport {
        let mut report = ValidationReport::passing();
        let values = Values { mapped, context };

        for field in profile.required_fields() {
            let filled = mapped
                .get(field.name.as_str())
                .is_some_and(|v| !v.trim().is_empty());
            if !filled {
                report.add_error(format!(
                    "Required field '{}' is missing or empty",
                    field.name
                ));
            }
        }

        for rule in &profile.rules {
            if let Some(message) = check_rule(rule, &values, profile, &mut report) {
                match rule.severity() {
                    Severity::Error => report.add_error(message),
                    Severity::Warning => report.add_warning(message),
                }
            }
        }

        for (name, value) in mapped {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            for check in self.format_checks.iter().filter(|c| c.applies_to(name)) {
                if !check.pattern.is_match(value) {
                    report.add_warning(format!("Field '{name}' {}", check.message));
                }
            }
        }

        let missing_optional: Vec<&str> = profile
            .fields
            .iter()
            .filter(|f| !f.required)
            .filter(|f| {
                mapped
                    .get(f.name.as_str())
                    .map_or(true, |v| v.trim().is_empty())
            })
            .map(|f| f.name.as_str())
            .collect();
        if !missing_optional.is_empty() {
            report.add_warning(format!(
                "Optional fields not provided: {}",
                missing_optional.join(", ")
            ));
        }

        report
    }
}

/// Evaluates one business rule, returning the failure message
///
/// Diagnostics that are warnings regardless of the rule's severity are
/// written to `report` directly.
fn check_rule(
    rule: &BusinessRule,
    values: &Values<'_>,
    profile: &ManufacturerProfile,
    report: &mut ValidationReport,
) -> Option<String> {
    match rule {
        BusinessRule::MinWoundDuration { weeks, .. } => match values.wound_days() {
            Some(days) if days > i64::from(*weeks) * 7 => None,
            Some(days) => Some(format!(
                "Wound duration must be greater than {weeks} weeks for {} (currently {} weeks)",
                profile.name,
                days / 7
            )),
            None => {
                report.add_warning(format!(
                    "Wound duration could not be determined; {} requires more than {weeks} weeks",
                    profile.name
                ));
                None
            }
        },
        BusinessRule::RequiredIf {
            field,
            when_field,
            equals,
            ..
        } => {
            let trigger = values.text(when_field.as_str())?;
            if let Some(expected) = equals {
                if !trigger.eq_ignore_ascii_case(expected.trim()) {
                    return None;
                }
            }
            if values.text(field.as_str()).is_some() {
                return None;
            }
            Some(match equals {
                Some(expected) => {
                    format!("Field '{field}' is required when '{when_field}' is '{expected}'")
                }
                None => format!("Field '{field}' is required when '{when_field}' is provided"),
            })
        }
        BusinessRule::Pattern {
            field,
            pattern,
            message,
            ..
        } => {
            let value = values.mapped.get(field.as_str()).map(|v| v.trim())?;
            if value.is_empty() || pattern.is_match(value) {
                return None;
            }
            Some(match message {
                Some(message) => format!("Field '{field}' {message}"),
                None => format!("Field '{field}' has an invalid format"),
            })
        }
        BusinessRule::OneOf { field, values: allowed, .. } => {
            let value = values.mapped.get(field.as_str()).map(|v| v.trim())?;
            if value.is_empty() || allowed.iter().any(|a| a.trim().eq_ignore_ascii_case(value)) {
                return None;
            }
            Some(format!(
                "Field '{field}' must be one of: {}",
                allowed.join(", ")
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const CATALOG: &str = r#"
[[manufacturers]]
id = "rule-co"
name = "Rule Co"
template_id = "7"

[[manufacturers.fields]]
name = "patient_name"
required = true

[[manufacturers.fields]]
name = "provider_npi"

[[manufacturers.fields]]
name = "secondary_member_id"

[[manufacturers.fields]]
name = "place_of_service"

[[manufacturers.fields]]
name = "primary_icd10"

[[manufacturers.rules]]
kind = "min_wound_duration"
weeks = 4

[[manufacturers.rules]]
kind = "required_if"
field = "secondary_member_id"
when_field = "secondary_insurance_name"

[[manufacturers.rules]]
kind = "one_of"
field = "place_of_service"
values = ["POS 11", "POS 22"]

[[manufacturers.rules]]
kind = "pattern"
field = "primary_icd10"
regex = '^[A-Z]\d{2}(\.\d{1,4})?$'
message = "must be an ICD-10 code"
"#;

    fn setup() -> (RuleValidator, std::sync::Arc<ManufacturerProfile>) {
        let catalog = ManufacturerCatalog::from_toml_str(CATALOG).unwrap();
        let profile = catalog.get("rule-co").unwrap();
        (RuleValidator::from_catalog(&catalog), profile)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn mapped(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn bag_with_start(weeks_ago: i64) -> SourceFieldBag {
        let mut bag = SourceFieldBag::new();
        bag.set("wound_start_date", today() - Duration::weeks(weeks_ago));
        bag
    }

    #[test]
    fn test_required_field_missing_is_error() {
        let (validator, profile) = setup();
        let report = validator.validate(&mapped(&[("patient_name", "  ")]), &profile);
        assert!(!report.valid);
        assert_eq!(
            report.errors[0],
            "Required field 'patient_name' is missing or empty"
        );
    }

    #[test]
    fn test_short_wound_duration_is_warning() {
        let (validator, profile) = setup();
        let bag = bag_with_start(2);
        let context = ValidationContext::new(Some(&bag), today());
        let report = validator.validate_with_context(
            &mapped(&[("patient_name", "Jane Doe")]),
            &profile,
            &context,
        );

        assert!(report.valid);
        assert!(report.warnings.iter().any(|w| w
            == "Wound duration must be greater than 4 weeks for Rule Co (currently 2 weeks)"));
    }

    #[test]
    fn test_long_wound_duration_passes() {
        let (validator, profile) = setup();
        let bag = bag_with_start(6);
        let context = ValidationContext::new(Some(&bag), today());
        let report = validator.validate_with_context(
            &mapped(&[("patient_name", "Jane Doe")]),
            &profile,
            &context,
        );
        assert!(!report.warnings.iter().any(|w| w.contains("Wound duration")));
    }

    #[test]
    fn test_weeks_used_when_days_absent() {
        let (validator, profile) = setup();
        let mut bag = SourceFieldBag::new();
        bag.set("wound_duration_weeks", 3.0);
        let context = ValidationContext::new(Some(&bag), today());
        let report = validator.validate_with_context(
            &mapped(&[("patient_name", "Jane Doe")]),
            &profile,
            &context,
        );
        assert!(report.warnings.iter().any(|w| w.contains("currently 3 weeks")));
    }

    #[test]
    fn test_undetermined_duration_warns() {
        let (validator, profile) = setup();
        let report = validator.validate(&mapped(&[("patient_name", "Jane Doe")]), &profile);
        assert!(report.valid);
        assert!(report
            .warnings
            .iter()
            .any(|w| w.starts_with("Wound duration could not be determined")));
    }

    #[test]
    fn test_required_if_is_error_by_default() {
        let (validator, profile) = setup();
        let mut bag = bag_with_start(8);
        bag.set("secondary_insurance_name", "Aetna");
        let context = ValidationContext::new(Some(&bag), today());
        let report = validator.validate_with_context(
            &mapped(&[("patient_name", "Jane Doe")]),
            &profile,
            &context,
        );
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("secondary_member_id")));
    }

    #[test]
    fn test_one_of_and_pattern_warn() {
        let (validator, profile) = setup();
        let report = validator.validate(
            &mapped(&[
                ("patient_name", "Jane Doe"),
                ("place_of_service", "POS 99"),
                ("primary_icd10", "not-a-code"),
            ]),
            &profile,
        );
        assert!(report.valid);
        assert!(report
            .warnings
            .contains(&"Field 'place_of_service' must be one of: POS 11, POS 22".to_string()));
        assert!(report
            .warnings
            .contains(&"Field 'primary_icd10' must be an ICD-10 code".to_string()));
    }

    #[test]
    fn test_format_checks_by_suffix() {
        let (validator, profile) = setup();
        let report = validator.validate(
            &mapped(&[("patient_name", "Jane Doe"), ("provider_npi", "12345")]),
            &profile,
        );
        assert!(report
            .warnings
            .iter()
            .any(|w| w.starts_with("Field 'provider_npi'")));
    }

    #[test]
    fn test_missing_optional_summary() {
        let (validator, profile) = setup();
        let report = validator.validate(&mapped(&[("patient_name", "Jane Doe")]), &profile);
        assert!(report.warnings.iter().any(|w| w
            == "Optional fields not provided: provider_npi, secondary_member_id, place_of_service, primary_icd10"));
    }
}
