//! Field value formatting
//!
//! This module turns raw source values into the strings manufacturer forms
//! expect. Every transform is total: an absent value yields `""`, unparsable
//! input degrades to a documented default and nothing here panics or errors.
//!
//! The [`TransformRule`] of a target field selects the formatter:
//!
//! - **date** - flexible parse, profile or field date format
//! - **phone** - `(XXX) XXX-XXXX` / `+1 (XXX) XXX-XXXX`
//! - **number / currency / percentage** - fixed decimals
//! - **boolean / checkbox** - `Yes` and the style's off value
//! - **duration** - elapsed wound time in one bucket
//! - **text shaping** - upper, lower, title, prefix
//!
//! [`TransformRule::Auto`] infers the formatter from the field name.

pub mod choice;
pub mod date;
pub mod duration;
pub mod name;
pub mod numeric;
pub mod phone;
pub mod text;

pub use duration::WoundDuration;
pub use numeric::wound_area;

use crate::domain::field::FieldValue;
use crate::domain::profile::{
    BooleanStyle, CheckboxSpec, ManufacturerProfile, TargetField, TransformRule,
    DEFAULT_DATE_FORMAT,
};
use chrono::{NaiveDate, Utc};

/// Profile-level defaults a rule falls back on
#[derive(Debug, Clone, Copy)]
pub struct TransformOptions<'a> {
    /// Date format used when a `date` rule declares none
    pub date_format: &'a str,
    /// Boolean style used when a `boolean` rule declares none
    pub boolean_style: BooleanStyle,
    pub checkbox: Option<&'a CheckboxSpec>,
    /// Reference day for durations
    pub today: NaiveDate,
}

impl<'a> TransformOptions<'a> {
    /// Defaults of `profile` for one of its fields
    pub fn for_field(
        profile: &'a ManufacturerProfile,
        field: &'a TargetField,
        today: NaiveDate,
    ) -> Self {
        Self {
            date_format: &profile.date_format,
            boolean_style: profile.boolean_style,
            checkbox: field.checkbox.as_ref(),
            today,
        }
    }
}

impl Default for TransformOptions<'_> {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT,
            boolean_style: BooleanStyle::default(),
            checkbox: None,
            today: Utc::now().date_naive(),
        }
    }
}

/// Formats one value under `rule`
///
/// # Examples
///
/// ```
/// use ivr_mapper::core::transform::{transform, TransformOptions};
/// use ivr_mapper::domain::{FieldValue, TransformRule};
///
/// let options = TransformOptions::default();
/// let dob = FieldValue::from("1980-12-25");
/// assert_eq!(transform(Some(&dob), "patient_dob", &TransformRule::Auto, &options), "12/25/1980");
///
/// let rule: TransformRule = "currency".parse().unwrap();
/// let amount = FieldValue::from(1234.5);
/// assert_eq!(transform(Some(&amount), "price", &rule, &options), "$1,234.50");
///
/// assert_eq!(transform(None, "patient_phone", &TransformRule::Phone, &options), "");
/// ```
pub fn transform(
    value: Option<&FieldValue>,
    field_name: &str,
    rule: &TransformRule,
    options: &TransformOptions<'_>,
) -> String {
    let value = match value {
        Some(value) if !value.is_empty() => value,
        _ => return String::new(),
    };

    match rule {
        TransformRule::Auto => transform(Some(value), field_name, &infer_rule(field_name), options),
        TransformRule::Text => value.as_text(),
        TransformRule::Date { format } => {
            date::transform_date(value, format.as_deref().unwrap_or(options.date_format))
        }
        TransformRule::Phone => phone::format_phone(&value.as_text()),
        TransformRule::FirstName => name::first_name(&value.as_text()),
        TransformRule::LastName => name::last_name(&value.as_text()),
        TransformRule::Number { decimals } => {
            numeric::format_number(numeric::numeric_or_zero(Some(value)), *decimals)
        }
        TransformRule::Currency { decimals } => {
            numeric::format_currency(numeric::numeric_or_zero(Some(value)), *decimals)
        }
        TransformRule::Percentage { decimals } => {
            numeric::format_percentage(numeric::numeric_or_zero(Some(value)), *decimals)
        }
        TransformRule::Boolean { style } => {
            choice::format_boolean(value, style.unwrap_or(options.boolean_style))
        }
        TransformRule::Checkbox => match options.checkbox {
            Some(spec) => choice::format_checkbox(value, spec, options.boolean_style),
            None => choice::format_boolean(value, options.boolean_style),
        },
        TransformRule::Duration(unit) => match value {
            // already a computed bucket
            FieldValue::Number(n) => numeric::format_number(*n, 0),
            other => WoundDuration::since(date::date_of(other), options.today)
                .in_unit(*unit)
                .to_string(),
        },
        TransformRule::Upper => text::upper(&value.as_text()),
        TransformRule::Lower => text::lower(&value.as_text()),
        TransformRule::Title => text::title(&value.as_text()),
        TransformRule::Prefix(marker) => text::prefix(&value.as_text(), marker),
    }
}

/// Rule implied by a field name
pub fn infer_rule(field_name: &str) -> TransformRule {
    let name = field_name.to_lowercase();
    if name == "dob" || name.ends_with("_dob") || name == "date" || name.ends_with("_date") {
        TransformRule::Date { format: None }
    } else if name.contains("phone") || name == "fax" || name.ends_with("_fax") {
        TransformRule::Phone
    } else {
        TransformRule::Text
    }
}

/// Applies profile defaults and a fixed or current reference day
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldTransformer {
    reference_date: Option<NaiveDate>,
}

impl FieldTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins the day durations are measured to
    pub fn with_reference_date(reference_date: NaiveDate) -> Self {
        Self {
            reference_date: Some(reference_date),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| Utc::now().date_naive())
    }

    /// Formats the value of one target field of `profile`
    pub fn transform_field(
        &self,
        value: Option<&FieldValue>,
        field: &TargetField,
        profile: &ManufacturerProfile,
    ) -> String {
        let options = TransformOptions::for_field(profile, field, self.today());
        transform(value, field.name.as_str(), &field.rule, &options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use test_case::test_case;

    fn options() -> TransformOptions<'static> {
        TransformOptions {
            today: NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
            ..TransformOptions::default()
        }
    }

    fn rule(text: &str) -> TransformRule {
        text.parse().unwrap()
    }

    #[test_case("patient_dob", "1980-12-25", "12/25/1980" ; "dob inferred as date")]
    #[test_case("expected_service_date", "2025-07-01", "07/01/2025" ; "date suffix")]
    #[test_case("patient_phone", "15551234567", "+1 (555) 123-4567" ; "phone inferred")]
    #[test_case("facility_fax", "5551234567", "(555) 123-4567" ; "fax inferred")]
    #[test_case("wound_location", " Left heel ", "Left heel" ; "text default")]
    fn test_auto_rule(field: &str, input: &str, expected: &str) {
        let value = FieldValue::from(input);
        assert_eq!(transform(Some(&value), field, &TransformRule::Auto, &options()), expected);
    }

    #[test_case("number", "abc", "0.00" ; "number default")]
    #[test_case("currency", "n/a", "$0.00" ; "currency default")]
    #[test_case("percentage", "", "" ; "empty is absent")]
    #[test_case("percentage", "12.5", "12.50%" ; "percentage")]
    #[test_case("number:1", "16.123", "16.1" ; "decimals")]
    #[test_case("date:%Y-%m-%d", "12/25/1980", "1980-12-25" ; "explicit date format")]
    #[test_case("date", "garbage", "" ; "unparsable date")]
    #[test_case("first_name", "Jane Q Public", "Jane" ; "first name")]
    #[test_case("last_name", "Jane Q Public", "Public" ; "last name")]
    #[test_case("upper", "tx", "TX" ; "upper")]
    #[test_case("title", "venous_leg_ulcer", "Venous Leg Ulcer" ; "title")]
    #[test_case("prefix:POS ", "11", "POS 11" ; "prefix")]
    #[test_case("boolean", "no", "No" ; "boolean yes no")]
    #[test_case("boolean:yes_off", "false", "Off" ; "boolean yes off")]
    fn test_rules(rule_text: &str, input: &str, expected: &str) {
        let value = FieldValue::from(input);
        assert_eq!(
            transform(Some(&value), "field", &rule(rule_text), &options()),
            expected
        );
    }

    #[test]
    fn test_absent_value_is_empty_for_every_rule() {
        for text in [
            "auto", "text", "date", "phone", "first_name", "last_name", "number", "currency",
            "percentage", "boolean", "checkbox", "duration:days", "upper", "lower", "title",
            "prefix:POS ",
        ] {
            assert_eq!(transform(None, "field", &rule(text), &options()), "", "rule {text}");
        }
    }

    #[test]
    fn test_duration_rule_from_start_date() {
        let opts = options();
        let start = FieldValue::from(opts.today - Duration::weeks(6));
        assert_eq!(transform(Some(&start), "wound_duration", &rule("duration:weeks"), &opts), "6");
        assert_eq!(transform(Some(&start), "wound_duration", &rule("duration:days"), &opts), "42");

        let future = FieldValue::from(opts.today + Duration::days(10));
        assert_eq!(transform(Some(&future), "wound_duration", &rule("duration"), &opts), "0");

        let precomputed = FieldValue::from(7.0);
        assert_eq!(transform(Some(&precomputed), "wound_duration", &rule("duration"), &opts), "7");
    }

    #[test]
    fn test_checkbox_uses_field_spec() {
        let spec = CheckboxSpec {
            keywords: vec!["vlu".to_string(), "venous".to_string()],
            on_value: "Yes".to_string(),
        };
        let opts = TransformOptions {
            boolean_style: BooleanStyle::YesOff,
            checkbox: Some(&spec),
            ..options()
        };
        let venous = FieldValue::from("Venous Leg Ulcer");
        let dfu = FieldValue::from("DFU");
        assert_eq!(transform(Some(&venous), "wound_vlu", &TransformRule::Checkbox, &opts), "Yes");
        assert_eq!(transform(Some(&dfu), "wound_vlu", &TransformRule::Checkbox, &opts), "Off");
    }

    #[test]
    fn test_field_transformer_reference_date() {
        let transformer =
            FieldTransformer::with_reference_date(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(transformer.today(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    }
}
