//! Manufacturer profiles
//!
//! A [`ManufacturerProfile`] describes one manufacturer's IVR form: the target
//! fields, how each is sourced ([`SourceExpression`]), how it is formatted
//! ([`TransformRule`]) and which business rules apply. Profiles are compiled
//! from the catalog file once at load time and are immutable afterwards.

use super::field::FieldKey;
use super::ids::ManufacturerId;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Default output format for date fields (MM/DD/YYYY)
pub const DEFAULT_DATE_FORMAT: &str = "%m/%d/%Y";

/// Source expression of a target field
///
/// Parsed from the catalog strings `a`, `a + b`, `a * b` and `a || b`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceExpression {
    /// Single source field
    Direct(FieldKey),
    /// Space-joined concatenation of the non-empty parts
    Concat(Vec<FieldKey>),
    /// Numeric product; missing or non-numeric parts count as 0
    Product(Vec<FieldKey>),
    /// First non-empty value, left to right
    Fallback(Vec<FieldKey>),
}

impl SourceExpression {
    /// Parses an expression string
    ///
    /// # Examples
    ///
    /// ```
    /// use ivr_mapper::domain::profile::SourceExpression;
    ///
    /// let expr = SourceExpression::parse("patient_first_name + patient_last_name").unwrap();
    /// assert!(matches!(expr, SourceExpression::Concat(ref keys) if keys.len() == 2));
    /// assert!(SourceExpression::parse("a + b || c").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self, String> {
        let input = input.trim();
        if input.is_empty() {
            return Err("Source expression cannot be empty".to_string());
        }

        let has_fallback = input.contains("||");
        let has_concat = input.contains('+');
        let has_product = input.contains('*');

        let operator_count = [has_fallback, has_concat, has_product]
            .iter()
            .filter(|present| **present)
            .count();
        if operator_count > 1 {
            return Err(format!(
                "Source expression '{input}' mixes operators; use one of '+', '*' or '||'"
            ));
        }

        let split = |separator: &str| -> Result<Vec<FieldKey>, String> {
            input
                .split(separator)
                .map(|part| {
                    FieldKey::new(part.trim())
                        .map_err(|e| format!("Invalid operand in source expression '{input}': {e}"))
                })
                .collect()
        };

        if has_fallback {
            Ok(SourceExpression::Fallback(split("||")?))
        } else if has_concat {
            Ok(SourceExpression::Concat(split("+")?))
        } else if has_product {
            Ok(SourceExpression::Product(split("*")?))
        } else {
            FieldKey::new(input)
                .map(SourceExpression::Direct)
                .map_err(|e| format!("Invalid source field '{input}': {e}"))
        }
    }

    /// Source keys referenced by the expression, in order
    pub fn keys(&self) -> Vec<&FieldKey> {
        match self {
            SourceExpression::Direct(key) => vec![key],
            SourceExpression::Concat(keys)
            | SourceExpression::Product(keys)
            | SourceExpression::Fallback(keys) => keys.iter().collect(),
        }
    }
}

impl FromStr for SourceExpression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SourceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |keys: &[FieldKey], separator: &str| {
            keys.iter()
                .map(FieldKey::as_str)
                .collect::<Vec<_>>()
                .join(separator)
        };
        match self {
            SourceExpression::Direct(key) => write!(f, "{key}"),
            SourceExpression::Concat(keys) => write!(f, "{}", join(keys, " + ")),
            SourceExpression::Product(keys) => write!(f, "{}", join(keys, " * ")),
            SourceExpression::Fallback(keys) => write!(f, "{}", join(keys, " || ")),
        }
    }
}

impl Serialize for SourceExpression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Boolean widget convention of a manufacturer form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BooleanStyle {
    /// Text fields: `Yes` / `No`
    #[default]
    YesNo,
    /// PDF checkboxes: `Yes` / `Off`
    YesOff,
}

impl BooleanStyle {
    /// Value written for a true input
    pub fn on_value(&self) -> &'static str {
        "Yes"
    }

    /// Value written for a false or unrecognized input
    pub fn off_value(&self) -> &'static str {
        match self {
            BooleanStyle::YesNo => "No",
            BooleanStyle::YesOff => "Off",
        }
    }
}

impl FromStr for BooleanStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "yes_no" | "yesno" => Ok(BooleanStyle::YesNo),
            "yes_off" | "yesoff" | "checkbox" => Ok(BooleanStyle::YesOff),
            other => Err(format!(
                "Invalid boolean style '{other}'. Must be one of: yes_no, yes_off"
            )),
        }
    }
}

impl fmt::Display for BooleanStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BooleanStyle::YesNo => write!(f, "yes_no"),
            BooleanStyle::YesOff => write!(f, "yes_off"),
        }
    }
}

/// Bucket rendered by a `duration:<unit>` rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationUnit {
    Days,
    Weeks,
    Months,
    Years,
}

impl FromStr for DurationUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "days" | "day" => Ok(DurationUnit::Days),
            "weeks" | "week" => Ok(DurationUnit::Weeks),
            "months" | "month" => Ok(DurationUnit::Months),
            "years" | "year" => Ok(DurationUnit::Years),
            other => Err(format!(
                "Invalid duration unit '{other}'. Must be one of: days, weeks, months, years"
            )),
        }
    }
}

impl fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self {
            DurationUnit::Days => "days",
            DurationUnit::Weeks => "weeks",
            DurationUnit::Months => "months",
            DurationUnit::Years => "years",
        };
        write!(f, "{unit}")
    }
}

/// Formatting rule (type hint) of a target field
///
/// Catalog syntax is `kind` or `kind:argument`, e.g. `date:%Y-%m-%d`,
/// `number:1`, `boolean:yes_off`, `prefix:POS `.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TransformRule {
    /// Inferred from the field name
    #[default]
    Auto,
    Text,
    /// Date with an optional chrono format; the profile default applies otherwise
    Date { format: Option<String> },
    Phone,
    FirstName,
    LastName,
    Number { decimals: u32 },
    Currency { decimals: u32 },
    Percentage { decimals: u32 },
    /// Boolean with an optional style; the profile default applies otherwise
    Boolean { style: Option<BooleanStyle> },
    /// Keyword match against the field's checkbox spec
    Checkbox,
    /// Elapsed time since a start date
    Duration(DurationUnit),
    Upper,
    Lower,
    Title,
    Prefix(String),
}

impl FromStr for TransformRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, argument) = match s.split_once(':') {
            Some((kind, argument)) => (kind.trim().to_lowercase(), Some(argument)),
            None => (s.trim().to_lowercase(), None),
        };

        let decimals = |default: u32| -> Result<u32, String> {
            match argument {
                Some(arg) => arg
                    .trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|d| *d <= 6)
                    .ok_or_else(|| format!("Invalid decimal places '{arg}' in transform '{s}'")),
                None => Ok(default),
            }
        };

        match kind.as_str() {
            "" | "auto" => Ok(TransformRule::Auto),
            "text" | "string" => Ok(TransformRule::Text),
            "date" => Ok(TransformRule::Date {
                format: argument
                    .map(|f| normalize_date_format(f.trim()))
                    .filter(|f| !f.is_empty()),
            }),
            "phone" => Ok(TransformRule::Phone),
            "first_name" => Ok(TransformRule::FirstName),
            "last_name" => Ok(TransformRule::LastName),
            "number" => Ok(TransformRule::Number {
                decimals: decimals(2)?,
            }),
            "currency" => Ok(TransformRule::Currency {
                decimals: decimals(2)?,
            }),
            "percentage" | "percent" => Ok(TransformRule::Percentage {
                decimals: decimals(2)?,
            }),
            "boolean" | "bool" => Ok(TransformRule::Boolean {
                style: argument.map(BooleanStyle::from_str).transpose()?,
            }),
            "checkbox" => Ok(TransformRule::Checkbox),
            "duration" => Ok(TransformRule::Duration(
                argument.unwrap_or("weeks").parse::<DurationUnit>()?,
            )),
            "upper" | "uppercase" => Ok(TransformRule::Upper),
            "lower" | "lowercase" => Ok(TransformRule::Lower),
            "title" | "title_case" => Ok(TransformRule::Title),
            "prefix" => Ok(TransformRule::Prefix(argument.unwrap_or_default().to_string())),
            other => Err(format!("Unknown transform '{other}'")),
        }
    }
}

impl fmt::Display for TransformRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformRule::Auto => write!(f, "auto"),
            TransformRule::Text => write!(f, "text"),
            TransformRule::Date { format: Some(format) } => write!(f, "date:{format}"),
            TransformRule::Date { format: None } => write!(f, "date"),
            TransformRule::Phone => write!(f, "phone"),
            TransformRule::FirstName => write!(f, "first_name"),
            TransformRule::LastName => write!(f, "last_name"),
            TransformRule::Number { decimals } => write!(f, "number:{decimals}"),
            TransformRule::Currency { decimals } => write!(f, "currency:{decimals}"),
            TransformRule::Percentage { decimals } => write!(f, "percentage:{decimals}"),
            TransformRule::Boolean { style: Some(style) } => write!(f, "boolean:{style}"),
            TransformRule::Boolean { style: None } => write!(f, "boolean"),
            TransformRule::Checkbox => write!(f, "checkbox"),
            TransformRule::Duration(unit) => write!(f, "duration:{unit}"),
            TransformRule::Upper => write!(f, "upper"),
            TransformRule::Lower => write!(f, "lower"),
            TransformRule::Title => write!(f, "title"),
            TransformRule::Prefix(prefix) => write!(f, "prefix:{prefix}"),
        }
    }
}

impl Serialize for TransformRule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Accepts the human spellings used in manufacturer paperwork
///
/// `MM/DD/YYYY` and `m/d/Y` both become `%m/%d/%Y`; chrono formats pass through.
pub fn normalize_date_format(format: &str) -> String {
    if format.contains('%') {
        return format.to_string();
    }
    let upper = format.to_uppercase();
    if upper.contains("YYYY") || upper.contains("DD") || upper.contains("MM") {
        return upper
            .replace("YYYY", "%Y")
            .replace("YY", "%y")
            .replace("MM", "%m")
            .replace("DD", "%d");
    }
    format
        .chars()
        .map(|c| match c {
            'Y' => "%Y".to_string(),
            'y' => "%y".to_string(),
            'm' => "%m".to_string(),
            'n' => "%-m".to_string(),
            'd' => "%d".to_string(),
            'j' => "%-d".to_string(),
            other => other.to_string(),
        })
        .collect()
}

/// Keyword set of a checkbox field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckboxSpec {
    /// Case-insensitive keywords; any match ticks the box
    pub keywords: Vec<String>,
    /// Value written when ticked
    pub on_value: String,
}

/// One target field of a manufacturer form
#[derive(Debug, Clone, Serialize)]
pub struct TargetField {
    /// Field name in the mapped payload
    pub name: FieldKey,
    /// Declared source; `None` means fuzzy/heuristic resolution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<SourceExpression>,
    /// Formatting rule
    pub rule: TransformRule,
    /// Whether an empty value blocks submission
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkbox: Option<CheckboxSpec>,
    /// Label of the field on the e-signature template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_field: Option<String>,
}

impl TargetField {
    /// Label used when sending the value to the e-signature template
    pub fn template_label(&self) -> &str {
        self.template_field
            .as_deref()
            .unwrap_or_else(|| self.name.as_str())
    }
}

/// Whether a rule failure blocks submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(Severity::Error),
            "warning" | "warn" => Ok(Severity::Warning),
            other => Err(format!(
                "Invalid severity '{other}'. Must be one of: error, warning"
            )),
        }
    }
}

/// Manufacturer-specific business rule
#[derive(Debug, Clone)]
pub enum BusinessRule {
    /// Wound duration must be strictly greater than `weeks`
    MinWoundDuration { weeks: u32, severity: Severity },
    /// `field` becomes required when `when_field` is filled (optionally with a given value)
    RequiredIf {
        field: FieldKey,
        when_field: FieldKey,
        equals: Option<String>,
        severity: Severity,
    },
    /// A present value of `field` must match `pattern`
    Pattern {
        field: FieldKey,
        pattern: Regex,
        message: Option<String>,
        severity: Severity,
    },
    /// A present value of `field` must be one of `values` (case-insensitive)
    OneOf {
        field: FieldKey,
        values: Vec<String>,
        severity: Severity,
    },
}

impl BusinessRule {
    /// Human readable description for catalog listings
    pub fn describe(&self) -> String {
        match self {
            BusinessRule::MinWoundDuration { weeks, .. } => {
                format!("wound duration greater than {weeks} weeks")
            }
            BusinessRule::RequiredIf {
                field,
                when_field,
                equals: Some(value),
                ..
            } => format!("{field} required when {when_field} is '{value}'"),
            BusinessRule::RequiredIf {
                field, when_field, ..
            } => format!("{field} required when {when_field} is provided"),
            BusinessRule::Pattern { field, pattern, .. } => {
                format!("{field} must match {}", pattern.as_str())
            }
            BusinessRule::OneOf { field, values, .. } => {
                format!("{field} must be one of: {}", values.join(", "))
            }
        }
    }

    /// Severity of a failure
    pub fn severity(&self) -> Severity {
        match self {
            BusinessRule::MinWoundDuration { severity, .. }
            | BusinessRule::RequiredIf { severity, .. }
            | BusinessRule::Pattern { severity, .. }
            | BusinessRule::OneOf { severity, .. } => *severity,
        }
    }
}

/// Compiled manufacturer profile
#[derive(Debug, Clone)]
pub struct ManufacturerProfile {
    pub id: ManufacturerId,
    pub name: String,
    /// External e-signature template
    pub template_id: String,
    pub signature_required: bool,
    pub has_order_form: bool,
    pub order_form_template_id: Option<String>,
    /// Default chrono format for date fields
    pub date_format: String,
    /// Default boolean widget convention
    pub boolean_style: BooleanStyle,
    /// Target fields in form order
    pub fields: Vec<TargetField>,
    pub rules: Vec<BusinessRule>,
}

impl ManufacturerProfile {
    /// Looks up a target field
    pub fn field(&self, name: &str) -> Option<&TargetField> {
        self.fields.iter().find(|f| f.name.as_str() == name)
    }

    /// Target fields flagged as required
    pub fn required_fields(&self) -> impl Iterator<Item = &TargetField> {
        self.fields.iter().filter(|f| f.required)
    }

    /// Whether the name matches the id or display name (case-insensitive)
    pub fn matches_name(&self, id_or_name: &str) -> bool {
        let wanted = normalize_manufacturer_name(id_or_name);
        wanted == normalize_manufacturer_name(self.id.as_str())
            || wanted == normalize_manufacturer_name(&self.name)
    }

    /// Listing view
    pub fn summary(&self) -> ManufacturerSummary {
        ManufacturerSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            template_id: self.template_id.clone(),
            signature_required: self.signature_required,
            has_order_form: self.has_order_form,
            field_count: self.fields.len(),
            required_field_count: self.required_fields().count(),
        }
    }

    /// Detail view including fields and rule descriptions
    pub fn detail(&self) -> ManufacturerDetail {
        ManufacturerDetail {
            summary: self.summary(),
            order_form_template_id: self.order_form_template_id.clone(),
            date_format: self.date_format.clone(),
            boolean_style: self.boolean_style.to_string(),
            fields: self.fields.clone(),
            rules: self.rules.iter().map(BusinessRule::describe).collect(),
        }
    }
}

/// Lowercase alphanumerics only, so "ACZ & Associates" finds `acz-associates`
pub fn normalize_manufacturer_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Manufacturer listing entry
#[derive(Debug, Clone, Serialize)]
pub struct ManufacturerSummary {
    pub id: ManufacturerId,
    pub name: String,
    pub template_id: String,
    pub signature_required: bool,
    pub has_order_form: bool,
    pub field_count: usize,
    pub required_field_count: usize,
}

/// Manufacturer detail view
#[derive(Debug, Clone, Serialize)]
pub struct ManufacturerDetail {
    #[serde(flatten)]
    pub summary: ManufacturerSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_form_template_id: Option<String>,
    pub date_format: String,
    pub boolean_style: String,
    pub fields: Vec<TargetField>,
    pub rules: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(expr: &SourceExpression) -> Vec<String> {
        expr.keys().iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_parse_expression_variants() {
        let direct = SourceExpression::parse("patient_dob").unwrap();
        assert_eq!(direct, SourceExpression::Direct(FieldKey::new("patient_dob").unwrap()));

        let concat = SourceExpression::parse("patient_first_name + patient_last_name").unwrap();
        assert!(matches!(concat, SourceExpression::Concat(_)));
        assert_eq!(keys(&concat), vec!["patient_first_name", "patient_last_name"]);

        let product = SourceExpression::parse("wound_size_length*wound_size_width").unwrap();
        assert!(matches!(product, SourceExpression::Product(_)));

        let fallback =
            SourceExpression::parse("patient_member_id || primary_member_id || member_id")
                .unwrap();
        assert!(matches!(fallback, SourceExpression::Fallback(ref k) if k.len() == 3));
    }

    #[test]
    fn test_parse_expression_rejects_bad_input() {
        assert!(SourceExpression::parse("").is_err());
        assert!(SourceExpression::parse("a + ").is_err());
        assert!(SourceExpression::parse("a || b + c").is_err());
        assert!(SourceExpression::parse("a * b + c").is_err());
        assert!(SourceExpression::parse("two words").is_err());
    }

    #[test]
    fn test_expression_display_round_trip() {
        let text = "wound_size_length * wound_size_width";
        let expr = SourceExpression::parse(text).unwrap();
        assert_eq!(expr.to_string(), text);
    }

    #[test]
    fn test_parse_transform_rules() {
        assert_eq!("".parse::<TransformRule>().unwrap(), TransformRule::Auto);
        assert_eq!(
            "date:m/d/Y".parse::<TransformRule>().unwrap(),
            TransformRule::Date {
                format: Some("%m/%d/%Y".to_string())
            }
        );
        assert_eq!(
            "date:YYYY-MM-DD".parse::<TransformRule>().unwrap(),
            TransformRule::Date {
                format: Some("%Y-%m-%d".to_string())
            }
        );
        assert_eq!(
            "number:1".parse::<TransformRule>().unwrap(),
            TransformRule::Number { decimals: 1 }
        );
        assert_eq!(
            "boolean:yes_off".parse::<TransformRule>().unwrap(),
            TransformRule::Boolean {
                style: Some(BooleanStyle::YesOff)
            }
        );
        assert_eq!(
            "prefix:POS ".parse::<TransformRule>().unwrap(),
            TransformRule::Prefix("POS ".to_string())
        );
        assert_eq!(
            "duration".parse::<TransformRule>().unwrap(),
            TransformRule::Duration(DurationUnit::Weeks)
        );
        assert!("number:abc".parse::<TransformRule>().is_err());
        assert!("sparkle".parse::<TransformRule>().is_err());
    }

    #[test]
    fn test_boolean_style_values() {
        assert_eq!(BooleanStyle::YesNo.off_value(), "No");
        assert_eq!(BooleanStyle::YesOff.off_value(), "Off");
        assert_eq!("yes-off".parse::<BooleanStyle>().unwrap(), BooleanStyle::YesOff);
        assert!("maybe".parse::<BooleanStyle>().is_err());
    }

    #[test]
    fn test_normalize_manufacturer_name() {
        assert_eq!(
            normalize_manufacturer_name("ACZ & Associates"),
            normalize_manufacturer_name("acz-associates")
        );
        assert_eq!(normalize_manufacturer_name("BioWound"), "biowound");
    }
}
