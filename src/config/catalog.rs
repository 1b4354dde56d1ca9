//! Manufacturer catalog loader
//!
//! The catalog is a separate TOML file (see `config/manufacturers.toml`) holding
//! the manufacturer profiles, the semantic alias table used by the heuristic
//! matcher and the suffix-keyed format checks used by the validator. Source
//! expressions, transform rules and business rules are compiled here, once, so
//! a malformed profile fails at startup rather than on the first request.

use crate::domain::errors::IvrError;
use crate::domain::field::FieldKey;
use crate::domain::ids::ManufacturerId;
use crate::domain::profile::{
    normalize_date_format, BooleanStyle, BusinessRule, CheckboxSpec, ManufacturerProfile,
    ManufacturerSummary, Severity, SourceExpression, TargetField, TransformRule,
    DEFAULT_DATE_FORMAT,
};
use crate::domain::result::Result;
use chrono::format::{Item, StrftimeItems};
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

/// Catalog shipped with the crate; written by `ivr-mapper init`
pub const DEFAULT_CATALOG: &str = include_str!("../../config/manufacturers.toml");

/// Warning check applied to every present field whose name ends with `suffix`
#[derive(Debug, Clone)]
pub struct FormatCheck {
    pub suffix: String,
    pub pattern: Regex,
    pub message: String,
}

impl FormatCheck {
    fn new(suffix: &str, pattern: &str, message: &str) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| {
            IvrError::Configuration(format!("Invalid format check pattern for '{suffix}': {e}"))
        })?;
        Ok(Self {
            suffix: suffix.to_string(),
            pattern,
            message: message.to_string(),
        })
    }

    /// NPI, ZIP and email checks used when the catalog declares none
    pub fn defaults() -> Result<Vec<Self>> {
        Ok(vec![
            Self::new("_npi", r"^\d{10}$", "must be a 10-digit NPI")?,
            Self::new("_zip", r"^\d{5}(-\d{4})?$", "must be a 5-digit or ZIP+4 code")?,
            Self::new(
                "_email",
                r"^[^@\s]+@[^@\s]+\.[^@\s]+$",
                "must be a valid email address",
            )?,
        ])
    }

    /// Whether the check covers this field name
    pub fn applies_to(&self, field: &str) -> bool {
        field.ends_with(self.suffix.as_str())
    }
}

/// Compiled manufacturer catalog
#[derive(Debug, Clone)]
pub struct ManufacturerCatalog {
    profiles: Vec<Arc<ManufacturerProfile>>,
    alias_groups: BTreeMap<String, Vec<String>>,
    format_checks: Vec<FormatCheck>,
}

impl ManufacturerCatalog {
    /// Builds a catalog from already compiled parts
    pub fn new(
        profiles: Vec<ManufacturerProfile>,
        alias_groups: BTreeMap<String, Vec<String>>,
        format_checks: Vec<FormatCheck>,
    ) -> Self {
        Self {
            profiles: profiles.into_iter().map(Arc::new).collect(),
            alias_groups,
            format_checks,
        }
    }

    /// Parses and compiles catalog TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let raw: RawCatalog = toml::from_str(contents).map_err(|e| {
            IvrError::Configuration(format!("Failed to parse manufacturer catalog: {e}"))
        })?;
        raw.compile()
    }

    /// The catalog embedded in the binary
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(DEFAULT_CATALOG)
    }

    /// Summaries of every profile, in catalog order
    pub fn list(&self) -> Vec<ManufacturerSummary> {
        self.profiles.iter().map(|p| p.summary()).collect()
    }

    /// Looks up a profile by id or display name, case-insensitively
    ///
    /// # Errors
    ///
    /// Returns [`IvrError::NotFound`] when no profile matches
    pub fn get(&self, id_or_name: &str) -> Result<Arc<ManufacturerProfile>> {
        self.profiles
            .iter()
            .find(|p| p.id.as_str() == id_or_name)
            .or_else(|| self.profiles.iter().find(|p| p.matches_name(id_or_name)))
            .cloned()
            .ok_or_else(|| IvrError::NotFound(format!("Manufacturer '{id_or_name}' not found")))
    }

    pub fn profiles(&self) -> &[Arc<ManufacturerProfile>] {
        &self.profiles
    }

    /// Canonical name to alias list
    pub fn alias_groups(&self) -> &BTreeMap<String, Vec<String>> {
        &self.alias_groups
    }

    pub fn format_checks(&self) -> &[FormatCheck] {
        &self.format_checks
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Loads and compiles the catalog file
///
/// `${VAR}` placeholders are substituted as in the main configuration.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<ManufacturerCatalog> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(IvrError::Configuration(format!(
            "Manufacturer catalog not found: {}",
            path.display()
        )));
    }

    let contents = std::fs::read_to_string(path).map_err(|e| {
        IvrError::Configuration(format!(
            "Failed to read manufacturer catalog {}: {}",
            path.display(),
            e
        ))
    })?;
    let contents = super::loader::substitute_env_vars(&contents)?;

    let catalog = ManufacturerCatalog::from_toml_str(&contents)?;
    tracing::info!(
        path = %path.display(),
        manufacturers = catalog.len(),
        aliases = catalog.alias_groups().len(),
        "Manufacturer catalog loaded"
    );
    Ok(catalog)
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    #[serde(default)]
    aliases: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    format_checks: Vec<RawFormatCheck>,
    #[serde(default)]
    manufacturers: Vec<RawManufacturer>,
}

#[derive(Debug, Deserialize)]
struct RawFormatCheck {
    suffix: String,
    pattern: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RawManufacturer {
    id: String,
    name: String,
    template_id: String,
    #[serde(default = "default_true")]
    signature_required: bool,
    #[serde(default)]
    has_order_form: bool,
    #[serde(default)]
    order_form_template_id: Option<String>,
    #[serde(default)]
    date_format: Option<String>,
    #[serde(default)]
    boolean_style: Option<String>,
    #[serde(default)]
    fields: Vec<RawField>,
    #[serde(default)]
    rules: Vec<RawRule>,
}

#[derive(Debug, Deserialize)]
struct RawField {
    name: String,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    transform: Option<String>,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    template_field: Option<String>,
    #[serde(default)]
    checkbox_keywords: Option<Vec<String>>,
    #[serde(default)]
    checkbox_value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum RawRule {
    MinWoundDuration {
        weeks: u32,
        #[serde(default)]
        severity: Option<String>,
    },
    RequiredIf {
        field: String,
        when_field: String,
        #[serde(default)]
        equals: Option<String>,
        #[serde(default)]
        severity: Option<String>,
    },
    Pattern {
        field: String,
        regex: String,
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        severity: Option<String>,
    },
    OneOf {
        field: String,
        values: Vec<String>,
        #[serde(default)]
        severity: Option<String>,
    },
}

fn default_true() -> bool {
    true
}

impl RawCatalog {
    fn compile(self) -> Result<ManufacturerCatalog> {
        let format_checks = if self.format_checks.is_empty() {
            FormatCheck::defaults()?
        } else {
            self.format_checks
                .iter()
                .map(|c| FormatCheck::new(&c.suffix, &c.pattern, &c.message))
                .collect::<Result<Vec<_>>>()?
        };

        let mut seen = HashSet::new();
        let mut profiles = Vec::with_capacity(self.manufacturers.len());
        for raw in self.manufacturers {
            let profile = raw.compile()?;
            if !seen.insert(profile.id.clone()) {
                return Err(IvrError::Configuration(format!(
                    "Duplicate manufacturer id '{}' in catalog",
                    profile.id
                )));
            }
            profiles.push(profile);
        }

        Ok(ManufacturerCatalog::new(
            profiles,
            self.aliases,
            format_checks,
        ))
    }
}

/// Checks that every item of a chrono format string is recognised
fn validate_date_format(format: &str) -> std::result::Result<(), String> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(format!("Invalid date format '{format}'"));
    }
    Ok(())
}

impl RawManufacturer {
    fn compile(self) -> Result<ManufacturerProfile> {
        let context = self.id.clone();
        let err = |message: String| {
            IvrError::Configuration(format!("Manufacturer '{context}': {message}"))
        };

        let id = ManufacturerId::new(self.id.as_str()).map_err(&err)?;

        if self.name.trim().is_empty() {
            return Err(err("name cannot be empty".to_string()));
        }
        if self.template_id.trim().is_empty() {
            return Err(err("template_id cannot be empty".to_string()));
        }
        if self.has_order_form && self.order_form_template_id.is_none() {
            return Err(err(
                "order_form_template_id is required when has_order_form = true".to_string(),
            ));
        }

        let date_format = self
            .date_format
            .as_deref()
            .map(normalize_date_format)
            .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string());
        validate_date_format(&date_format).map_err(&err)?;

        let boolean_style = self
            .boolean_style
            .as_deref()
            .map(str::parse::<BooleanStyle>)
            .transpose()
            .map_err(&err)?
            .unwrap_or_default();

        let mut names = HashSet::new();
        let mut fields = Vec::with_capacity(self.fields.len());
        for raw in self.fields {
            let field = raw.compile().map_err(&err)?;
            if !names.insert(field.name.clone()) {
                return Err(err(format!("duplicate field '{}'", field.name)));
            }
            fields.push(field);
        }

        let rules = self
            .rules
            .into_iter()
            .map(|rule| rule.compile(&names))
            .collect::<std::result::Result<Vec<_>, String>>()
            .map_err(&err)?;

        Ok(ManufacturerProfile {
            id,
            name: self.name,
            template_id: self.template_id,
            signature_required: self.signature_required,
            has_order_form: self.has_order_form,
            order_form_template_id: self.order_form_template_id,
            date_format,
            boolean_style,
            fields,
            rules,
        })
    }
}

impl RawField {
    fn compile(self) -> std::result::Result<TargetField, String> {
        let name = FieldKey::new(self.name.as_str())?;

        let expression = self
            .source
            .as_deref()
            .map(SourceExpression::parse)
            .transpose()
            .map_err(|e| format!("field '{name}': {e}"))?;

        let rule = match self.transform.as_deref() {
            Some(text) => text
                .parse::<TransformRule>()
                .map_err(|e| format!("field '{name}': {e}"))?,
            None => TransformRule::Auto,
        };

        if let TransformRule::Date {
            format: Some(ref format),
        } = rule
        {
            validate_date_format(format).map_err(|e| format!("field '{name}': {e}"))?;
        }

        let checkbox = match self.checkbox_keywords {
            Some(keywords) if !keywords.is_empty() => Some(CheckboxSpec {
                keywords: keywords.iter().map(|k| k.trim().to_lowercase()).collect(),
                on_value: self.checkbox_value.unwrap_or_else(|| "Yes".to_string()),
            }),
            _ => None,
        };

        if rule == TransformRule::Checkbox && checkbox.is_none() {
            return Err(format!(
                "field '{name}': checkbox transform requires checkbox_keywords"
            ));
        }

        Ok(TargetField {
            name,
            expression,
            rule,
            required: self.required,
            checkbox,
            template_field: self.template_field.filter(|label| !label.trim().is_empty()),
        })
    }
}

fn parse_severity(value: Option<String>, default: Severity) -> std::result::Result<Severity, String> {
    value
        .as_deref()
        .map(str::parse::<Severity>)
        .transpose()
        .map(|severity| severity.unwrap_or(default))
}

impl RawRule {
    fn compile(self, fields: &HashSet<FieldKey>) -> std::result::Result<BusinessRule, String> {
        let target = |name: &str| -> std::result::Result<FieldKey, String> {
            let key = FieldKey::new(name)?;
            if !fields.contains(&key) {
                return Err(format!("rule references unknown field '{key}'"));
            }
            Ok(key)
        };

        match self {
            RawRule::MinWoundDuration { weeks, severity } => {
                if weeks == 0 {
                    return Err("min_wound_duration weeks must be > 0".to_string());
                }
                Ok(BusinessRule::MinWoundDuration {
                    weeks,
                    severity: parse_severity(severity, Severity::Warning)?,
                })
            }
            RawRule::RequiredIf {
                field,
                when_field,
                equals,
                severity,
            } => Ok(BusinessRule::RequiredIf {
                field: target(&field)?,
                when_field: FieldKey::new(when_field)?,
                equals,
                severity: parse_severity(severity, Severity::Error)?,
            }),
            RawRule::Pattern {
                field,
                regex,
                message,
                severity,
            } => {
                let pattern = Regex::new(&regex)
                    .map_err(|e| format!("invalid pattern for '{field}': {e}"))?;
                Ok(BusinessRule::Pattern {
                    field: target(&field)?,
                    pattern,
                    message,
                    severity: parse_severity(severity, Severity::Warning)?,
                })
            }
            RawRule::OneOf {
                field,
                values,
                severity,
            } => {
                if values.is_empty() {
                    return Err(format!("one_of rule for '{field}' needs at least one value"));
                }
                Ok(BusinessRule::OneOf {
                    field: target(&field)?,
                    values,
                    severity: parse_severity(severity, Severity::Warning)?,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"
[aliases]
patient_dob = ["date_of_birth", "dob"]

[[manufacturers]]
id = "acme-bio"
name = "Acme Bio"
template_id = "1001"
date_format = "YYYY-MM-DD"
boolean_style = "yes_off"

[[manufacturers.fields]]
name = "patient_name"
source = "patient_first_name + patient_last_name"
required = true

[[manufacturers.fields]]
name = "dob"
source = "patient_dob"
transform = "date"

[[manufacturers.fields]]
name = "wound_area"
source = "wound_size_length * wound_size_width"
transform = "number"

[[manufacturers.rules]]
kind = "min_wound_duration"
weeks = 4

[[manufacturers.rules]]
kind = "one_of"
field = "dob"
values = ["x"]
severity = "error"
"#;

    #[test]
    fn test_compile_small_catalog() {
        let catalog = ManufacturerCatalog::from_toml_str(SMALL).unwrap();
        assert_eq!(catalog.len(), 1);

        let profile = catalog.get("acme-bio").unwrap();
        assert_eq!(profile.date_format, "%Y-%m-%d");
        assert_eq!(profile.boolean_style, BooleanStyle::YesOff);
        assert_eq!(profile.fields.len(), 3);
        assert_eq!(profile.fields[0].name.as_str(), "patient_name");
        assert!(matches!(
            profile.fields[2].expression,
            Some(SourceExpression::Product(_))
        ));
        assert_eq!(profile.rules.len(), 2);
        assert_eq!(profile.rules[0].severity(), Severity::Warning);
        assert_eq!(profile.rules[1].severity(), Severity::Error);

        // format checks default when the catalog declares none
        assert_eq!(catalog.format_checks().len(), 3);
        assert_eq!(catalog.alias_groups()["patient_dob"].len(), 2);
    }

    #[test]
    fn test_get_by_display_name() {
        let catalog = ManufacturerCatalog::from_toml_str(SMALL).unwrap();
        assert_eq!(catalog.get("ACME BIO").unwrap().id.as_str(), "acme-bio");
        let err = catalog.get("nobody").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_mixed_operators_fail_at_load() {
        let toml = r#"
[[manufacturers]]
id = "bad"
name = "Bad"
template_id = "1"

[[manufacturers.fields]]
name = "x"
source = "a + b || c"
"#;
        let err = ManufacturerCatalog::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, IvrError::Configuration(_)));
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn test_rule_on_unknown_field_fails() {
        let toml = r#"
[[manufacturers]]
id = "bad"
name = "Bad"
template_id = "1"

[[manufacturers.rules]]
kind = "pattern"
field = "missing_field"
regex = "^x$"
"#;
        let err = ManufacturerCatalog::from_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("missing_field"));
    }

    #[test]
    fn test_checkbox_requires_keywords() {
        let toml = r#"
[[manufacturers]]
id = "bad"
name = "Bad"
template_id = "1"

[[manufacturers.fields]]
name = "wound_type_dfu"
source = "wound_type"
transform = "checkbox"
"#;
        assert!(ManufacturerCatalog::from_toml_str(toml).is_err());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let toml = r#"
[[manufacturers]]
id = "dup"
name = "One"
template_id = "1"

[[manufacturers]]
id = "dup"
name = "Two"
template_id = "2"
"#;
        let err = ManufacturerCatalog::from_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("Duplicate"));
    }

    #[test]
    fn test_builtin_catalog_compiles() {
        let catalog = ManufacturerCatalog::builtin().unwrap();
        assert!(catalog.len() >= 4);
        assert!(catalog.get("acz-associates").is_ok());
        assert!(catalog.get("ACZ & Associates").is_ok());
        assert!(!catalog.alias_groups().is_empty());
    }

    #[test]
    fn test_format_check_applies_by_suffix() {
        let checks = FormatCheck::defaults().unwrap();
        let npi = checks.iter().find(|c| c.suffix == "_npi").unwrap();
        assert!(npi.applies_to("provider_npi"));
        assert!(!npi.applies_to("provider_name"));
        assert!(npi.pattern.is_match("1234567890"));
        assert!(!npi.pattern.is_match("12345"));
    }
}
