//! Typed source field bag
//!
//! The extractor flattens clinical records into a [`SourceFieldBag`]: a map from
//! validated [`FieldKey`]s to tagged [`FieldValue`]s. The same types carry
//! caller-supplied overrides and the input of `/mapping/validate`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Field name newtype
///
/// Keys are trimmed, non-empty and contain no whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldKey(String);

impl FieldKey {
    /// Creates a new FieldKey
    pub fn new(key: impl Into<String>) -> Result<Self, String> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err("Field name cannot be empty".to_string());
        }
        if trimmed.contains(char::is_whitespace) {
            return Err(format!("Invalid field name '{key}': whitespace is not allowed"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Keys starting with `_` are internal and never sent to the e-signature service
    pub fn is_internal(&self) -> bool {
        self.0.starts_with('_')
    }
}

impl TryFrom<String> for FieldKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FieldKey> for String {
    fn from(key: FieldKey) -> Self {
        key.0
    }
}

impl FromStr for FieldKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for FieldKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for FieldKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A single source value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Boolean(bool),
    List(Vec<FieldValue>),
}

impl FieldValue {
    /// Converts a JSON value; `null` has no field value
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(b) => Some(FieldValue::Boolean(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(FieldValue::Number),
            serde_json::Value::String(s) => Some(FieldValue::Text(s.clone())),
            serde_json::Value::Array(items) => Some(FieldValue::List(
                items.iter().filter_map(FieldValue::from_json).collect(),
            )),
            serde_json::Value::Object(_) => Some(FieldValue::Text(value.to_string())),
        }
    }

    /// Whether the value carries no information
    ///
    /// Numbers and booleans are never empty, so `0` counts as filled.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Number(n) => n.is_nan(),
            FieldValue::Date(_) | FieldValue::Boolean(_) => false,
            FieldValue::List(items) => items.iter().all(FieldValue::is_empty),
        }
    }

    /// Plain-text rendering used for concatenation and rule checks
    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Text(s) => s.trim().to_string(),
            FieldValue::Number(n) => format_number(*n),
            FieldValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            FieldValue::Boolean(b) => b.to_string(),
            FieldValue::List(items) => items
                .iter()
                .filter(|item| !item.is_empty())
                .map(FieldValue::as_text)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Numeric view; text is parsed after stripping `$`, `,` and `%`
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) if n.is_finite() => Some(*n),
            FieldValue::Text(s) => {
                let cleaned: String = s
                    .trim()
                    .chars()
                    .filter(|c| !matches!(c, '$' | ',' | '%'))
                    .collect();
                cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
            }
            _ => None,
        }
    }

    /// Text items of a list, or the single text value
    pub fn as_list(&self) -> Vec<String> {
        match self {
            FieldValue::List(items) => items
                .iter()
                .filter(|item| !item.is_empty())
                .map(FieldValue::as_text)
                .collect(),
            other if other.is_empty() => Vec::new(),
            other => vec![other.as_text()],
        }
    }

    /// JSON rendering
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Text(s) => serde_json::Value::String(s.clone()),
            FieldValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FieldValue::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
            FieldValue::Boolean(b) => serde_json::Value::Bool(*b),
            FieldValue::List(items) => {
                serde_json::Value::Array(items.iter().map(FieldValue::to_json).collect())
            }
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

/// Renders whole numbers without a fractional part
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&String> for FieldValue {
    fn from(value: &String) -> Self {
        FieldValue::Text(value.clone())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Number(f64::from(value))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value.into_iter().map(FieldValue::Text).collect())
    }
}

/// Flat key/value bag assembled for one mapping request
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SourceFieldBag {
    fields: BTreeMap<FieldKey, FieldValue>,
}

impl SourceFieldBag {
    /// Creates an empty bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value under a validated key, replacing any previous value
    pub fn insert(&mut self, key: FieldKey, value: FieldValue) {
        self.fields.insert(key, value);
    }

    /// Inserts a value when both the key is valid and the value is non-empty
    ///
    /// Returns whether the value was stored.
    pub fn set(&mut self, key: &str, value: impl Into<FieldValue>) -> bool {
        let value = value.into();
        if value.is_empty() {
            return false;
        }
        match FieldKey::new(key) {
            Ok(key) => {
                self.fields.insert(key, value);
                true
            }
            Err(_) => false,
        }
    }

    /// Like [`SourceFieldBag::set`] for optional values
    pub fn set_opt<V: Into<FieldValue>>(&mut self, key: &str, value: Option<V>) -> bool {
        match value {
            Some(value) => self.set(key, value),
            None => false,
        }
    }

    /// Looks up a value by name
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Looks up a non-empty value by name
    pub fn get_filled(&self, key: &str) -> Option<&FieldValue> {
        self.get(key).filter(|value| !value.is_empty())
    }

    /// Whether the bag has a value under this name
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Iterates over keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &FieldKey> {
        self.fields.keys()
    }

    /// Iterates over entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&FieldKey, &FieldValue)> {
        self.fields.iter()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the bag has no entries
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Copies every entry of `overrides` into this bag; overrides win
    pub fn overlay(&mut self, overrides: &SourceFieldBag) {
        for (key, value) in overrides.iter() {
            self.fields.insert(key.clone(), value.clone());
        }
    }

    /// Builds a bag from a JSON object
    ///
    /// `null` values are skipped; invalid names are rejected.
    pub fn from_json_object(value: &serde_json::Value) -> Result<Self, String> {
        let object = match value {
            serde_json::Value::Object(object) => object,
            serde_json::Value::Null => return Ok(Self::new()),
            other => return Err(format!("Expected a JSON object of fields, got {other}")),
        };

        let mut bag = Self::new();
        for (name, raw) in object {
            let key = FieldKey::new(name.as_str())?;
            if let Some(value) = FieldValue::from_json(raw) {
                bag.insert(key, value);
            }
        }
        Ok(bag)
    }

    /// Plain-text view of every entry
    pub fn to_text_map(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .map(|(key, value)| (key.to_string(), value.as_text()))
            .collect()
    }
}

impl FromIterator<(FieldKey, FieldValue)> for SourceFieldBag {
    fn from_iter<I: IntoIterator<Item = (FieldKey, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_key_validation() {
        assert_eq!(FieldKey::new(" patient_dob ").unwrap().as_str(), "patient_dob");
        assert!(FieldKey::new("").is_err());
        assert!(FieldKey::new("patient dob").is_err());
        assert!(FieldKey::new("_internal").unwrap().is_internal());
    }

    #[test]
    fn test_field_value_emptiness() {
        assert!(FieldValue::from("   ").is_empty());
        assert!(!FieldValue::from(0.0).is_empty());
        assert!(!FieldValue::from(false).is_empty());
        assert!(FieldValue::List(vec![]).is_empty());
        assert!(FieldValue::List(vec![FieldValue::from("")]).is_empty());
        assert!(!FieldValue::from(vec!["DFU".to_string()]).is_empty());
    }

    #[test]
    fn test_field_value_text_rendering() {
        assert_eq!(FieldValue::from(42.0).as_text(), "42");
        assert_eq!(FieldValue::from(16.12).as_text(), "16.12");
        let date = NaiveDate::from_ymd_opt(1980, 12, 25).unwrap();
        assert_eq!(FieldValue::from(date).as_text(), "1980-12-25");
        let list = FieldValue::from(vec!["E11.621".to_string(), "L97.412".to_string()]);
        assert_eq!(list.as_text(), "E11.621, L97.412");
    }

    #[test]
    fn test_field_value_as_number() {
        assert_eq!(FieldValue::from("$1,250.50").as_number(), Some(1250.5));
        assert_eq!(FieldValue::from("12%").as_number(), Some(12.0));
        assert_eq!(FieldValue::from("n/a").as_number(), None);
        assert_eq!(FieldValue::from(true).as_number(), None);
    }

    #[test]
    fn test_bag_set_skips_empty_and_invalid() {
        let mut bag = SourceFieldBag::new();
        assert!(bag.set("patient_first_name", "Jane"));
        assert!(!bag.set("patient_middle_name", ""));
        assert!(!bag.set("bad key", "value"));
        assert!(!bag.set_opt::<String>("patient_email", None));
        assert_eq!(bag.len(), 1);
    }

    #[test]
    fn test_bag_overlay_prefers_overrides() {
        let mut bag = SourceFieldBag::new();
        bag.set("patient_phone", "5551234567");
        bag.set("patient_city", "Austin");

        let mut overrides = SourceFieldBag::new();
        overrides.set("patient_phone", "5559876543");

        bag.overlay(&overrides);
        assert_eq!(bag.get("patient_phone").unwrap().as_text(), "5559876543");
        assert_eq!(bag.get("patient_city").unwrap().as_text(), "Austin");
    }

    #[test]
    fn test_bag_from_json_object() {
        let bag = SourceFieldBag::from_json_object(&json!({
            "patient_dob": "1980-12-25",
            "wound_size_length": 5.2,
            "hospice_status": false,
            "patient_email": null,
            "diagnosis_codes": ["E11.621", null]
        }))
        .unwrap();

        assert_eq!(bag.len(), 4);
        assert_eq!(bag.get("wound_size_length"), Some(&FieldValue::Number(5.2)));
        assert_eq!(
            bag.get("diagnosis_codes").unwrap().as_list(),
            vec!["E11.621".to_string()]
        );
        assert!(SourceFieldBag::from_json_object(&json!([1, 2])).is_err());
        assert!(SourceFieldBag::from_json_object(&json!({"bad key": 1})).is_err());
    }
}
