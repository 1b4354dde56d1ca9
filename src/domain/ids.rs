//! Domain identifier types with validation
//!
//! Newtype wrappers for the identifiers flowing through the pipeline. Each type
//! validates its format on construction so downstream code never sees a bad id.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Clinical episode identifier
///
/// Episodes are numbered by the clinical-record store; zero and negative
/// values are rejected.
///
/// # Examples
///
/// ```
/// use ivr_mapper::domain::ids::EpisodeId;
/// use std::str::FromStr;
///
/// let episode = EpisodeId::from_str("1042").unwrap();
/// assert_eq!(episode.value(), 1042);
/// assert!(EpisodeId::from_str("abc").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct EpisodeId(u64);

impl EpisodeId {
    /// Creates a new EpisodeId
    ///
    /// # Returns
    ///
    /// Returns `Ok(EpisodeId)` if the value is positive, `Err` otherwise
    pub fn new(value: u64) -> Result<Self, String> {
        if value == 0 {
            return Err("Episode ID must be a positive integer".to_string());
        }
        Ok(Self(value))
    }

    /// Returns the numeric value
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Parses an arbitrary JSON value (number or numeric string)
    pub fn from_json(value: &serde_json::Value) -> Result<Self, String> {
        match value {
            serde_json::Value::Number(n) => n
                .as_u64()
                .ok_or_else(|| format!("Invalid episode ID: {n}"))
                .and_then(Self::new),
            serde_json::Value::String(s) => Self::from_str(s),
            other => Err(format!("Invalid episode ID: {other}")),
        }
    }
}

impl TryFrom<u64> for EpisodeId {
    type Error = String;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EpisodeId> for u64 {
    fn from(id: EpisodeId) -> Self {
        id.0
    }
}

impl fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EpisodeId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u64 = s
            .trim()
            .parse()
            .map_err(|_| format!("Invalid episode ID '{s}': must be a positive integer"))?;
        Self::new(value)
    }
}

/// Manufacturer identifier
///
/// A lowercase slug such as `acz-associates`. Display names live on the
/// manufacturer profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ManufacturerId(String);

impl ManufacturerId {
    /// Creates a new ManufacturerId
    ///
    /// Only lowercase ASCII letters, digits and `-` are accepted.
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Manufacturer ID cannot be empty".to_string());
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(format!(
                "Invalid manufacturer ID '{id}': use lowercase letters, digits and '-'"
            ));
        }
        Ok(Self(id))
    }

    /// Returns the manufacturer ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ManufacturerId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ManufacturerId> for String {
    fn from(id: ManufacturerId) -> Self {
        id.0
    }
}

impl fmt::Display for ManufacturerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ManufacturerId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ManufacturerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// External e-signature submission identifier
///
/// DocuSeal returns numeric ids; they are carried as strings so another
/// provider could be substituted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubmissionId(String);

impl SubmissionId {
    /// Creates a new SubmissionId
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err("Submission ID cannot be empty".to_string());
        }
        if trimmed.contains('/') || trimmed.contains(char::is_whitespace) {
            return Err(format!("Invalid submission ID '{id}'"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Parses an id from a JSON number or string
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => Self::new(n.to_string()).ok(),
            serde_json::Value::String(s) => Self::new(s.as_str()).ok(),
            _ => None,
        }
    }

    /// Returns the submission ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SubmissionId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SubmissionId> for String {
    fn from(id: SubmissionId) -> Self {
        id.0
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SubmissionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for SubmissionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
