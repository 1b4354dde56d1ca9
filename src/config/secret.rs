//! Secret handling for API keys and connection strings
//!
//! Values are wrapped in [`secrecy::Secret`] so they are zeroed on drop and
//! redacted from `Debug` output. Access requires an explicit `expose_secret()`.
//!
//! # Example
//!
//! ```rust
//! use ivr_mapper::config::secret_string;
//! use secrecy::ExposeSecret;
//!
//! let api_key = secret_string("ds-key".to_string());
//! assert_eq!(api_key.expose_secret().as_ref(), "ds-key");
//! println!("{:?}", api_key); // Secret([REDACTED ...])
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// Newtype wrapper for String that implements the required traits for Secret
#[derive(Clone, Debug, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl PartialEq<str> for SecretValue {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SecretValue {
    /// Check if the secret value is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compares against a candidate without short-circuiting on the first mismatch
    pub fn matches(&self, candidate: &str) -> bool {
        let expected = self.0.as_bytes();
        let given = candidate.as_bytes();
        if expected.len() != given.len() {
            return false;
        }
        expected
            .iter()
            .zip(given)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// Type alias for a secret string
pub type SecretString = Secret<SecretValue>;

/// Wraps a plain string as a [`SecretString`]
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

/// Wraps an optional plain string as a [`SecretString`]
///
/// ```rust
/// use ivr_mapper::config::secret_string_opt;
///
/// assert!(secret_string_opt(Some("whsec".to_string())).is_some());
/// assert!(secret_string_opt(None).is_none());
/// ```
#[inline]
pub fn secret_string_opt(value: Option<String>) -> Option<SecretString> {
    value.map(secret_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_secret_string_creation() {
        let secret = secret_string("ds-api-key".to_string());
        assert_eq!(secret.expose_secret(), "ds-api-key");
    }

    #[test]
    fn test_secret_debug_redacted() {
        let secret = secret_string("whsec_live_123".to_string());
        let debug_output = format!("{secret:?}");
        assert!(!debug_output.contains("whsec_live_123"));
    }

    #[test]
    fn test_secret_matches() {
        let secret = secret_string("key-one".to_string());
        assert!(secret.expose_secret().matches("key-one"));
        assert!(!secret.expose_secret().matches("key-two"));
        assert!(!secret.expose_secret().matches("key-one-longer"));
        assert!(!secret.expose_secret().matches(""));
    }

    #[test]
    fn test_secret_serde() {
        #[derive(Serialize, Deserialize)]
        struct Section {
            api_keys: Vec<SecretString>,
        }

        let parsed: Section = toml::from_str(r#"api_keys = ["a1", "b2"]"#).unwrap();
        assert_eq!(parsed.api_keys.len(), 2);
        assert_eq!(parsed.api_keys[1].expose_secret(), "b2");

        let json = serde_json::to_string(&parsed).unwrap();
        assert!(json.contains("a1"));
    }
}
