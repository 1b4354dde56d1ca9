//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{Environment, IvrConfig, StorageBackend};
use super::secret::secret_string;
use crate::domain::errors::IvrError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into [`IvrConfig`]
/// 4. Applies environment variable overrides (IVR_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`IvrError::Configuration`] if the file is missing or unreadable,
/// a referenced variable is unset, parsing fails or validation fails.
///
/// # Examples
///
/// ```no_run
/// use ivr_mapper::config::loader::load_config;
///
/// let config = load_config("ivr-mapper.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<IvrConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(IvrError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        IvrError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses configuration text with the same steps as [`load_config`]
pub fn parse_config(contents: &str) -> Result<IvrConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: IvrConfig = toml::from_str(&contents)
        .map_err(|e| IvrError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        IvrError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
pub(crate) fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| IvrError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(IvrError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Parses a numeric override, rejecting values that do not parse
fn parse_override<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse::<T>().map_err(|_| {
        IvrError::Configuration(format!("Invalid value '{value}' for environment variable {name}"))
    })
}

/// Applies environment variable overrides using the IVR_* prefix
///
/// Environment variables follow the pattern `IVR_<SECTION>_<KEY>`,
/// for example `IVR_DOCUSEAL_API_KEY` or `IVR_MATCHING_CONFIDENCE_THRESHOLD`.
fn apply_env_overrides(config: &mut IvrConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("IVR_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("IVR_ENVIRONMENT") {
        config.environment = match val.to_lowercase().as_str() {
            "development" => Environment::Development,
            "staging" => Environment::Staging,
            "production" => Environment::Production,
            other => {
                return Err(IvrError::Configuration(format!(
                    "Invalid IVR_ENVIRONMENT '{other}'. Must be one of: development, staging, production"
                )))
            }
        };
    }

    // Server overrides
    if let Ok(val) = std::env::var("IVR_SERVER_BIND_ADDRESS") {
        config.server.bind_address = val;
    }
    if let Ok(val) = std::env::var("IVR_SERVER_API_KEYS") {
        config.server.api_keys = val
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(|k| secret_string(k.to_string()))
            .collect();
    }

    // DocuSeal overrides
    if let Ok(val) = std::env::var("IVR_DOCUSEAL_BASE_URL") {
        config.docuseal.base_url = val;
    }
    if let Ok(val) = std::env::var("IVR_DOCUSEAL_API_KEY") {
        config.docuseal.api_key = secret_string(val);
    }
    if let Ok(val) = std::env::var("IVR_DOCUSEAL_WEBHOOK_SECRET") {
        config.docuseal.webhook_secret = Some(secret_string(val));
    }
    if let Ok(val) = std::env::var("IVR_DOCUSEAL_TIMEOUT_SECONDS") {
        config.docuseal.timeout_seconds = parse_override("IVR_DOCUSEAL_TIMEOUT_SECONDS", &val)?;
    }
    if let Ok(val) = std::env::var("IVR_DOCUSEAL_MAX_RETRIES") {
        config.docuseal.retry.max_retries = parse_override("IVR_DOCUSEAL_MAX_RETRIES", &val)?;
    }

    // ML overrides
    if let Ok(val) = std::env::var("IVR_ML_ENABLED") {
        config.ml.enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("IVR_ML_BASE_URL") {
        config.ml.base_url = Some(val);
    }

    // Matching overrides
    if let Ok(val) = std::env::var("IVR_MATCHING_CONFIDENCE_THRESHOLD") {
        config.matching.confidence_threshold =
            parse_override("IVR_MATCHING_CONFIDENCE_THRESHOLD", &val)?;
    }
    if let Ok(val) = std::env::var("IVR_MATCHING_MAX_ALTERNATIVES") {
        config.matching.max_alternatives = parse_override("IVR_MATCHING_MAX_ALTERNATIVES", &val)?;
    }

    // Mapping overrides
    if let Ok(val) = std::env::var("IVR_MAPPING_CATALOG_PATH") {
        config.mapping.catalog_path = val;
    }
    if let Ok(val) = std::env::var("IVR_MAPPING_BATCH_CONCURRENCY") {
        config.mapping.batch_concurrency = parse_override("IVR_MAPPING_BATCH_CONCURRENCY", &val)?;
    }

    // Storage overrides
    if let Ok(val) = std::env::var("IVR_STORAGE_BACKEND") {
        config.storage_backend = match val.to_lowercase().as_str() {
            "memory" => StorageBackend::Memory,
            "postgresql" | "postgres" => StorageBackend::PostgreSQL,
            other => {
                return Err(IvrError::Configuration(format!(
                    "Invalid IVR_STORAGE_BACKEND '{other}'. Must be one of: memory, postgresql"
                )))
            }
        };
    }
    if let Some(ref mut pg_config) = config.postgresql {
        if let Ok(val) = std::env::var("IVR_POSTGRESQL_CONNECTION_STRING") {
            pg_config.connection_string = secret_string(val);
        }
        if let Ok(val) = std::env::var("IVR_POSTGRESQL_MAX_CONNECTIONS") {
            pg_config.max_connections = parse_override("IVR_POSTGRESQL_MAX_CONNECTIONS", &val)?;
        }
    }

    // Clinical overrides
    if let Ok(val) = std::env::var("IVR_CLINICAL_FIXTURE_PATH") {
        config.clinical.fixture_path = Some(val);
    }

    // Logging overrides
    if let Ok(val) = std::env::var("IVR_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("IVR_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[docuseal]
api_key = "ds-test-key"
"#;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("IVR_TEST_SUBST_KEY", "from-env");
        let input = "api_key = \"${IVR_TEST_SUBST_KEY}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result.trim(), "api_key = \"from-env\"");
        std::env::remove_var("IVR_TEST_SUBST_KEY");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        let input = "api_key = \"${IVR_TEST_DEFINITELY_UNSET_VAR}\"";
        let err = substitute_env_vars(input).unwrap_err();
        assert!(err.to_string().contains("IVR_TEST_DEFINITELY_UNSET_VAR"));
    }

    #[test]
    fn test_substitute_env_vars_skips_comments() {
        let input = "# api_key = \"${IVR_TEST_COMMENTED_OUT}\"\nname = \"x\"";
        let result = substitute_env_vars(input).unwrap();
        assert!(result.contains("${IVR_TEST_COMMENTED_OUT}"));
    }

    #[test]
    fn test_parse_minimal_config_applies_defaults() {
        let config = parse_config(MINIMAL).unwrap();
        assert_eq!(config.docuseal.api_key.expose_secret(), "ds-test-key");
        assert_eq!(config.docuseal.base_url, "https://api.docuseal.com");
        assert_eq!(config.matching.confidence_threshold, 0.7);
        assert_eq!(config.matching.max_alternatives, 3);
        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert!(!config.ml.enabled);
    }

    #[test]
    fn test_parse_rejects_invalid_values() {
        let toml = r#"
[docuseal]
api_key = "ds-test-key"

[matching]
confidence_threshold = 2.0
"#;
        let err = parse_config(toml).unwrap_err();
        assert!(err.to_string().contains("confidence_threshold"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config("/nonexistent/ivr-mapper.toml").unwrap_err();
        assert!(matches!(err, IvrError::Configuration(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{MINIMAL}").unwrap();
        writeln!(file, "[mapping]\nbatch_concurrency = 8").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.mapping.batch_concurrency, 8);
    }
}
