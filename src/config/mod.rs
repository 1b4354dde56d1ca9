//! Configuration management.
//!
//! This module provides TOML-based configuration loading, parsing, and validation
//! for the service configuration and the manufacturer catalog.
//!
//! # Overview
//!
//! Configuration files support:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `IVR_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Validation on load
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ivr_mapper::config::{load_catalog, load_config};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("ivr-mapper.toml")?;
//! let catalog = load_catalog(&config.mapping.catalog_path)?;
//!
//! println!("DocuSeal: {}", config.docuseal.base_url);
//! println!("Manufacturers: {}", catalog.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - log level
//! - [`ServerConfig`] - HTTP bind address and API keys
//! - [`DocuSealConfig`] - e-signature service connection, webhook secret, retries
//! - [`MlConfig`] - optional ML predictor
//! - [`MatchingConfig`] - confidence threshold, alternatives, similarity weights
//! - [`MappingConfig`] - catalog path and batch concurrency
//! - [`PostgreSQLConfig`] - PostgreSQL storage
//! - [`ClinicalConfig`] - clinical record fixture
//! - [`LoggingConfig`] - file logging
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [server]
//! bind_address = "0.0.0.0:8080"
//! api_keys = ["${IVR_API_KEY}"]
//!
//! [docuseal]
//! base_url = "https://api.docuseal.com"
//! api_key = "${DOCUSEAL_API_KEY}"
//!
//! [mapping]
//! catalog_path = "config/manufacturers.toml"
//! ```

pub mod catalog;
pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use catalog::{load_catalog, FormatCheck, ManufacturerCatalog};
pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, ClinicalConfig, DocuSealConfig, Environment, IvrConfig, LoggingConfig,
    MappingConfig, MatchingConfig, MlConfig, PostgreSQLConfig, RetryConfig, ServerConfig,
    SimilarityWeights, StorageBackend, StrategyBoosts,
};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};
