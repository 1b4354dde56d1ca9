//! CLI command implementations
//!
//! Every command returns a process exit code:
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | success |
//! | 1 | validation failure or partially failed batch |
//! | 2 | configuration error |
//! | 3 | manufacturer, episode or submission not found |
//! | 4 | connection error (storage, DocuSeal, ML service) |
//! | 5 | any other failure |

pub mod analytics;
pub mod batch;
pub mod init;
pub mod manufacturers;
pub mod map;
pub mod serve;
pub mod submit;
pub mod validate;
pub mod validate_data;

use crate::adapters::clinical::create_clinical_provider;
use crate::adapters::esignature::create_signature_service;
use crate::adapters::ml::create_predictor;
use crate::adapters::storage::{create_storage, Storage};
use crate::config::{load_catalog, IvrConfig, ManufacturerCatalog, MappingConfig};
use crate::core::analytics::AnalyticsAggregator;
use crate::core::extract::DataExtractor;
use crate::core::mapping::MappingOrchestrator;
use crate::core::matching::{FieldMatcher, HeuristicPredictor};
use crate::core::submission::SubmissionGateway;
use crate::domain::errors::DocuSealError;
use crate::domain::field::SourceFieldBag;
use crate::domain::{IvrError, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

pub const EXIT_OK: i32 = 0;
pub const EXIT_VALIDATION: i32 = 1;
pub const EXIT_CONFIG: i32 = 2;
pub const EXIT_NOT_FOUND: i32 = 3;
pub const EXIT_CONNECTION: i32 = 4;
pub const EXIT_FATAL: i32 = 5;

const DEFAULT_CATALOG_PATH: &str = "config/manufacturers.toml";

/// Everything the commands and the API server run on
#[derive(Clone)]
pub struct Services {
    pub catalog: Arc<ManufacturerCatalog>,
    pub storage: Storage,
    pub mapping: MappingOrchestrator,
    pub gateway: SubmissionGateway,
    pub analytics: AnalyticsAggregator,
}

/// Loads the manufacturer catalog
///
/// The catalog shipped with the binary is used when the default path does
/// not exist; any other missing path is an error.
pub fn load_manufacturer_catalog(config: &MappingConfig) -> Result<ManufacturerCatalog> {
    let path = Path::new(&config.catalog_path);
    if !path.exists() && config.catalog_path == DEFAULT_CATALOG_PATH {
        tracing::info!("Catalog file not found, using the built-in manufacturer catalog");
        return ManufacturerCatalog::builtin();
    }
    load_catalog(path)
}

/// Wires adapters and core services from configuration
///
/// # Errors
///
/// Returns an error if the catalog, clinical fixture, storage backend or an
/// HTTP client cannot be set up.
pub async fn build_services(config: &IvrConfig) -> Result<Services> {
    let catalog = Arc::new(load_manufacturer_catalog(&config.mapping)?);
    let storage = create_storage(config).await?;
    let clinical = create_clinical_provider(&config.clinical)?;

    let heuristic = HeuristicPredictor::from_catalog(&catalog, config.matching.clone());
    let predictor = create_predictor(&config.ml, heuristic, config.matching.max_alternatives)?;
    let matcher = FieldMatcher::new(predictor, &config.matching);

    let mapping = MappingOrchestrator::new(
        Arc::clone(&catalog),
        DataExtractor::new(clinical),
        matcher,
        Arc::clone(&storage.mapping_logs),
    )
    .with_batch_concurrency(config.mapping.batch_concurrency);

    let signatures = create_signature_service(&config.docuseal)?;
    let create_lease = config
        .docuseal
        .timeout_seconds
        .saturating_add(config.docuseal.connect_timeout_seconds)
        .saturating_mul(2);
    let gateway = SubmissionGateway::new(
        mapping.clone(),
        signatures,
        Arc::clone(&storage.submissions),
    )
    .with_create_lease(std::time::Duration::from_secs(create_lease));
    let analytics = AnalyticsAggregator::new(Arc::clone(&storage.submissions), Arc::clone(&catalog));

    tracing::info!(
        manufacturers = catalog.len(),
        storage_backend = ?config.storage_backend,
        ml_enabled = config.ml.enabled,
        "Services initialized"
    );

    Ok(Services {
        catalog,
        storage,
        mapping,
        gateway,
        analytics,
    })
}

/// Loads configuration and builds services, reporting failures on stdout
///
/// On failure the exit code to return is given back instead.
pub(crate) async fn load_services(config_path: &str) -> std::result::Result<Services, i32> {
    let config = crate::config::load_config(config_path).map_err(|e| {
        println!("❌ Failed to load configuration file {config_path}");
        println!("   Error: {e}");
        EXIT_CONFIG
    })?;
    build_services(&config)
        .await
        .map_err(|e| report_failure("Failed to initialize services", &e))
}

/// Exit code for a failed command
pub fn exit_code(error: &IvrError) -> i32 {
    match error {
        IvrError::ValidationFailed { .. } | IvrError::MalformedInput(_) => EXIT_VALIDATION,
        IvrError::Configuration(_) => EXIT_CONFIG,
        IvrError::NotFound(_) | IvrError::DocuSeal(DocuSealError::NotFound(_)) => EXIT_NOT_FOUND,
        IvrError::Connection(_)
        | IvrError::Database(_)
        | IvrError::UpstreamService(_)
        | IvrError::DocuSeal(_) => EXIT_CONNECTION,
        _ => EXIT_FATAL,
    }
}

/// Exit code for an error escaping a command
pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<IvrError>()
        .map(exit_code)
        .unwrap_or(EXIT_FATAL)
}

/// Parses a `--data` argument into a field bag
pub(crate) fn parse_data_arg(data: Option<&str>) -> Result<SourceFieldBag> {
    match data {
        None => Ok(SourceFieldBag::new()),
        Some(raw) => {
            let value: serde_json::Value = serde_json::from_str(raw)
                .map_err(|e| IvrError::MalformedInput(format!("--data is not valid JSON: {e}")))?;
            SourceFieldBag::from_json_object(&value).map_err(IvrError::MalformedInput)
        }
    }
}

/// Prints a value as pretty JSON
pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Reports a failed command and returns its exit code
pub(crate) fn report_failure(context: &str, error: &IvrError) -> i32 {
    crate::log_error_with_context!(error, context);
    eprintln!("❌ {context}: {error}");
    exit_code(error)
}
