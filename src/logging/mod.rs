//! Logging and observability
//!
//! Structured logging through `tracing`:
//! - human-readable console output
//! - optional JSON file output with daily or hourly rotation
//! - log levels from configuration, overridable with `RUST_LOG`
//!
//! Log events carry identifiers (episode, manufacturer, submission) only.
//! Patient data never appears in log fields.
//!
//! # Example
//!
//! ```no_run
//! use ivr_mapper::logging::init_logging;
//! use ivr_mapper::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, parse_log_level, LoggingGuard};

/// Log the start of a mapping operation
///
/// # Example
///
/// ```no_run
/// use ivr_mapper::log_mapping_start;
/// use ivr_mapper::domain::EpisodeId;
///
/// let episode_id = EpisodeId::new(42).unwrap();
/// log_mapping_start!(episode_id, "acz-associates", "preview");
/// ```
#[macro_export]
macro_rules! log_mapping_start {
    ($episode_id:expr, $manufacturer:expr, $purpose:expr) => {
        tracing::info!(
            episode_id = %$episode_id,
            manufacturer = %$manufacturer,
            mapping_type = %$purpose,
            "Starting mapping"
        );
    };
}

/// Log the completion of a mapping operation
///
/// # Example
///
/// ```no_run
/// use ivr_mapper::log_mapping_complete;
/// use std::time::Duration;
///
/// log_mapping_complete!(42, "acz-associates", 87.5, true, Duration::from_millis(12));
/// ```
#[macro_export]
macro_rules! log_mapping_complete {
    ($episode_id:expr, $manufacturer:expr, $completeness:expr, $valid:expr, $duration:expr) => {
        tracing::info!(
            episode_id = %$episode_id,
            manufacturer = %$manufacturer,
            completeness = $completeness,
            valid = $valid,
            duration_ms = $duration.as_millis() as u64,
            "Mapping completed"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use ivr_mapper::log_error_with_context;
/// use ivr_mapper::domain::IvrError;
///
/// let error = IvrError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}
