//! Validate-data command implementation

use super::{load_services, parse_data_arg, print_json, report_failure, EXIT_OK, EXIT_VALIDATION};
use crate::domain::IvrError;
use clap::Args;
use std::fs;

/// Arguments for the validate-data command
#[derive(Args, Debug)]
pub struct ValidateDataArgs {
    /// Manufacturer id or name
    #[arg(short, long)]
    pub manufacturer: String,

    /// Source data as a JSON object
    #[arg(short, long, conflicts_with = "data_file")]
    pub data: Option<String>,

    /// File holding the source data as a JSON object
    #[arg(short = 'f', long)]
    pub data_file: Option<String>,

    /// Print the full mapping result as JSON
    #[arg(long)]
    pub json: bool,
}

impl ValidateDataArgs {
    fn raw_data(&self) -> Result<Option<String>, IvrError> {
        match (&self.data, &self.data_file) {
            (Some(data), _) => Ok(Some(data.clone())),
            (None, Some(path)) => fs::read_to_string(path)
                .map(Some)
                .map_err(|e| IvrError::MalformedInput(format!("Cannot read {path}: {e}"))),
            (None, None) => Ok(None),
        }
    }

    /// Execute the validate-data command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let data = match self
            .raw_data()
            .and_then(|raw| parse_data_arg(raw.as_deref()))
        {
            Ok(data) => data,
            Err(e) => return Ok(report_failure("Invalid input data", &e)),
        };
        let services = match load_services(config_path).await {
            Ok(services) => services,
            Err(code) => return Ok(code),
        };

        let result = match services.mapping.validate_data(&self.manufacturer, &data).await {
            Ok(result) => result,
            Err(e) => return Ok(report_failure("Validation failed", &e)),
        };

        if self.json {
            print_json(&result)?;
        } else {
            println!("🔍 Validating data for {}", result.manufacturer.name);
            println!();
            println!(
                "  Required completeness: {:.2}%",
                result.completeness.required_percentage
            );
            for error in &result.validation.errors {
                println!("  ❌ {error}");
            }
            for warning in &result.validation.warnings {
                println!("  ⚠️  {warning}");
            }
            if result.validation.valid {
                println!("✅ Data is valid");
            }
        }

        if result.validation.valid {
            Ok(EXIT_OK)
        } else {
            Ok(EXIT_VALIDATION)
        }
    }
}
