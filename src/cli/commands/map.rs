//! Map command implementation

use super::{load_services, parse_data_arg, print_json, report_failure, EXIT_OK, EXIT_VALIDATION};
use crate::domain::EpisodeId;
use clap::{Args, ValueEnum};

/// Output style for mapping results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    Summary,
    /// Full mapping result as JSON
    Json,
}

/// Arguments for the map command
#[derive(Args, Debug)]
pub struct MapArgs {
    /// Episode to map
    #[arg(short, long)]
    pub episode_id: EpisodeId,

    /// Manufacturer id or name
    #[arg(short, long)]
    pub manufacturer: String,

    /// Additional source data as a JSON object; overrides extracted values
    #[arg(short, long)]
    pub data: Option<String>,

    #[arg(short, long, value_enum, default_value = "summary")]
    pub output: OutputFormat,
}

impl MapArgs {
    /// Execute the map command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(
            episode_id = %self.episode_id,
            manufacturer = %self.manufacturer,
            "Mapping episode"
        );

        let data = match parse_data_arg(self.data.as_deref()) {
            Ok(data) => data,
            Err(e) => return Ok(report_failure("Invalid --data", &e)),
        };
        let services = match load_services(config_path).await {
            Ok(services) => services,
            Err(code) => return Ok(code),
        };

        let result = match services
            .mapping
            .map_episode(self.episode_id, &self.manufacturer, &data)
            .await
        {
            Ok(result) => result,
            Err(e) => return Ok(report_failure("Mapping failed", &e)),
        };

        match self.output {
            OutputFormat::Json => print_json(&result)?,
            OutputFormat::Summary => {
                println!(
                    "🗺️  Episode {} → {}",
                    self.episode_id, result.manufacturer.name
                );
                println!();
                for mapping in &result.fields {
                    let method = mapping
                        .method
                        .map(|m| format!("{m:?}"))
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "  {:<32} {:<24} {:>5.2}  {}",
                        mapping.target.as_str(),
                        mapping.value,
                        mapping.confidence,
                        method
                    );
                }
                println!();
                println!(
                    "  Field completeness:    {:.2}%",
                    result.completeness.percentage
                );
                println!(
                    "  Required completeness: {:.2}%",
                    result.completeness.required_percentage
                );
                if !result.unmatched_targets.is_empty() {
                    let unmatched: Vec<&str> =
                        result.unmatched_targets.iter().map(|k| k.as_str()).collect();
                    println!("  Unmatched: {}", unmatched.join(", "));
                }
                for warning in &result.validation.warnings {
                    println!("  ⚠️  {warning}");
                }
                for error in &result.validation.errors {
                    println!("  ❌ {error}");
                }
            }
        }

        if result.validation.valid {
            Ok(EXIT_OK)
        } else {
            Ok(EXIT_VALIDATION)
        }
    }
}
