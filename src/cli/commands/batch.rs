//! Batch command implementation

use super::{load_services, print_json, report_failure, EXIT_OK, EXIT_VALIDATION};
use crate::core::batch::BatchSummary;
use crate::domain::EpisodeId;
use clap::Args;

/// Arguments for the batch command
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Manufacturer id or name
    #[arg(short, long)]
    pub manufacturer: String,

    /// Comma-separated episode ids
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub episode_ids: Vec<EpisodeId>,

    /// Create or update DocuSeal submissions instead of only mapping
    #[arg(long)]
    pub submit: bool,

    /// Print per-episode results as JSON
    #[arg(long)]
    pub json: bool,
}

impl BatchArgs {
    /// Execute the batch command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(
            manufacturer = %self.manufacturer,
            episodes = self.episode_ids.len(),
            submit = self.submit,
            "Starting batch"
        );

        let services = match load_services(config_path).await {
            Ok(services) => services,
            Err(code) => return Ok(code),
        };

        let summary = if self.submit {
            match services
                .gateway
                .batch_process(&self.episode_ids, &self.manufacturer)
                .await
            {
                Ok(outcome) => {
                    if self.json {
                        print_json(&outcome)?;
                    }
                    outcome.summary
                }
                Err(e) => return Ok(report_failure("Batch submission failed", &e)),
            }
        } else {
            match services
                .mapping
                .map_batch(&self.episode_ids, &self.manufacturer)
                .await
            {
                Ok(outcome) => {
                    if self.json {
                        print_json(&outcome)?;
                    }
                    outcome.summary
                }
                Err(e) => return Ok(report_failure("Batch mapping failed", &e)),
            }
        };

        if !self.json {
            print_summary(&summary);
        }

        if summary.failed > 0 {
            Ok(EXIT_VALIDATION)
        } else {
            Ok(EXIT_OK)
        }
    }
}

fn print_summary(summary: &BatchSummary) {
    println!();
    println!("📊 Batch Summary");
    println!("  Total:      {}", summary.total);
    println!("  Successful: {}", summary.successful);
    println!("  Failed:     {}", summary.failed);
    println!();
    if summary.failed == 0 {
        println!("✅ All episodes processed");
    } else {
        println!("⚠️  Batch completed with {} failure(s)", summary.failed);
    }
}
