//! Submit command implementation

use super::{load_services, parse_data_arg, print_json, report_failure, EXIT_OK};
use crate::domain::EpisodeId;
use clap::Args;

/// Arguments for the submit command
#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Episode to submit
    #[arg(short, long)]
    pub episode_id: EpisodeId,

    /// Manufacturer id or name
    #[arg(short, long)]
    pub manufacturer: String,

    /// Additional source data as a JSON object
    #[arg(short, long)]
    pub data: Option<String>,

    /// Print the full outcome as JSON
    #[arg(long)]
    pub json: bool,
}

impl SubmitArgs {
    /// Execute the submit command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(
            episode_id = %self.episode_id,
            manufacturer = %self.manufacturer,
            "Submitting IVR form"
        );

        let data = match parse_data_arg(self.data.as_deref()) {
            Ok(data) => data,
            Err(e) => return Ok(report_failure("Invalid --data", &e)),
        };
        let services = match load_services(config_path).await {
            Ok(services) => services,
            Err(code) => return Ok(code),
        };

        let outcome = match services
            .gateway
            .create_or_update(self.episode_id, &self.manufacturer, &data)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => return Ok(report_failure("Submission failed", &e)),
        };

        if self.json {
            print_json(&outcome)?;
        } else {
            let action = if outcome.created { "created" } else { "updated" };
            println!("✅ Submission {action}");
            println!("  Submission ID: {}", outcome.submission.id);
            println!("  Status: {}", outcome.ivr_episode.status);
            println!(
                "  Field completeness: {:.2}%",
                outcome.ivr_episode.field_completeness
            );
            for warning in &outcome.ivr_episode.validation_warnings {
                println!("  ⚠️  {warning}");
            }
        }
        Ok(EXIT_OK)
    }
}
