//! Analytics command implementation

use super::{load_services, print_json, report_failure, EXIT_OK};
use crate::core::analytics::AnalyticsQuery;
use clap::Args;

/// Arguments for the analytics command
#[derive(Args, Debug)]
pub struct AnalyticsArgs {
    /// Restrict to one manufacturer
    #[arg(short, long)]
    pub manufacturer: Option<String>,

    /// First day included (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<String>,

    /// Last day included (YYYY-MM-DD)
    #[arg(long)]
    pub end_date: Option<String>,
}

impl AnalyticsArgs {
    /// Execute the analytics command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let query = match AnalyticsQuery::parse(
            self.manufacturer.as_deref(),
            self.start_date.as_deref(),
            self.end_date.as_deref(),
        ) {
            Ok(query) => query,
            Err(e) => return Ok(report_failure("Invalid analytics query", &e)),
        };
        let services = match load_services(config_path).await {
            Ok(services) => services,
            Err(code) => return Ok(code),
        };

        match services.analytics.generate(&query).await {
            Ok(report) => {
                print_json(&report)?;
                Ok(EXIT_OK)
            }
            Err(e) => Ok(report_failure("Analytics failed", &e)),
        }
    }
}
