//! Manufacturers command implementation

use super::{load_manufacturer_catalog, print_json, report_failure, EXIT_CONFIG, EXIT_OK};
use crate::config::load_config;
use clap::Args;

/// Arguments for the manufacturers command
#[derive(Args, Debug)]
pub struct ManufacturersArgs {
    /// Show the field definitions of one manufacturer
    pub name: Option<String>,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

impl ManufacturersArgs {
    /// Execute the manufacturers command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(config) => config,
            Err(e) => {
                println!("❌ Failed to load configuration file {config_path}");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };
        let catalog = match load_manufacturer_catalog(&config.mapping) {
            Ok(catalog) => catalog,
            Err(e) => return Ok(report_failure("Failed to load manufacturer catalog", &e)),
        };

        if let Some(name) = &self.name {
            let profile = match catalog.get(name) {
                Ok(profile) => profile,
                Err(e) => return Ok(report_failure("Unknown manufacturer", &e)),
            };
            let detail = profile.detail();
            if self.json {
                print_json(&detail)?;
            } else {
                println!("🏭 {} ({})", profile.name, profile.id);
                println!("  Template: {}", profile.template_id);
                println!();
                for field in &profile.fields {
                    let marker = if field.required { "*" } else { " " };
                    println!("  {marker} {:<36} {}", field.name.as_str(), field.rule);
                }
            }
            return Ok(EXIT_OK);
        }

        let summaries = catalog.list();
        if self.json {
            print_json(&summaries)?;
        } else {
            println!("🏭 {} manufacturer(s)", summaries.len());
            for summary in &summaries {
                println!(
                    "  {:<28} {:<32} {} fields",
                    summary.id.as_str(),
                    summary.name,
                    summary.field_count
                );
            }
        }
        Ok(EXIT_OK)
    }
}
