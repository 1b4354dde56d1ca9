//! Validate-config command implementation

use super::{load_manufacturer_catalog, EXIT_CONFIG, EXIT_OK};
use crate::config::load_config;
use crate::config::schema::StorageBackend;
use clap::Args;
use secrecy::ExposeSecret;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration is valid");
                c
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let catalog = match load_manufacturer_catalog(&config.mapping) {
            Ok(catalog) => {
                println!("✅ Manufacturer catalog loaded ({} manufacturers)", catalog.len());
                catalog
            }
            Err(e) => {
                println!("❌ Manufacturer catalog is invalid");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        println!();
        println!("Configuration Summary:");
        println!("  Environment: {:?}", config.environment);
        println!("  Log Level: {}", config.application.log_level);
        println!("  Bind Address: {}", config.server.bind_address);
        println!("  API Keys: {}", config.server.api_keys.len());
        println!("  DocuSeal: {}", config.docuseal.base_url);
        println!(
            "  Webhook Signatures: {}",
            if config.docuseal.webhook_secret.is_some() {
                "verified"
            } else {
                "not configured"
            }
        );
        match &config.ml.base_url {
            Some(url) if config.ml.enabled => println!("  ML Service: {url}"),
            _ => println!("  ML Service: disabled (heuristic matching)"),
        }
        match config.storage_backend {
            StorageBackend::Memory => println!("  Storage: in-memory"),
            StorageBackend::PostgreSQL => {
                if let Some(pg) = &config.postgresql {
                    let connection: &str = pg.connection_string.expose_secret().as_ref();
                    println!(
                        "  Storage: PostgreSQL ({})",
                        connection.split('@').next_back().unwrap_or("***")
                    );
                    println!("  Max Connections: {}", pg.max_connections);
                }
            }
        }
        println!("  Catalog: {}", config.mapping.catalog_path);
        for summary in catalog.list() {
            println!("    - {} ({} fields)", summary.id, summary.field_count);
        }
        println!("  Batch Concurrency: {}", config.mapping.batch_concurrency);
        println!();
        Ok(EXIT_OK)
    }
}
