//! Init command implementation
//!
//! Writes a starter configuration file.

use super::{EXIT_CONFIG, EXIT_FATAL, EXIT_OK};
use clap::Args;
use std::fs;
use std::path::Path;

const EXAMPLE_CONFIG: &str = include_str!("../../../config/ivr-mapper.example.toml");

const MINIMAL_CONFIG: &str = r#"# IVR Mapper configuration

environment = "development"
storage_backend = "memory"

[application]
log_level = "info"

[server]
bind_address = "127.0.0.1:8080"
api_keys = ["${IVR_API_KEY}"]

[docuseal]
base_url = "https://api.docuseal.com"
api_key = "${DOCUSEAL_API_KEY}"

[mapping]
catalog_path = "config/manufacturers.toml"
"#;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "ivr-mapper.toml")]
    pub output: String,

    /// Write the fully commented example configuration
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing IVR Mapper configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(EXIT_CONFIG);
        }

        let contents = if self.with_examples {
            EXAMPLE_CONFIG
        } else {
            MINIMAL_CONFIG
        };

        match fs::write(&self.output, contents) {
            Ok(()) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Set DOCUSEAL_API_KEY and IVR_API_KEY in your environment or .env");
                println!("  3. Validate configuration: ivr-mapper validate-config");
                println!("  4. Start the API: ivr-mapper serve");
                println!();
                Ok(EXIT_OK)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(EXIT_FATAL)
            }
        }
    }
}
