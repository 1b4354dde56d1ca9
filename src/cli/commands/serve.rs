//! Serve command implementation

use super::{build_services, report_failure, EXIT_CONFIG, EXIT_OK};
use crate::api::{self, ApiAuth, AppState};
use crate::config::load_config;
use clap::Args;
use tokio::sync::watch;

/// Arguments for the serve command
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Override `server.bind_address`
    #[arg(short, long)]
    pub bind: Option<String>,
}

impl ServeArgs {
    /// Execute the serve command
    ///
    /// Runs until `shutdown` flips to true.
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let mut config = match load_config(config_path) {
            Ok(config) => config,
            Err(e) => {
                println!("❌ Failed to load configuration file {config_path}");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };
        if let Some(bind) = &self.bind {
            config.server.bind_address = bind.clone();
        }

        let services = match build_services(&config).await {
            Ok(services) => services,
            Err(e) => return Ok(report_failure("Failed to initialize services", &e)),
        };

        let auth = ApiAuth::new(
            config.server.api_keys.clone(),
            config.docuseal.webhook_secret.clone(),
        );
        let state = AppState::new(services.gateway, services.analytics, auth);

        println!("🚀 Serving IVR Mapper API on {}", config.server.bind_address);
        match api::serve(state, &config.server, shutdown).await {
            Ok(()) => {
                println!("👋 Server stopped");
                Ok(EXIT_OK)
            }
            Err(e) => Ok(report_failure("API server failed", &e)),
        }
    }
}
