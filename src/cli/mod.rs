//! CLI interface and argument parsing

pub mod commands;

use clap::{Parser, Subcommand};

/// IVR Mapper - manufacturer field mapping and IVR submissions
#[derive(Parser, Debug)]
#[command(name = "ivr-mapper")]
#[command(version, about, long_about = None)]
#[command(author = "IVR Mapper Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "ivr-mapper.toml", env = "IVR_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "IVR_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Map an episode's clinical data onto a manufacturer's form
    Map(commands::map::MapArgs),

    /// Validate supplied data against a manufacturer's form
    ValidateData(commands::validate_data::ValidateDataArgs),

    /// Create or update the DocuSeal submission for an episode
    Submit(commands::submit::SubmitArgs),

    /// Map or submit many episodes for one manufacturer
    Batch(commands::batch::BatchArgs),

    /// Submission analytics
    Analytics(commands::analytics::AnalyticsArgs),

    /// List manufacturers or show one manufacturer's fields
    Manufacturers(commands::manufacturers::ManufacturersArgs),

    /// Run the HTTP API
    Serve(commands::serve::ServeArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use commands::map::OutputFormat;

    #[test]
    fn test_cli_parse_map() {
        let cli = Cli::parse_from([
            "ivr-mapper",
            "map",
            "--episode-id",
            "42",
            "--manufacturer",
            "acz-associates",
        ]);
        assert_eq!(cli.config, "ivr-mapper.toml");
        match cli.command {
            Commands::Map(args) => {
                assert_eq!(args.episode_id.to_string(), "42");
                assert_eq!(args.manufacturer, "acz-associates");
                assert_eq!(args.output, OutputFormat::Summary);
                assert!(args.data.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_rejects_invalid_episode_id() {
        let result = Cli::try_parse_from([
            "ivr-mapper",
            "map",
            "--episode-id",
            "abc",
            "--manufacturer",
            "acz-associates",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["ivr-mapper", "--config", "custom.toml", "manufacturers"]);
        assert_eq!(cli.config, "custom.toml");
        assert!(matches!(cli.command, Commands::Manufacturers(_)));
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["ivr-mapper", "--log-level", "debug", "validate-config"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_batch_ids() {
        let cli = Cli::parse_from([
            "ivr-mapper",
            "batch",
            "-m",
            "biowound-solutions",
            "--episode-ids",
            "1,2,3",
            "--submit",
        ]);
        match cli.command {
            Commands::Batch(args) => {
                assert_eq!(args.episode_ids.len(), 3);
                assert!(args.submit);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_validate_data_conflicts() {
        let result = Cli::try_parse_from([
            "ivr-mapper",
            "validate-data",
            "-m",
            "acz-associates",
            "--data",
            "{}",
            "--data-file",
            "data.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_serve_and_init() {
        let cli = Cli::parse_from(["ivr-mapper", "serve", "--bind", "0.0.0.0:9000"]);
        match cli.command {
            Commands::Serve(args) => assert_eq!(args.bind.as_deref(), Some("0.0.0.0:9000")),
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::parse_from(["ivr-mapper", "init"]);
        assert!(matches!(cli.command, Commands::Init(_)));
    }

    #[test]
    fn test_cli_parse_analytics() {
        let cli = Cli::parse_from([
            "ivr-mapper",
            "analytics",
            "--start-date",
            "2025-01-01",
        ]);
        match cli.command {
            Commands::Analytics(args) => {
                assert_eq!(args.start_date.as_deref(), Some("2025-01-01"));
                assert!(args.manufacturer.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
