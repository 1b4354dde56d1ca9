// IVR Mapper - Manufacturer field mapping and IVR submission pipeline
// Copyright (c) 2025 IVR Mapper Contributors
// Licensed under the MIT License

use clap::Parser;
use ivr_mapper::cli::commands::{exit_code_for, EXIT_FATAL};
use ivr_mapper::cli::{Cli, Commands};
use ivr_mapper::config::{load_config, LoggingConfig};
use ivr_mapper::logging::init_logging;
use std::process;
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // The server logs to files when configured; other commands log to the console only
    let configured = load_config(&cli.config).ok();
    let logging_config = match (&cli.command, &configured) {
        (Commands::Serve(_), Some(config)) => config.logging.clone(),
        _ => LoggingConfig::default(),
    };
    let log_level = cli
        .log_level
        .clone()
        .or_else(|| configured.as_ref().map(|c| c.application.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());

    let logging_guard = match init_logging(&log_level, &logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(EXIT_FATAL);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "IVR Mapper - manufacturer field mapping"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        println!("\n⚠️  Shutdown signal received, finishing in-flight requests...");
        let _ = shutdown_tx.send(true);
    });

    let exit_code = match execute_command(&cli, shutdown_rx).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            eprintln!("Error: {e}");
            exit_code_for(&e)
        }
    };

    // Dropping the guard flushes file logs before exit
    drop(logging_guard);
    process::exit(exit_code);
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install SIGTERM handler");
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
            tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
        }
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown..."),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli, shutdown_signal: watch::Receiver<bool>) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Map(args) => args.execute(&cli.config).await,
        Commands::ValidateData(args) => args.execute(&cli.config).await,
        Commands::Submit(args) => args.execute(&cli.config).await,
        Commands::Batch(args) => args.execute(&cli.config).await,
        Commands::Analytics(args) => args.execute(&cli.config).await,
        Commands::Manufacturers(args) => args.execute(&cli.config).await,
        Commands::Serve(args) => args.execute(&cli.config, shutdown_signal).await,
        Commands::ValidateConfig(args) => args.execute(&cli.config).await,
        Commands::Init(args) => args.execute().await,
    }
}
