// SPDX-License-Identifier: AGPL-3.0
// SFTP Courier CLI - Watch a folder and upload new files over SFTP

mod alerts;
mod cli;
mod sftp;

use clap::Parser;
use cli::Cli;
use sftp_courier_core::{
    discover_config_path, scan_in_background, Alert, AlertSink, CourierConfig, CourierError,
    Dispatcher, Notifier, Pipeline,
};
use std::process::ExitCode;
use std::sync::Arc;

/// How the watch loop ended
enum Shutdown {
    Clean,
    /// Interrupted mid-transfer; a blocking task still owns the session
    Abandoned,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sftp_courier=info".parse().unwrap())
                .add_directive("sftp_courier_core=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    tracing::info!("Starting SFTP Courier v{}", env!("CARGO_PKG_VERSION"));

    let (alerts, emitter) = alerts::start(!cli.no_desktop_alerts);
    let code = match run(&cli, alerts.clone()).await {
        Ok(Shutdown::Clean) => ExitCode::SUCCESS,
        Ok(Shutdown::Abandoned) => {
            // Waiting on the stalled transfer would block exit indefinitely
            tracing::warn!("Exiting without waiting for the interrupted transfer");
            std::process::exit(0);
        }
        Err(err) => {
            alerts.alert(Alert::error("Error", err.to_string()));
            ExitCode::FAILURE
        }
    };

    drop(alerts);
    if let Some(emitter) = emitter {
        emitter.finish();
    }
    code
}

async fn run(cli: &Cli, alerts: Arc<dyn AlertSink>) -> Result<Shutdown, CourierError> {
    let working_dir = std::env::current_dir()
        .map_err(|e| CourierError::Runtime(format!("Failed to read working directory: {}", e)))?;
    let config_path = discover_config_path(cli.config.as_deref(), &working_dir)?;
    let config = CourierConfig::load(&config_path)?;
    if config.watch_extensions.is_empty() {
        tracing::warn!("WatchFileExtension is empty; no file will be uploaded");
    }
    tracing::info!(
        "Handled files will be moved to {}",
        config.processed_folder().display()
    );

    let session = sftp::connect_in_background(config.clone()).await?;
    let pipeline = Pipeline::new(session, config.watch_settings(), alerts);

    if cli.scan_only {
        let (_pipeline, report) = scan_in_background(pipeline).await?;
        report?;
        return Ok(Shutdown::Clean);
    }

    // Attach first so files landing during the scan are still seen
    let (notifier, streams) = Notifier::watch(&config.folder_to_watch)?;

    let (pipeline, report) = scan_in_background(pipeline).await?;
    if let Err(err) = report {
        pipeline.alert(Alert::error(
            "Error",
            format!("Error processing existing files: {}", err),
        ));
    }

    let mut dispatcher = Dispatcher::new(pipeline);
    let interrupted = tokio::select! {
        result = dispatcher.run(streams) => {
            result?;
            false
        }
        _ = tokio::signal::ctrl_c() => true,
    };
    drop(notifier);
    if interrupted {
        tracing::info!("Interrupted, shutting down");
        dispatcher.interrupt();
    }

    let stats = dispatcher.stats();
    tracing::info!(
        "Watched since {}: {} events, {} delivered, {} failed, {} ignored, {} watcher errors",
        stats.started_at.format("%Y-%m-%d %H:%M:%S"),
        stats.events_received,
        stats.delivered,
        stats.failed,
        stats.ignored,
        stats.notifier_errors
    );

    match dispatcher.into_pipeline() {
        Some(_pipeline) => Ok(Shutdown::Clean),
        None => Ok(Shutdown::Abandoned),
    }
}
