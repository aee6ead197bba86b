use crate::config::parse::{load_config, ConfigError};
use crate::pipeline::{run_pipeline, PipelineError};
use std::path::PathBuf;
use thiserror::Error;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Dispatch};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

pub async fn run(
    config_path: Option<PathBuf>,
    logger: Dispatch,
) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = match config_path {
        Some(path) => path,
        None => {
            eprintln!("Error: config not found");
            eprintln!("Searched locations:");
            eprintln!("  ~/.config/ytail/config.yml");
            eprintln!("  /etc/ytail/config.yml");
            eprintln!("\nUse --config <path> to specify a config file, or run 'ytail config init' to generate one.");
            std::process::exit(1);
        }
    };

    run_with_signals(config_path, logger).await.map_err(|e| e.into())
}

async fn run_with_signals(config_path: PathBuf, logger: Dispatch) -> Result<(), RunError> {
    info!(config_path = %config_path.display(), "Loading configuration");
    let config = load_config(&config_path)?;

    info!(
        scrape_path = %config.tailer.scrape_path.display(),
        file_pattern = %config.tailer.file_pattern,
        push_url = %config.client.push_url,
        "Starting pipeline, press Ctrl+C to shutdown"
    );

    let cancel = CancellationToken::new();
    let signal_task = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::select! {
                result = signal::ctrl_c() => {
                    match result {
                        Ok(()) => info!("Shutdown signal received"),
                        Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
                    }
                    cancel.cancel();
                }
                _ = cancel.cancelled() => {}
            }
        }
    });

    let result = run_pipeline(&config, cancel.clone(), logger).await;

    // Release the signal listener if the pipeline ended on its own.
    cancel.cancel();
    let _ = signal_task.await;

    result?;
    info!("Shutdown complete");
    Ok(())
}
