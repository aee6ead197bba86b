use crate::client::{DeliveryError, ShippingClient};
use crate::config::types::Config;
use crate::pipeline::sink::EntrySink;
use crate::tailer::{Tailer, TailerError};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Dispatch};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to start shipping client: {0}")]
    Client(#[from] DeliveryError),

    #[error("tailer error: {0}")]
    Tailer(#[from] TailerError),
}

/// Run the tail-batch-ship pipeline until `cancel` fires or the tailer fails.
///
/// Both the tailer loop and the shipping client observe `cancel`. A tailer
/// error stops the client before it is returned. Entries not yet pushed when
/// the pipeline stops are discarded.
pub async fn run_pipeline(
    config: &Config,
    cancel: CancellationToken,
    logger: Dispatch,
) -> Result<(), PipelineError> {
    let client = Arc::new(
        ShippingClient::builder(config.client.clone())
            .cancellation(cancel.clone())
            .logger(logger.clone())
            .start()?,
    );

    let tailer = Tailer::builder(config.tailer.clone(), Arc::clone(&client) as Arc<dyn EntrySink>)
        .logger(logger.clone())
        .start();

    let result = match tailer {
        Ok(tailer) => tailer.run(cancel).await,
        Err(e) => Err(e),
    };

    client.stop().await;

    tracing::dispatcher::with_default(&logger, || {
        if let Some(e) = client.err() {
            warn!(error = %e, "Last flush before shutdown failed");
        }
        match &result {
            Ok(()) => info!("Pipeline stopped"),
            Err(e) => warn!(error = %e, "Pipeline stopped on error"),
        }
    });

    result.map_err(PipelineError::from)
}
