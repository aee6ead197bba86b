use crate::client::batch::Batch;
use crate::client::payload::PushRequest;
use crate::client::retry::{retry, RetryPolicy};
use crate::client::transport::{DeliveryError, HttpTransport, Transport};
use crate::config::types::ClientConfig;
use crate::pipeline::entry::{Entry, Metadata};
use crate::pipeline::sink::{EntrySink, ForwardError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;
use tracing::{debug, error, info, warn, Dispatch};

/// Failure of a single flush. The batch involved is dropped either way.
#[derive(Debug, Error)]
pub enum FlushError {
    #[error("failed to encode batch: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("delivery failed after {attempts} attempts: {source}")]
    Delivery {
        attempts: u32,
        #[source]
        source: DeliveryError,
    },
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error("shipping client is stopped")]
    Stopped,

    /// The entry was queued, but the most recent flush failed.
    #[error("last flush failed: {0}")]
    LastFlush(Arc<FlushError>),
}

type SharedError = Arc<Mutex<Option<Arc<FlushError>>>>;

/// Queues entries and ships them in batches from a background task.
///
/// `send` only blocks when the inbound queue is full. Delivery failures never
/// stop the background task; the most recent one is kept and reported through
/// [`ShippingClient::err`] until a later flush succeeds.
pub struct ShippingClient {
    tx: mpsc::Sender<Entry>,
    last_error: SharedError,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
    logger: Dispatch,
}

pub struct ShippingClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    cancel: Option<CancellationToken>,
    logger: Dispatch,
}

impl ShippingClientBuilder {
    /// Replace the HTTP transport built from `push_url`.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Stop the client when `token` is cancelled, in addition to [`ShippingClient::stop`].
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn logger(mut self, logger: Dispatch) -> Self {
        self.logger = logger;
        self
    }

    /// Spawn the accumulation task. Must be called within a tokio runtime.
    pub fn start(self) -> Result<ShippingClient, DeliveryError> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(
                self.config.push_url.clone(),
                self.config.timeout,
            )?),
        };

        let cancel = match self.cancel {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };

        let (tx, rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let last_error: SharedError = Arc::new(Mutex::new(None));

        let accumulator = Accumulator {
            rx,
            cancel: cancel.clone(),
            batch_max_size: self.config.batch_max_size,
            batch_max_wait: self.config.batch_max_wait,
            shipper: Shipper {
                transport,
                labels: self.config.labels.clone(),
                policy: RetryPolicy::from(&self.config),
                last_error: Arc::clone(&last_error),
            },
        };

        let task = tokio::spawn(accumulator.run().with_subscriber(self.logger.clone()));

        Ok(ShippingClient {
            tx,
            last_error,
            cancel,
            task: Mutex::new(Some(task)),
            logger: self.logger,
        })
    }
}

impl ShippingClient {
    pub fn builder(config: ClientConfig) -> ShippingClientBuilder {
        ShippingClientBuilder {
            config,
            transport: None,
            cancel: None,
            logger: Dispatch::none(),
        }
    }

    /// Queue a line for shipping, stamped with the current time.
    pub async fn send(&self, line: impl Into<String>, metadata: Metadata) -> Result<(), SendError> {
        self.send_entry(Entry::with_metadata(line, metadata)).await
    }

    /// Queue an entry, waiting for room if the queue is full.
    pub async fn send_entry(&self, entry: Entry) -> Result<(), SendError> {
        self.tx
            .send(entry)
            .await
            .map_err(|_| SendError::Stopped)?;

        match self.err() {
            Some(e) => Err(SendError::LastFlush(e)),
            None => Ok(()),
        }
    }

    /// Most recent flush failure, if the last flush did not succeed.
    ///
    /// A later successful flush clears it, so `None` means the most recent
    /// push got through, not that no batch was ever dropped.
    pub fn err(&self) -> Option<Arc<FlushError>> {
        self.last_error.lock().ok().and_then(|guard| guard.clone())
    }

    /// Cancel the accumulation task and wait for it to exit.
    ///
    /// Entries still queued or sitting in the current batch are discarded.
    /// The transport and its connection pool are released with the task.
    pub async fn stop(&self) {
        self.cancel.cancel();

        let handle = self.task.lock().ok().and_then(|mut guard| guard.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::dispatcher::with_default(&self.logger, || {
                    warn!(error = %e, "Shipping task ended abnormally");
                });
            }
        }
    }
}

#[async_trait]
impl EntrySink for ShippingClient {
    async fn forward(&self, entry: Entry) -> Result<(), ForwardError> {
        match self.send_entry(entry).await {
            // Delivery trouble is reported through err(); the entry itself was accepted.
            Ok(()) | Err(SendError::LastFlush(_)) => Ok(()),
            Err(SendError::Stopped) => Err(ForwardError::Closed),
        }
    }
}

struct Accumulator {
    rx: mpsc::Receiver<Entry>,
    cancel: CancellationToken,
    batch_max_size: usize,
    batch_max_wait: Duration,
    shipper: Shipper,
}

impl Accumulator {
    async fn run(mut self) {
        info!(
            batch_max_size = self.batch_max_size,
            batch_max_wait_ms = self.batch_max_wait.as_millis() as u64,
            "Shipping client started"
        );

        let mut batch = Batch::new();
        let timer = tokio::time::sleep_until(batch.created_at() + self.batch_max_wait);
        tokio::pin!(timer);

        loop {
            let flush_now = tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    info!(discarded = batch.len(), "Shipping client stopped");
                    break;
                }

                received = self.rx.recv() => match received {
                    Some(entry) => {
                        batch.add(entry);
                        batch.is_ready(self.batch_max_size)
                    }
                    None => {
                        info!(discarded = batch.len(), "Inbound queue closed");
                        break;
                    }
                },

                () = &mut timer => {
                    if batch.is_empty() {
                        batch = Batch::new();
                        timer.as_mut().reset(batch.created_at() + self.batch_max_wait);
                        false
                    } else {
                        debug!(
                            entries = batch.len(),
                            age_ms = batch.age().as_millis() as u64,
                            "Batch max wait reached"
                        );
                        true
                    }
                }
            };

            if !flush_now {
                continue;
            }

            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    info!(discarded = batch.len(), "Shipping client stopped during flush");
                    break;
                }

                () = self.shipper.flush(&batch) => {}
            }

            batch = Batch::new();
            timer.as_mut().reset(batch.created_at() + self.batch_max_wait);
        }
    }
}

struct Shipper {
    transport: Arc<dyn Transport>,
    labels: BTreeMap<String, String>,
    policy: RetryPolicy,
    last_error: SharedError,
}

impl Shipper {
    async fn flush(&self, batch: &Batch) {
        if batch.is_empty() {
            return;
        }

        match self.deliver(batch).await {
            Ok(bytes) => {
                info!(entries = batch.len(), bytes = bytes, "Logs pushed");
                self.record(None);
            }
            Err(e) => {
                error!(entries = batch.len(), error = %e, "Batch dropped");
                self.record(Some(Arc::new(e)));
            }
        }
    }

    async fn deliver(&self, batch: &Batch) -> Result<usize, FlushError> {
        let body = PushRequest::new(&self.labels, batch.entries()).encode()?;

        retry(&self.policy, || self.transport.push(&body))
            .await
            .map_err(|source| FlushError::Delivery {
                attempts: self.policy.attempts.max(1),
                source,
            })?;

        Ok(body.len())
    }

    fn record(&self, error: Option<Arc<FlushError>>) {
        if let Ok(mut guard) = self.last_error.lock() {
            *guard = error;
        }
    }
}
