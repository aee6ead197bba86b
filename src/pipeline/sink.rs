use crate::pipeline::entry::Entry;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("entry sink is closed")]
    Closed,
}

/// Downstream consumer of tailed entries.
///
/// Implementations may block the caller (backpressure) but must not drop an
/// entry silently: either it is accepted or an error is returned.
#[async_trait]
pub trait EntrySink: Send + Sync {
    async fn forward(&self, entry: Entry) -> Result<(), ForwardError>;
}

#[async_trait]
impl EntrySink for mpsc::Sender<Entry> {
    async fn forward(&self, entry: Entry) -> Result<(), ForwardError> {
        self.send(entry).await.map_err(|_| ForwardError::Closed)
    }
}
