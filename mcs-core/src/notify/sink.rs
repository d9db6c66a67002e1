use async_trait::async_trait;
use mcs_model::SequenceStatus;
use thiserror::Error;
use tokio::sync::mpsc;

/// Returned by a sink whose consumer has gone away. The hub tears the
/// subscription down on the first one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("status consumer disconnected")]
pub struct SinkClosed;

/// Delivery target for one subscription. Each sink is driven by its own
/// task, so a slow `deliver` only delays that subscriber.
#[async_trait]
pub trait StatusSink: Send + 'static {
    async fn deliver(&mut self, status: SequenceStatus) -> Result<(), SinkClosed>;
}

#[async_trait]
impl StatusSink for mpsc::Sender<SequenceStatus> {
    async fn deliver(&mut self, status: SequenceStatus) -> Result<(), SinkClosed> {
        self.send(status).await.map_err(|_| SinkClosed)
    }
}

#[async_trait]
impl StatusSink for mpsc::UnboundedSender<SequenceStatus> {
    async fn deliver(&mut self, status: SequenceStatus) -> Result<(), SinkClosed> {
        self.send(status).map_err(|_| SinkClosed)
    }
}
