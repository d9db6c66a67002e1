use std::{fmt, sync::Arc};

use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket};
use futures_util::{SinkExt, stream::SplitSink};
use mcs_core::{SinkClosed, StatusSink};
use mcs_model::{SequenceStatus, SequenceStreamMessage};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Write half of a status socket, shared between the subscription's
/// delivery task and the connection handler that eventually closes it.
pub type SharedSocketSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Writes each status as a `sequence_status` JSON text frame.
pub struct WebSocketStatusSink {
    sender: SharedSocketSender,
}

impl fmt::Debug for WebSocketStatusSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketStatusSink").finish_non_exhaustive()
    }
}

impl WebSocketStatusSink {
    pub fn new(sender: SharedSocketSender) -> Self {
        Self { sender }
    }
}

/// Encodes `message` as a JSON text frame. A status that cannot be encoded
/// ends the stream, so the delivered count only covers frames actually sent.
fn encode_frame<T: Serialize>(sequence_id: &str, message: &T) -> Result<Message, SinkClosed> {
    serde_json::to_string(message)
        .map(|text| Message::Text(Utf8Bytes::from(text)))
        .map_err(|err| {
            warn!(%sequence_id, error = %err, "failed to encode sequence status");
            SinkClosed
        })
}

#[async_trait]
impl StatusSink for WebSocketStatusSink {
    async fn deliver(&mut self, status: SequenceStatus) -> Result<(), SinkClosed> {
        let sequence_id = status.sequence_id.clone();
        let frame =
            encode_frame(&sequence_id, &SequenceStreamMessage::SequenceStatus(status))?;

        let mut sender = self.sender.lock().await;
        sender.send(frame).await.map_err(|err| {
            debug!(%sequence_id, error = %err, "status socket write failed");
            SinkClosed
        })
    }
}

/// Sends a close frame and flushes. Errors are ignored; the peer may
/// already be gone.
pub async fn close_socket(sender: &SharedSocketSender, code: u16, reason: &str) {
    let frame = CloseFrame {
        code,
        reason: Utf8Bytes::from(reason.to_string()),
    };
    let mut sender = sender.lock().await;
    if let Err(err) = sender.send(Message::Close(Some(frame))).await {
        debug!(code, error = %err, "failed to send close frame");
    }
}
