use std::sync::Arc;

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::Response,
};
use futures_util::StreamExt;
use mcs_core::{ProcessError, StatusSink, Subscription};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::infra::{
    app_state::AppState,
    websocket::{WebSocketStatusSink, close_socket},
};

/// Why a status stream was refused, sent as the close frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refusal {
    pub code: u16,
    pub reason: String,
}

impl Refusal {
    fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// Registers `sink` for `sequence_id`, or explains why the stream cannot be
/// opened.
pub fn admit<S: StatusSink>(
    state: &AppState,
    sequence_id: &str,
    sink: S,
) -> Result<Subscription, Refusal> {
    let supervisor = state.supervisor().map_err(|_| {
        Refusal::new(close_code::AGAIN, "process service not initialized")
    })?;

    supervisor
        .subscribe_sequence(sequence_id, sink)
        .map_err(|err| match err {
            ProcessError::ServiceUnavailable { .. } => {
                Refusal::new(close_code::AGAIN, "process service not running")
            }
            ProcessError::NotFound(_) => Refusal::new(
                close_code::POLICY,
                format!("unknown sequence {sequence_id}"),
            ),
            other => Refusal::new(close_code::ERROR, other.to_string()),
        })
}

/// `GET /process/sequences/ws/{sequence_id}`
pub async fn sequence_status_ws(
    ws: WebSocketUpgrade,
    Path(sequence_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, sequence_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, sequence_id: String) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let ws_sender = Arc::new(Mutex::new(ws_sender));

    let sink = WebSocketStatusSink::new(Arc::clone(&ws_sender));
    let subscription = match admit(&state, &sequence_id, sink) {
        Ok(subscription) => subscription,
        Err(refusal) => {
            warn!(%sequence_id, code = refusal.code, reason = %refusal.reason, "status stream refused");
            close_socket(&ws_sender, refusal.code, &refusal.reason).await;
            return;
        }
    };

    info!(%sequence_id, subscription = %subscription.id(), "status stream opened");

    // Inbound frames are only watched for disconnects.
    loop {
        tokio::select! {
            _ = subscription.closed() => {
                debug!(%sequence_id, "status stream closed by hub");
                close_socket(&ws_sender, close_code::AWAY, "status stream closed").await;
                break;
            }
            msg = ws_receiver.next() => match msg {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    debug!(%sequence_id, error = %err, "status socket error");
                    break;
                }
            }
        }
    }

    info!(
        %sequence_id,
        subscription = %subscription.id(),
        delivered = subscription.delivered(),
        dropped = subscription.dropped(),
        "status stream ended"
    );
    subscription.unsubscribe();
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use mcs_core::{
        ProcessSupervisor, SequenceService, SequenceStatusHub, SimulatedExecutor,
    };
    use mcs_model::{OverflowPolicy, SequenceDefinition, SequenceStatus};
    use tokio::sync::mpsc;

    use super::*;

    fn supervisor() -> Arc<ProcessSupervisor> {
        let sequences = SequenceService::new(
            vec![SequenceDefinition::new("S1", "Warmup", 2)],
            SequenceStatusHub::new(8, OverflowPolicy::DropNewest),
            Arc::new(SimulatedExecutor::new(Duration::from_millis(1))),
        )
        .unwrap();
        Arc::new(
            ProcessSupervisor::builder("process", "test")
                .sequences(Arc::new(sequences))
                .build()
                .unwrap(),
        )
    }

    fn sink() -> mpsc::UnboundedSender<SequenceStatus> {
        mpsc::unbounded_channel::<SequenceStatus>().0
    }

    #[tokio::test]
    async fn refuses_without_supervisor() {
        let refusal =
            admit(&AppState::without_supervisor(), "S1", sink()).unwrap_err();
        assert_eq!(refusal.code, close_code::AGAIN);
    }

    #[tokio::test]
    async fn refuses_while_not_running() {
        let state = AppState::new(supervisor());
        let refusal = admit(&state, "S1", sink()).unwrap_err();
        assert_eq!(
            refusal,
            Refusal::new(close_code::AGAIN, "process service not running")
        );
    }

    #[tokio::test]
    async fn refuses_unknown_sequence_with_policy_code() {
        let supervisor = supervisor();
        supervisor.initialize().await.unwrap();
        supervisor.start().await.unwrap();

        let refusal = admit(&AppState::new(supervisor), "S9", sink()).unwrap_err();
        assert_eq!(refusal.code, close_code::POLICY);
        assert!(refusal.reason.contains("S9"));
    }

    #[tokio::test]
    async fn admits_known_sequence_and_unsubscribes_on_drop() {
        let supervisor = supervisor();
        supervisor.initialize().await.unwrap();
        supervisor.start().await.unwrap();
        let state = AppState::new(Arc::clone(&supervisor));

        let subscription = admit(&state, "S1", sink()).unwrap();
        assert_eq!(supervisor.subscriber_count("S1"), 1);

        drop(subscription);
        assert_eq!(supervisor.subscriber_count("S1"), 0);
    }
}
