//! WebSocket channel: outbound task results, inbound process/submit requests.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use super::AppState;
use crate::notify::{ClientAction, ServerMessage};

pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    info!("WebSocket client connecting");
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let mut subscription = state.broadcaster.subscribe();
    info!(subscriber = %subscription.id, "WebSocket client connected");

    loop {
        tokio::select! {
            // Forward broadcast events to this client
            event = subscription.recv() => {
                match event {
                    Ok(event) => {
                        let msg = ServerMessage::ProcessResult(event);
                        if send_json(&mut socket, &msg).await.is_err() {
                            debug!("Client disconnected during send");
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        warn!(subscriber = %subscription.id, missed = n, "WS client lagged behind broadcast");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Broadcast channel closed");
                        break;
                    }
                }
            }

            // Receive requests from client
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = handle_client_message(&text, &state).await {
                            if send_json(&mut socket, &reply).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("WebSocket client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    info!(subscriber = %subscription.id, "WebSocket connection closed");
    state.broadcaster.unsubscribe(subscription);
}

/// Handle one client frame. Returns a direct reply for that client, if any.
async fn handle_client_message(text: &str, state: &AppState) -> Option<ServerMessage> {
    let action = match serde_json::from_str::<ClientAction>(text) {
        Ok(action) => action,
        Err(e) => {
            debug!(error = %e, text = text, "Unrecognized WS message from client");
            return Some(ServerMessage::Error {
                id: None,
                message: format!("unrecognized message: {e}"),
            });
        }
    };

    match action {
        ClientAction::ProcessRequest { id } => match state.dispatcher.dispatch(&id).await {
            Ok(()) => {
                info!(task_id = %id, "Processing requested via WS");
                None
            }
            Err(e) => {
                warn!(task_id = %id, error = %e, "Process request refused");
                Some(ServerMessage::Error {
                    id: Some(id),
                    message: e.to_string(),
                })
            }
        },
        ClientAction::SubmitTask => match state.admission.admit().await {
            Ok(ack) => Some(ServerMessage::TaskAccepted {
                id: ack.id,
                status: ack.status,
            }),
            Err(e) => Some(ServerMessage::Error {
                id: None,
                message: e.to_string(),
            }),
        },
    }
}

async fn send_json(socket: &mut WebSocket, msg: &ServerMessage) -> Result<(), axum::Error> {
    match serde_json::to_string(msg) {
        Ok(json) => socket.send(Message::Text(json.into())).await,
        Err(e) => {
            warn!(error = %e, "Failed to serialize outbound message");
            Ok(())
        }
    }
}
