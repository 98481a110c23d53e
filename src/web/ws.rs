// WebSocket endpoint for editor and pipeline clients.
//
// A session is registered once the upgrade has completed and the greeting was
// written, and unregistered when the client closes, the socket errors, or the
// broadcast hub gives up on it. Outbound frames flow through the session's
// queue into a dedicated writer task.

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, warn};

use super::{SharedBridge, models::SocketQuery};
use crate::session::{ServerMessage, SessionHandle};

// --- GET /ps/ws?role=editor&client_id=.. ---
pub async fn session_socket(
    ws: WebSocketUpgrade,
    State(bridge): State<SharedBridge>,
    Query(query): Query<SocketQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_session(socket, bridge, query))
}

async fn handle_session(socket: WebSocket, bridge: SharedBridge, query: SocketQuery) {
    let (session, mut outbound_rx) =
        SessionHandle::new(query.role, query.client_id, bridge.session_queue());
    let session_id = session.id();
    let (mut ws_tx, mut ws_rx) = socket.split();

    let greeting = ServerMessage::Connected {
        session_id,
        role: session.role(),
    };
    match greeting.to_frame() {
        Ok(frame) => {
            if ws_tx.send(Message::Text(frame.to_string().into())).await.is_err() {
                debug!(session_id = %session_id, "Client went away before the greeting");
                return;
            }
        }
        Err(e) => warn!(session_id = %session_id, error = %e, "Failed to serialize greeting"),
    }

    bridge.registry().register(session).await;

    // Ends when the registry drops the session (closing the queue) or the
    // socket stops accepting writes.
    let mut writer = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if let Err(e) = ws_tx.send(Message::Text(frame.to_string().into())).await {
                debug!(session_id = %session_id, error = %e, "Socket write failed");
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    loop {
        tokio::select! {
            message = ws_rx.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        debug!(session_id = %session_id, "Ignoring client message: {}", text.as_str());
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    // Ping/Pong handled automatically
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        debug!(session_id = %session_id, error = %e, "Socket read failed");
                        break;
                    }
                }
            }
            _ = &mut writer => break,
        }
    }

    bridge.registry().unregister(session_id).await;
    writer.abort();
}
