//! `GET /ws` - the live notification channel.
//!
//! See [`rally_sdk::objects::ws`] for the protocol.

use axum::{
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use rally_core::events::{Broadcaster, ConnectionId};
use rally_sdk::objects::{WsClientMessage, WsCloseCode, WsServerMessage};

use crate::state::AppState;

pub async fn live_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let broadcaster = state.broadcaster.clone();
    ws.on_upgrade(move |socket| handle_live_ws(socket, broadcaster))
}

/// Background task that drives a single WebSocket connection.
///
/// 1. Registers the connection, which starts global notifications.
/// 2. Relays queued notifications and applies room requests until the
///    client disconnects or a send fails.
/// 3. Unregisters the connection from every room.
async fn handle_live_ws(mut socket: WebSocket, broadcaster: Broadcaster) {
    let (connection, mut notifications) = broadcaster.register().await;
    tracing::debug!(%connection, "WS: connection opened");

    loop {
        tokio::select! {
            notification = notifications.recv() => {
                let Some(notification) = notification else {
                    break;
                };
                if send_json(&mut socket, &notification.to_message()).await.is_err() {
                    break;
                }
            }

            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if handle_client_text(&mut socket, &broadcaster, connection, text.as_str())
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        if send_malformed(&mut socket, "binary frames are not supported")
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Ok(_)) => {
                    }
                    Some(Err(e)) => {
                        tracing::debug!(%connection, error = %e, "WS: receive failed");
                        break;
                    }
                }
            }
        }
    }

    broadcaster.disconnect(connection).await;
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code: WsCloseCode::NORMAL,
            reason: "".into(),
        })))
        .await;
    tracing::debug!(%connection, "WS: connection closed");
}

async fn handle_client_text(
    socket: &mut WebSocket,
    broadcaster: &Broadcaster,
    connection: ConnectionId,
    text: &str,
) -> Result<(), ()> {
    match serde_json::from_str::<WsClientMessage>(text) {
        Ok(WsClientMessage::JoinEventRoom { event_id }) => {
            broadcaster.subscribe(connection, event_id).await;
            tracing::debug!(%connection, %event_id, "WS: joined event room");
            Ok(())
        }
        Ok(WsClientMessage::LeaveEventRoom { event_id }) => {
            broadcaster.unsubscribe(connection, event_id).await;
            tracing::debug!(%connection, %event_id, "WS: left event room");
            Ok(())
        }
        Err(e) => {
            tracing::debug!(%connection, error = %e, "WS: malformed client message");
            send_malformed(socket, &format!("malformed message: {e}")).await
        }
    }
}

async fn send_malformed(socket: &mut WebSocket, reason: &str) -> Result<(), ()> {
    send_json(
        socket,
        &WsServerMessage::Error {
            code: WsCloseCode::MALFORMED_MESSAGE,
            reason: reason.to_owned(),
        },
    )
    .await
}

/// Serialize `value` as JSON and send it as a text WebSocket frame.
///
/// Returns `Err(())` if the send fails (client disconnected).
async fn send_json<T: serde::Serialize>(socket: &mut WebSocket, value: &T) -> Result<(), ()> {
    let json = serde_json::to_string(value).map_err(|_| ())?;
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}
