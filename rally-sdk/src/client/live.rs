//! WebSocket client for the live event feed.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use url::Url;

use super::ClientError;
use crate::objects::{WsClientMessage, WsServerMessage};
use crate::reconciler::RoomChanges;

/// An open connection to `GET /ws`.
pub struct LiveFeed {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl LiveFeed {
    /// Connect to the feed of the server rooted at `base_url`.
    ///
    /// `http`/`https` base URLs are mapped to `ws`/`wss`.
    pub async fn connect(base_url: &Url) -> Result<Self, ClientError> {
        let mut ws_url = base_url.join("/ws")?;
        let scheme = match ws_url.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        // Only fails for cannot-be-a-base URLs, which `join` never yields.
        let _ = ws_url.set_scheme(scheme);

        let (stream, _response) = connect_async(ws_url.as_str()).await?;
        Ok(Self { stream })
    }

    pub async fn send(&mut self, message: WsClientMessage) -> Result<(), ClientError> {
        let json = serde_json::to_string(&message)?;
        self.stream.send(Message::Text(json)).await?;
        Ok(())
    }

    /// Send the joins and leaves produced by the view.
    pub async fn apply_room_changes(&mut self, changes: RoomChanges) -> Result<(), ClientError> {
        for message in changes.into_messages() {
            self.send(message).await?;
        }
        Ok(())
    }

    /// Wait for the next server message.
    ///
    /// Non-text frames are skipped. Returns `None` once the server closes
    /// the connection.
    pub async fn next_message(&mut self) -> Option<Result<WsServerMessage, ClientError>> {
        loop {
            let frame = match self.stream.next().await? {
                Ok(frame) => frame,
                Err(e) => return Some(Err(e.into())),
            };
            match frame {
                Message::Text(text) => {
                    return Some(serde_json::from_str(&text).map_err(ClientError::Json));
                }
                Message::Close(_) => return None,
                _ => continue,
            }
        }
    }

    /// Send a close frame and wait for the connection to shut down.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.stream.close(None).await?;
        Ok(())
    }
}
