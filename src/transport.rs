//! [`Transport`] adapter for axum's upgraded WebSocket.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};

use wshub::{Frame, Transport};
use wshub_core::{ErrorKind, HubError, HubResult};

/// Hands an upgraded axum socket to the hub.
pub struct AxumTransport {
    socket: WebSocket,
}

impl AxumTransport {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

fn to_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text.into()),
        Frame::Binary(data) => Message::Binary(data),
        Frame::Ping(data) => Message::Ping(data),
        Frame::Pong(data) => Message::Pong(data),
        Frame::Close => Message::Close(None),
    }
}

fn transport_error(action: &str, err: axum::Error) -> HubError {
    HubError::with_source(
        ErrorKind::Transport,
        format!("websocket {action} failed: {err}"),
        err,
    )
}

#[async_trait]
impl Transport for AxumTransport {
    async fn recv(&mut self) -> Option<HubResult<Frame>> {
        let message = match self.socket.recv().await? {
            Ok(message) => message,
            Err(err) => return Some(Err(transport_error("read", err))),
        };
        Some(Ok(match message {
            Message::Text(text) => Frame::Text(text.as_str().to_owned()),
            Message::Binary(data) => Frame::Binary(data),
            Message::Ping(data) => Frame::Ping(data),
            Message::Pong(data) => Frame::Pong(data),
            Message::Close(_) => Frame::Close,
        }))
    }

    async fn send(&mut self, frame: Frame) -> HubResult<()> {
        self.socket
            .send(to_message(frame))
            .await
            .map_err(|e| transport_error("write", e))
    }

    async fn close(&mut self) -> HubResult<()> {
        self.socket
            .send(Message::Close(None))
            .await
            .map_err(|e| transport_error("close", e))
    }
}
