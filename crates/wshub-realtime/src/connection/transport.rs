//! Transport seam between the hub and an established WebSocket.

use async_trait::async_trait;
use bytes::Bytes;

use wshub_core::HubResult;

/// A single WebSocket frame as seen by the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text payload.
    Text(String),
    /// Binary payload.
    Binary(Bytes),
    /// Ping control frame.
    Ping(Bytes),
    /// Pong control frame.
    Pong(Bytes),
    /// Close control frame.
    Close,
}

impl Frame {
    /// Creates a text frame.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Returns `true` for text and binary frames.
    pub fn is_data(&self) -> bool {
        matches!(self, Self::Text(_) | Self::Binary(_))
    }

    /// Returns the text payload, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// An established bidirectional connection to one peer.
///
/// The hub hands each transport to exactly one connection task, which owns
/// it until it calls [`Transport::close`] once and drops it.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Receives the next frame. `None` means the stream ended.
    ///
    /// Must be cancel-safe: the connection task races it against
    /// cancellation and the outbound queue.
    async fn recv(&mut self) -> Option<HubResult<Frame>>;

    /// Writes one frame.
    async fn send(&mut self, frame: Frame) -> HubResult<()>;

    /// Closes the connection.
    async fn close(&mut self) -> HubResult<()>;
}
