//! [`Transport`] for `tokio-tungstenite` streams.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use wshub_core::{ErrorKind, HubError, HubResult};

use super::transport::{Frame, Transport};

impl From<Frame> for Message {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Text(text) => Message::Text(text.into()),
            Frame::Binary(data) => Message::Binary(data),
            Frame::Ping(data) => Message::Ping(data),
            Frame::Pong(data) => Message::Pong(data),
            Frame::Close => Message::Close(None),
        }
    }
}

fn transport_error(action: &str, err: WsError) -> HubError {
    HubError::with_source(
        ErrorKind::Transport,
        format!("websocket {action} failed: {err}"),
        err,
    )
}

#[async_trait]
impl<S> Transport for WebSocketStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn recv(&mut self) -> Option<HubResult<Frame>> {
        loop {
            let message = match StreamExt::next(self).await? {
                Ok(message) => message,
                Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => return None,
                Err(err) => return Some(Err(transport_error("read", err))),
            };

            let frame = match message {
                Message::Text(text) => Frame::Text(text.as_str().to_owned()),
                Message::Binary(data) => Frame::Binary(data),
                Message::Ping(data) => Frame::Ping(data),
                Message::Pong(data) => Frame::Pong(data),
                Message::Close(_) => Frame::Close,
                // Raw frames only appear when writing; skip them on read.
                Message::Frame(_) => continue,
            };
            return Some(Ok(frame));
        }
    }

    async fn send(&mut self, frame: Frame) -> HubResult<()> {
        SinkExt::send(self, Message::from(frame))
            .await
            .map_err(|e| transport_error("write", e))
    }

    async fn close(&mut self) -> HubResult<()> {
        match WebSocketStream::close(self, None).await {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
            Err(err) => Err(transport_error("close", err)),
        }
    }
}
