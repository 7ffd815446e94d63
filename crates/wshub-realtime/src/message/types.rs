//! Client and server message type definitions.

use serde::{Deserialize, Serialize};

use wshub_core::{ErrorKind, HubError, HubResult};

use crate::connection::transport::Frame;

/// Top-level kind of a client message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientMsgType {
    /// Fire-and-forget notification.
    Notify,
    /// Request expecting a `response` message.
    Request,
}

/// Kind of a client notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyType {
    /// Chat message.
    Chat,
    /// Control command.
    Control,
}

/// A chat line typed by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatNotify {
    /// Target channel.
    pub channel: String,
    /// Message body.
    pub message: String,
}

/// A control command initiated by the user (key press and similar).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlCommand {
    /// Command category.
    pub control_type: String,
    /// Command key.
    pub control_key: String,
}

/// A client message that expects no direct response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientNotify {
    /// Notification kind.
    pub notify_type: NotifyType,
    /// Present for chat notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat: Option<ChatNotify>,
    /// Present for control notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control: Option<ControlCommand>,
}

/// A client message that expects a `response`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRequest {
    /// Correlation id chosen by the client.
    pub request_id: String,
    /// Request kind.
    pub request_type: String,
    /// Free-form request body.
    #[serde(default)]
    pub request_body: serde_json::Value,
}

/// Envelope of every message sent by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientMsg {
    /// Message kind.
    pub msg_type: ClientMsgType,
    /// Present for requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<ClientRequest>,
    /// Present for notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify: Option<ClientNotify>,
}

/// A validated client message.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Chat notification.
    Chat(ChatNotify),
    /// Control notification.
    Control(ControlCommand),
    /// Request.
    Request(ClientRequest),
}

fn malformed(message: &str) -> HubError {
    HubError::new(ErrorKind::Serialization, message)
}

impl ClientMsg {
    /// Parses a text frame payload.
    pub fn parse(text: &str) -> HubResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Builds a chat notification.
    pub fn chat(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            msg_type: ClientMsgType::Notify,
            request: None,
            notify: Some(ClientNotify {
                notify_type: NotifyType::Chat,
                chat: Some(ChatNotify {
                    channel: channel.into(),
                    message: message.into(),
                }),
                control: None,
            }),
        }
    }

    /// Builds a control notification.
    pub fn control(control_type: impl Into<String>, control_key: impl Into<String>) -> Self {
        Self {
            msg_type: ClientMsgType::Notify,
            request: None,
            notify: Some(ClientNotify {
                notify_type: NotifyType::Control,
                chat: None,
                control: Some(ControlCommand {
                    control_type: control_type.into(),
                    control_key: control_key.into(),
                }),
            }),
        }
    }

    /// Builds a request.
    pub fn request(
        request_id: impl Into<String>,
        request_type: impl Into<String>,
        request_body: serde_json::Value,
    ) -> Self {
        Self {
            msg_type: ClientMsgType::Request,
            request: Some(ClientRequest {
                request_id: request_id.into(),
                request_type: request_type.into(),
                request_body,
            }),
            notify: None,
        }
    }

    /// Checks that the payload matching `msg_type` is present.
    pub fn into_event(self) -> HubResult<ClientEvent> {
        match self.msg_type {
            ClientMsgType::Request => self
                .request
                .map(ClientEvent::Request)
                .ok_or_else(|| malformed("request message without request payload")),
            ClientMsgType::Notify => {
                let notify = self
                    .notify
                    .ok_or_else(|| malformed("notify message without notify payload"))?;
                match notify.notify_type {
                    NotifyType::Chat => notify
                        .chat
                        .map(ClientEvent::Chat)
                        .ok_or_else(|| malformed("chat notify without chat payload")),
                    NotifyType::Control => notify
                        .control
                        .map(ClientEvent::Control)
                        .ok_or_else(|| malformed("control notify without control payload")),
                }
            }
        }
    }

    /// Serializes into a text frame.
    pub fn to_frame(&self) -> HubResult<Frame> {
        Ok(Frame::Text(serde_json::to_string(self)?))
    }
}

/// Top-level kind of a server message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerMsgType {
    /// Chat line relayed to clients.
    Chat,
    /// World/state update.
    Update,
    /// Response to a client request.
    Response,
}

/// A chat line as relayed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Channel name.
    pub channel: String,
    /// Sender.
    pub username: String,
    /// Message body.
    pub message: String,
}

/// Response to a [`ClientRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerResponse {
    /// Correlation id copied from the request.
    pub request_id: String,
    /// Response body.
    #[serde(default)]
    pub response_body: serde_json::Value,
    /// Set when the request failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Envelope of every message sent to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerMsg {
    /// Message kind.
    pub msg_type: ServerMsgType,
    /// Present for chat messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat: Option<ChatMessage>,
    /// Present for updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world_update: Option<serde_json::Value>,
    /// Present for responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ServerResponse>,
}

impl ServerMsg {
    fn empty(msg_type: ServerMsgType) -> Self {
        Self {
            msg_type,
            chat: None,
            world_update: None,
            response: None,
        }
    }

    /// Builds a chat message.
    pub fn chat(
        channel: impl Into<String>,
        username: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            chat: Some(ChatMessage {
                channel: channel.into(),
                username: username.into(),
                message: message.into(),
            }),
            ..Self::empty(ServerMsgType::Chat)
        }
    }

    /// Builds a world update.
    pub fn update(world_update: serde_json::Value) -> Self {
        Self {
            world_update: Some(world_update),
            ..Self::empty(ServerMsgType::Update)
        }
    }

    /// Builds a successful response.
    pub fn response(request_id: impl Into<String>, response_body: serde_json::Value) -> Self {
        Self {
            response: Some(ServerResponse {
                request_id: request_id.into(),
                response_body,
                error: None,
            }),
            ..Self::empty(ServerMsgType::Response)
        }
    }

    /// Builds a failed response.
    pub fn error_response(request_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            response: Some(ServerResponse {
                request_id: request_id.into(),
                response_body: serde_json::Value::Null,
                error: Some(error.into()),
            }),
            ..Self::empty(ServerMsgType::Response)
        }
    }

    /// Parses a text frame payload.
    pub fn parse(text: &str) -> HubResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serializes into a text frame.
    pub fn to_frame(&self) -> HubResult<Frame> {
        Ok(Frame::Text(serde_json::to_string(self)?))
    }
}
