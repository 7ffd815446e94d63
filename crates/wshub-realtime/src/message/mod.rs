//! JSON messages exchanged with the browser client.
//!
//! The hub itself is protocol-agnostic; these types are for callers that
//! speak the client's `ClientMsg`/`ServerMsg` format over text frames.

pub mod types;

pub use types::{
    ChatMessage, ChatNotify, ClientEvent, ClientMsg, ClientNotify, ClientRequest, ControlCommand,
    ServerMsg, ServerResponse,
};
