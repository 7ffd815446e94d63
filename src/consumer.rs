//! Consumers for the hub's control and inbound channels.

use serde_json::json;
use tokio::sync::mpsc;

use wshub::message::{ClientEvent, ClientMsg, ServerMsg};
use wshub::{ControlNotify, Hub, InboundFrame, NotifyKind};
use wshub_core::HubResult;

/// Logs lifecycle events until every sender is gone.
pub async fn log_control_events(mut rx: mpsc::Receiver<ControlNotify>) {
    while let Some(event) = rx.recv().await {
        match event.kind {
            NotifyKind::Connected => tracing::info!(
                client_id = %event.client_id,
                connection_id = %event.connection_id,
                "Client connected"
            ),
            NotifyKind::Disconnected => tracing::info!(
                client_id = %event.client_id,
                connection_id = %event.connection_id,
                reason = ?event.reason,
                "Client disconnected"
            ),
            NotifyKind::Error => tracing::warn!(
                client_id = %event.client_id,
                connection_id = %event.connection_id,
                detail = event.detail.as_deref().unwrap_or_default(),
                "Client connection failed"
            ),
        }
    }
    tracing::debug!("Control channel closed");
}

/// Dispatches client messages: chat is rebroadcast, requests are answered.
pub async fn handle_client_messages(hub: Hub, mut rx: mpsc::Receiver<InboundFrame>) {
    while let Some(inbound) = rx.recv().await {
        if let Err(e) = dispatch(&hub, &inbound) {
            tracing::warn!(
                client_id = %inbound.client_id,
                error = %e,
                "Failed to handle client message"
            );
        }
    }
}

fn dispatch(hub: &Hub, inbound: &InboundFrame) -> HubResult<()> {
    let client_id = &inbound.client_id;
    let Some(text) = inbound.frame.as_text() else {
        tracing::debug!(client_id = %client_id, "Ignoring non-text frame");
        return Ok(());
    };

    match ClientMsg::parse(text)?.into_event()? {
        ClientEvent::Chat(chat) => {
            let frame =
                ServerMsg::chat(chat.channel, client_id.as_str(), chat.message).to_frame()?;
            let delivered = hub.broadcast(frame);
            tracing::debug!(client_id = %client_id, delivered, "Chat broadcast");
        }
        ClientEvent::Control(command) => {
            tracing::info!(
                client_id = %client_id,
                control_type = %command.control_type,
                control_key = %command.control_key,
                "Control command"
            );
        }
        ClientEvent::Request(request) => {
            let reply = match request.request_type.as_str() {
                "echo" => ServerMsg::response(request.request_id, request.request_body),
                "clients" => {
                    ServerMsg::response(request.request_id, json!(hub.registry().client_ids()))
                }
                other => ServerMsg::error_response(
                    request.request_id,
                    format!("unknown request type '{other}'"),
                ),
            };
            hub.send(client_id, reply.to_frame()?)?;
        }
    }
    Ok(())
}
