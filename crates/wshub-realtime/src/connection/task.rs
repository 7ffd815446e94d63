//! Per-connection task: reads, writes and finally closes one transport.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time;

use crate::hub::HubInner;
use crate::notify::{ControlNotify, DisconnectReason};

use super::handle::{CloseReason, ConnectionHandle};
use super::transport::{Frame, Transport};

/// How the read/write loop ended.
enum Exit {
    PeerClosed,
    Cancelled,
    Failed(String),
}

/// Runs one connection until the peer leaves, the transport fails or the
/// hub cancels it.
///
/// On every exit path the transport is closed once, the handle is marked
/// dead, the connection's own registry entry is removed and exactly one
/// terminal notification is emitted, in that order.
pub(crate) async fn run_connection<T: Transport>(
    inner: Arc<HubInner>,
    handle: Arc<ConnectionHandle>,
    mut transport: T,
    mut outbound: mpsc::Receiver<Frame>,
) {
    let write_timeout = inner.config.write_timeout();

    let exit = loop {
        tokio::select! {
            biased;

            _ = handle.cancelled() => break Exit::Cancelled,

            incoming = transport.recv() => match incoming {
                None | Some(Ok(Frame::Close)) => break Exit::PeerClosed,
                Some(Ok(frame)) => {
                    handle.touch();
                    if frame.is_data() {
                        inner.metrics.frame_received();
                        inner.forward_inbound(&handle, frame);
                    }
                }
                Some(Err(err)) => break Exit::Failed(err.to_string()),
            },

            Some(frame) = outbound.recv() => {
                match time::timeout(write_timeout, transport.send(frame)).await {
                    Ok(Ok(())) => inner.metrics.frame_sent(),
                    Ok(Err(err)) => break Exit::Failed(err.to_string()),
                    Err(_) => break Exit::Failed(format!("write timed out after {write_timeout:?}")),
                }
            }
        }
    };

    match time::timeout(inner.config.close_timeout(), transport.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => inner.logger.debugf(format_args!(
            "Closing transport of client '{}' failed: {}",
            handle.client_id, err
        )),
        Err(_) => inner.logger.warnf(format_args!(
            "Closing transport of client '{}' timed out",
            handle.client_id
        )),
    }
    drop(transport);
    outbound.close();

    handle.mark_dead();
    inner
        .registry
        .remove_if_current(&handle.client_id, handle.id);

    let notify = match exit {
        Exit::PeerClosed => {
            inner.logger.infof(format_args!(
                "Client '{}' disconnected (connection {})",
                handle.client_id, handle.id
            ));
            ControlNotify::disconnected(&handle.client_id, handle.id, DisconnectReason::PeerClosed)
        }
        Exit::Failed(detail) => {
            inner.metrics.transport_error();
            inner.logger.warnf(format_args!(
                "Connection {} of client '{}' failed: {}",
                handle.id, handle.client_id, detail
            ));
            ControlNotify::error(&handle.client_id, handle.id, detail)
        }
        Exit::Cancelled => {
            let reason = match handle.close_reason() {
                Some(CloseReason::HeartbeatTimeout) => None,
                Some(CloseReason::Closed) => Some(DisconnectReason::Closed),
                Some(CloseReason::Replaced) => Some(DisconnectReason::Replaced),
                Some(CloseReason::Shutdown) | None => Some(DisconnectReason::Shutdown),
            };
            inner.logger.debugf(format_args!(
                "Connection {} of client '{}' closed by hub ({:?})",
                handle.id,
                handle.client_id,
                handle.close_reason()
            ));
            match reason {
                Some(reason) => ControlNotify::disconnected(&handle.client_id, handle.id, reason),
                None => ControlNotify::error(&handle.client_id, handle.id, "heartbeat timeout"),
            }
        }
    };

    inner.metrics.connection_closed();
    inner.notify(notify);
    handle.mark_finished();
}
