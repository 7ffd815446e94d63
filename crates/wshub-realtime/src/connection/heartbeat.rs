//! Heartbeat supervisor: pings idle connections and closes dead ones.

use std::sync::Arc;

use bytes::Bytes;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::hub::HubInner;

use super::handle::CloseReason;
use super::transport::Frame;

/// Runs until `shutdown` is cancelled.
///
/// Every ping interval, connections idle longer than interval + timeout are
/// closed with [`CloseReason::HeartbeatTimeout`]; the rest receive a ping.
/// With the heartbeat disabled it only waits for shutdown.
pub(crate) async fn run_supervisor(inner: Arc<HubInner>, shutdown: CancellationToken) {
    let Some(period) = inner.config.ping_interval() else {
        inner.logger.debug("Heartbeat disabled");
        shutdown.cancelled().await;
        return;
    };

    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => sweep(&inner),
        }
    }

    inner.logger.debug("Heartbeat supervisor stopped");
}

fn sweep(inner: &HubInner) {
    let idle_limit = inner.config.idle_limit();

    for (client_id, handle) in inner.registry.snapshot() {
        if !handle.is_alive() {
            continue;
        }

        let idle = handle.idle_for();
        if idle > idle_limit {
            if handle.close(CloseReason::HeartbeatTimeout) {
                inner.metrics.heartbeat_timeout();
                inner.logger.warnf(format_args!(
                    "Client '{client_id}' heartbeat timeout (idle for {idle:?})"
                ));
            }
            continue;
        }

        if let Err(err) = handle.send(Frame::Ping(Bytes::new())) {
            inner
                .logger
                .debugf(format_args!("Ping to client '{client_id}' not queued: {err}"));
        }
    }
}
