//! The connection hub: registry, per-connection tasks, lifecycle events
//! and shutdown.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use wshub_core::config::HubConfig;
use wshub_core::{BasicLogger, HubError, HubResult, TracingLogger};

use crate::connection::handle::{CloseReason, ConnectionHandle, ConnectionId};
use crate::connection::heartbeat::run_supervisor;
use crate::connection::registry::ConnectionRegistry;
use crate::connection::task::run_connection;
use crate::connection::transport::{Frame, Transport};
use crate::metrics::{HubMetrics, MetricsSnapshot};
use crate::notify::{ControlNotifier, ControlNotify, InboundFrame};

/// Hub lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum HubState {
    /// Constructed; connections are accepted, the supervisor is not running.
    Created = 0,
    /// The supervisor is running.
    Started = 1,
    /// `stop` is closing connections.
    Stopping = 2,
    /// Every connection task has exited.
    Stopped = 3,
}

impl HubState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Started,
            2 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

impl fmt::Display for HubState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Started => write!(f, "started"),
            Self::Stopping => write!(f, "stopping"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// State shared between the hub, its connection tasks and the supervisor.
pub(crate) struct HubInner {
    pub(crate) config: HubConfig,
    pub(crate) registry: ConnectionRegistry,
    pub(crate) notifier: ControlNotifier,
    pub(crate) inbound: Option<mpsc::Sender<InboundFrame>>,
    pub(crate) logger: Arc<dyn BasicLogger>,
    pub(crate) metrics: HubMetrics,
    state: AtomicU8,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl HubInner {
    /// Emits a control notification, logging when it had to be dropped.
    pub(crate) fn notify(&self, notify: ControlNotify) {
        if let Err(dropped) = self.notifier.emit(notify) {
            self.logger.warnf(format_args!(
                "control channel full or closed, dropped {:?} event for client '{}' (total dropped: {})",
                dropped.kind,
                dropped.client_id,
                self.notifier.dropped()
            ));
        }
    }

    /// Forwards a data frame to the inbound consumer without waiting.
    pub(crate) fn forward_inbound(&self, handle: &ConnectionHandle, frame: Frame) {
        let Some(inbound) = &self.inbound else {
            return;
        };
        let message = InboundFrame {
            client_id: handle.client_id.clone(),
            connection_id: handle.id,
            frame,
        };
        if inbound.try_send(message).is_err() {
            self.metrics.inbound_dropped();
            self.logger.debugf(format_args!(
                "inbound channel full or closed, dropped frame from client '{}'",
                handle.client_id
            ));
        }
    }

    fn state(&self) -> HubState {
        HubState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn is_shutting_down(&self) -> bool {
        matches!(self.state(), HubState::Stopping | HubState::Stopped)
    }

    fn transition(&self, from: HubState, to: HubState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

/// Multiplexes named client connections and reports their lifecycle on a
/// control channel.
///
/// Cloning is cheap; all clones drive the same hub.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

impl fmt::Debug for Hub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hub")
            .field("state", &self.state())
            .field("connections", &self.inner.registry.len())
            .finish()
    }
}

impl Hub {
    /// Starts building a hub.
    pub fn builder(config: HubConfig) -> HubBuilder {
        HubBuilder::new(config)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> HubState {
        self.inner.state()
    }

    /// Starts the heartbeat supervisor. Valid only once, from `Created`.
    pub fn start(&self) -> HubResult<()> {
        if !self.inner.transition(HubState::Created, HubState::Started) {
            return Err(HubError::invalid_state(format!(
                "cannot start hub in state {}",
                self.state()
            )));
        }

        let inner = self.inner.clone();
        let shutdown = self.inner.shutdown.clone();
        self.inner.tracker.spawn(run_supervisor(inner, shutdown));

        self.inner.logger.infof(format_args!(
            "Hub started with {} pre-registered connection(s)",
            self.inner.registry.len()
        ));
        Ok(())
    }

    /// Registers a connection and spawns its task.
    ///
    /// Accepted before and after `start`. Fails with `InvalidId` for empty
    /// or malformed identifiers, `DuplicateId` under the reject policy and
    /// `ShuttingDown` once `stop` has begun; in those cases nothing is
    /// registered, no notification is emitted and the transport is closed.
    pub async fn connect<T: Transport>(
        &self,
        client_id: impl Into<String>,
        mut transport: T,
    ) -> HubResult<ConnectionId> {
        let client_id = client_id.into();
        // Counts as a tracked task, so `stop` waits for this call to finish.
        let _in_flight = self.inner.tracker.token();

        if let Err(err) = self.validate(&client_id) {
            self.refuse(&mut transport, &err).await;
            return Err(err);
        }

        let (handle, outbound) = ConnectionHandle::new(
            client_id.clone(),
            self.inner.config.outbound_buffer_size,
            self.inner.shutdown.child_token(),
        );

        let replaced = match self
            .inner
            .registry
            .add(handle.clone(), self.inner.config.duplicate_policy)
        {
            Ok(replaced) => replaced,
            Err(err) => {
                self.refuse(&mut transport, &err).await;
                return Err(err);
            }
        };

        if let Some(old) = replaced {
            self.inner.metrics.connection_replaced();
            self.inner.logger.infof(format_args!(
                "Client '{}' reconnected, replacing connection {}",
                client_id, old.id
            ));
            // The old task needs a write slot plus a close to finish.
            let wait = self
                .inner
                .config
                .close_timeout()
                .saturating_add(self.inner.config.write_timeout());
            if tokio::time::timeout(wait, old.closed()).await.is_err() {
                self.inner.logger.warnf(format_args!(
                    "Replaced connection {} of client '{}' did not finish within {:?}",
                    old.id, client_id, wait
                ));
            }
        }

        if self.inner.is_shutting_down() {
            self.inner.registry.remove_if_current(&client_id, handle.id);
            handle.mark_dead();
            let err = HubError::shutting_down("hub stopped during connect");
            self.refuse(&mut transport, &err).await;
            return Err(err);
        }

        self.inner.metrics.connection_opened();
        self.inner.notify(ControlNotify::connected(&client_id, handle.id));

        let connection_id = handle.id;
        self.inner.tracker.spawn(run_connection(
            self.inner.clone(),
            handle,
            transport,
            outbound,
        ));

        self.inner.logger.infof(format_args!(
            "Client '{}' connected (connection {})",
            client_id, connection_id
        ));
        Ok(connection_id)
    }

    /// Queues a frame for one client.
    pub fn send(&self, client_id: &str, frame: Frame) -> HubResult<()> {
        let handle = self
            .inner
            .registry
            .get(client_id)
            .ok_or_else(|| HubError::not_found(format!("client '{client_id}' is not connected")))?;
        handle.send(frame)
    }

    /// Queues a frame for every live client. Returns how many accepted it.
    pub fn broadcast(&self, frame: Frame) -> usize {
        let mut delivered = 0;
        for (client_id, handle) in self.inner.registry.snapshot() {
            match handle.send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(err) => self.inner.logger.debugf(format_args!(
                    "Broadcast skipped client '{client_id}': {err}"
                )),
            }
        }
        delivered
    }

    /// Closes one client's connection. Its task emits `Disconnected`.
    pub fn disconnect(&self, client_id: &str) -> HubResult<()> {
        let handle = self
            .inner
            .registry
            .get(client_id)
            .ok_or_else(|| HubError::not_found(format!("client '{client_id}' is not connected")))?;
        handle.close(CloseReason::Closed);
        Ok(())
    }

    /// Closes every connection and waits for all tasks to exit.
    ///
    /// Waits for `connect` calls already in flight as well; they either
    /// finish before this returns or fail with `ShuttingDown`. A second
    /// call, or a call while another `stop` is running, returns immediately.
    pub async fn stop(&self) -> HubResult<()> {
        let began = self.inner.transition(HubState::Started, HubState::Stopping)
            || self.inner.transition(HubState::Created, HubState::Stopping);
        if !began {
            return Ok(());
        }

        let open = self.inner.registry.len();
        self.inner
            .logger
            .infof(format_args!("Stopping hub, closing {open} connection(s)"));

        self.inner.shutdown.cancel();
        for (_, handle) in self.inner.registry.snapshot() {
            handle.close(CloseReason::Shutdown);
        }

        self.inner.tracker.close();
        let grace = self.inner.config.shutdown_grace();
        let timed_out = tokio::time::timeout(grace, self.inner.tracker.wait())
            .await
            .is_err();

        let leftover = self.inner.registry.drain();
        for handle in &leftover {
            handle.mark_dead();
        }

        self.inner
            .state
            .store(HubState::Stopped as u8, Ordering::SeqCst);

        if timed_out {
            let err = HubError::internal(format!(
                "{} connection task(s) still running after {:?}",
                self.inner.tracker.len(),
                grace
            ));
            self.inner.logger.errorf(format_args!("Hub stop incomplete: {err}"));
            return Err(err);
        }

        self.inner.logger.info("Hub stopped");
        Ok(())
    }

    /// The connection registry.
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.inner.registry
    }

    /// Checks if a client currently has a live connection.
    pub fn is_connected(&self, client_id: &str) -> bool {
        self.inner
            .registry
            .get(client_id)
            .is_some_and(|handle| handle.is_alive())
    }

    /// Returns the number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Number of control notifications dropped so far.
    pub fn dropped_notifications(&self) -> u64 {
        self.inner.notifier.dropped()
    }

    /// Current metrics.
    pub fn metrics(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            notifications_emitted: self.inner.notifier.emitted(),
            notifications_dropped: self.inner.notifier.dropped(),
            ..self.inner.metrics.snapshot()
        }
    }

    fn validate(&self, client_id: &str) -> HubResult<()> {
        if client_id.is_empty() {
            return Err(HubError::invalid_id("client id must not be empty"));
        }
        if client_id.len() > self.inner.config.max_id_length {
            return Err(HubError::invalid_id(format!(
                "client id is {} bytes, limit is {}",
                client_id.len(),
                self.inner.config.max_id_length
            )));
        }
        if client_id.chars().any(char::is_control) {
            return Err(HubError::invalid_id("client id contains control characters"));
        }
        if self.inner.is_shutting_down() {
            return Err(HubError::shutting_down("hub is not accepting connections"));
        }
        Ok(())
    }

    async fn refuse<T: Transport>(&self, transport: &mut T, err: &HubError) {
        self.inner.metrics.connection_rejected();
        self.inner
            .logger
            .warnf(format_args!("Refused connection: {err}"));
        match tokio::time::timeout(self.inner.config.close_timeout(), transport.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(close_err)) => self
                .inner
                .logger
                .debugf(format_args!("Closing refused transport failed: {close_err}")),
            Err(_) => self
                .inner
                .logger
                .debug("Closing refused transport timed out"),
        }
    }
}

/// Builds a [`Hub`].
pub struct HubBuilder {
    config: HubConfig,
    control: Option<mpsc::Sender<ControlNotify>>,
    inbound: Option<mpsc::Sender<InboundFrame>>,
    logger: Option<Arc<dyn BasicLogger>>,
}

impl HubBuilder {
    fn new(config: HubConfig) -> Self {
        Self {
            config,
            control: None,
            inbound: None,
            logger: None,
        }
    }

    /// Channel receiving lifecycle events. Required.
    pub fn control(mut self, tx: mpsc::Sender<ControlNotify>) -> Self {
        self.control = Some(tx);
        self
    }

    /// Channel receiving client data frames. Optional; without it inbound
    /// frames are discarded after updating activity.
    pub fn inbound(mut self, tx: mpsc::Sender<InboundFrame>) -> Self {
        self.inbound = Some(tx);
        self
    }

    /// Diagnostic sink. Defaults to [`TracingLogger`].
    pub fn logger(mut self, logger: Arc<dyn BasicLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Validates the configuration and creates the hub in `Created` state.
    pub fn build(self) -> HubResult<Hub> {
        self.config.validate()?;
        let control = self
            .control
            .ok_or_else(|| HubError::configuration("a control channel is required"))?;
        let logger = self
            .logger
            .unwrap_or_else(|| Arc::new(TracingLogger::default()) as Arc<dyn BasicLogger>);

        let inner = HubInner {
            config: self.config,
            registry: ConnectionRegistry::new(),
            notifier: ControlNotifier::new(control),
            inbound: self.inbound,
            logger,
            metrics: HubMetrics::new(),
            state: AtomicU8::new(HubState::Created as u8),
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
        };

        Ok(Hub {
            inner: Arc::new(inner),
        })
    }
}
