//! Shared test helpers for hub integration tests.

#![allow(dead_code)]

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use wshub::{ControlNotify, Frame, Hub, InboundFrame, Transport};
use wshub_core::config::HubConfig;
use wshub_core::{BasicLogger, HubError, HubResult};

/// In-memory transport owned by the hub.
pub struct MockTransport {
    incoming: mpsc::UnboundedReceiver<HubResult<Frame>>,
    written: mpsc::UnboundedSender<Frame>,
    state: Arc<PeerState>,
}

#[derive(Default)]
struct PeerState {
    closes: AtomicUsize,
    stall_writes: AtomicBool,
}

/// Test-side end of a [`MockTransport`].
pub struct MockPeer {
    incoming: mpsc::UnboundedSender<HubResult<Frame>>,
    written: mpsc::UnboundedReceiver<Frame>,
    state: Arc<PeerState>,
}

/// Creates a connected transport/peer pair.
pub fn mock_pair() -> (MockTransport, MockPeer) {
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let state = Arc::new(PeerState::default());
    (
        MockTransport {
            incoming: in_rx,
            written: out_tx,
            state: state.clone(),
        },
        MockPeer {
            incoming: in_tx,
            written: out_rx,
            state,
        },
    )
}

#[async_trait]
impl Transport for MockTransport {
    async fn recv(&mut self) -> Option<HubResult<Frame>> {
        self.incoming.recv().await
    }

    async fn send(&mut self, frame: Frame) -> HubResult<()> {
        if self.state.stall_writes.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.written
            .send(frame)
            .map_err(|_| HubError::transport("peer went away"))
    }

    async fn close(&mut self) -> HubResult<()> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl MockPeer {
    /// Sends a text frame to the hub.
    pub fn send_text(&self, text: &str) {
        let _ = self.incoming.send(Ok(Frame::text(text)));
    }

    /// Sends a close frame to the hub.
    pub fn close(&self) {
        let _ = self.incoming.send(Ok(Frame::Close));
    }

    /// Makes the hub's next read fail.
    pub fn fail(&self, message: &str) {
        let _ = self.incoming.send(Err(HubError::transport(message)));
    }

    /// Makes every write block forever.
    pub fn stall_writes(&self) {
        self.state.stall_writes.store(true, Ordering::SeqCst);
    }

    /// How many times the hub closed the transport.
    pub fn close_count(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    /// A frame already written by the hub, if any.
    pub fn try_written(&mut self) -> Option<Frame> {
        self.written.try_recv().ok()
    }

    /// Next frame written by the hub, skipping pings.
    pub async fn next_written(&mut self) -> Frame {
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(2), self.written.recv())
                .await
                .expect("timed out waiting for a written frame")
                .expect("transport dropped");
            if !matches!(frame, Frame::Ping(_)) {
                return frame;
            }
        }
    }
}

/// Logger that records every line.
#[derive(Default)]
pub struct RecordingLogger {
    lines: Mutex<Vec<(&'static str, String)>>,
}

impl RecordingLogger {
    fn push(&self, level: &'static str, args: fmt::Arguments<'_>) {
        self.lines
            .lock()
            .expect("logger lock")
            .push((level, args.to_string()));
    }

    /// Number of lines recorded at `level`.
    pub fn count(&self, level: &str) -> usize {
        self.lines
            .lock()
            .expect("logger lock")
            .iter()
            .filter(|(l, _)| *l == level)
            .count()
    }
}

impl BasicLogger for RecordingLogger {
    fn debugf(&self, args: fmt::Arguments<'_>) {
        self.push("debug", args);
    }
    fn infof(&self, args: fmt::Arguments<'_>) {
        self.push("info", args);
    }
    fn warnf(&self, args: fmt::Arguments<'_>) {
        self.push("warn", args);
    }
    fn errorf(&self, args: fmt::Arguments<'_>) {
        self.push("error", args);
    }
    fn fatalf(&self, args: fmt::Arguments<'_>) {
        self.push("fatal", args);
    }
}

/// Hub configuration with the heartbeat off and short timeouts.
pub fn test_config() -> HubConfig {
    HubConfig {
        ping_interval_seconds: 0,
        write_timeout_ms: 200,
        close_timeout_ms: 200,
        shutdown_grace_seconds: 5,
        ..HubConfig::default()
    }
}

/// A hub wired to fresh control/inbound channels and a recording logger.
pub struct TestHub {
    pub hub: Hub,
    pub control: mpsc::Receiver<ControlNotify>,
    pub inbound: mpsc::Receiver<InboundFrame>,
    pub logger: Arc<RecordingLogger>,
}

impl TestHub {
    pub fn new(config: HubConfig) -> Self {
        let (control_tx, control) = mpsc::channel(config.control_buffer_size);
        let (inbound_tx, inbound) = mpsc::channel(config.inbound_buffer_size);
        let logger = Arc::new(RecordingLogger::default());
        let hub = Hub::builder(config)
            .control(control_tx)
            .inbound(inbound_tx)
            .logger(logger.clone())
            .build()
            .expect("valid hub config");
        Self {
            hub,
            control,
            inbound,
            logger,
        }
    }

    pub fn started(config: HubConfig) -> Self {
        let test_hub = Self::new(config);
        test_hub.hub.start().expect("hub starts");
        test_hub
    }

    /// Next control notification, failing after two seconds.
    pub async fn next_notify(&mut self) -> ControlNotify {
        self.next_notify_within(Duration::from_secs(2)).await
    }

    pub async fn next_notify_within(&mut self, limit: Duration) -> ControlNotify {
        tokio::time::timeout(limit, self.control.recv())
            .await
            .expect("timed out waiting for a control notification")
            .expect("control channel closed")
    }

    /// Asserts no notification arrives within a short window.
    pub async fn assert_no_notify(&mut self) {
        let next = tokio::time::timeout(Duration::from_millis(100), self.control.recv()).await;
        assert!(next.is_err(), "unexpected notification: {next:?}");
    }

    pub async fn next_inbound(&mut self) -> InboundFrame {
        tokio::time::timeout(Duration::from_secs(2), self.inbound.recv())
            .await
            .expect("timed out waiting for an inbound frame")
            .expect("inbound channel closed")
    }
}
