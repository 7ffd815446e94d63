//! Integration tests for connection lifecycle notifications and shutdown.

mod helpers;

use std::collections::HashMap;
use std::time::Duration;

use helpers::{TestHub, mock_pair, test_config};
use wshub::{DisconnectReason, Frame, HubState, NotifyKind};
use wshub_core::ErrorKind;

#[tokio::test]
async fn test_peer_close_emits_connected_then_disconnected() {
    let mut t = TestHub::started(test_config());
    let (transport, peer) = mock_pair();

    let connection_id = t.hub.connect("alice", transport).await.unwrap();

    let connected = t.next_notify().await;
    assert_eq!(connected.kind, NotifyKind::Connected);
    assert_eq!(connected.client_id, "alice");
    assert_eq!(connected.connection_id, connection_id);

    peer.close();

    let disconnected = t.next_notify().await;
    assert_eq!(disconnected.kind, NotifyKind::Disconnected);
    assert_eq!(disconnected.reason, Some(DisconnectReason::PeerClosed));
    assert_eq!(disconnected.connection_id, connection_id);

    assert!(t.hub.registry().get("alice").is_none());
    assert_eq!(peer.close_count(), 1);
    t.assert_no_notify().await;
}

#[tokio::test]
async fn test_end_of_stream_counts_as_peer_close() {
    let mut t = TestHub::started(test_config());
    let (transport, peer) = mock_pair();

    t.hub.connect("alice", transport).await.unwrap();
    assert_eq!(t.next_notify().await.kind, NotifyKind::Connected);

    drop(peer);

    let notify = t.next_notify().await;
    assert_eq!(notify.kind, NotifyKind::Disconnected);
    assert_eq!(notify.reason, Some(DisconnectReason::PeerClosed));
}

#[tokio::test]
async fn test_transport_error_reports_error_and_unregisters() {
    let mut t = TestHub::started(test_config());
    let (transport, peer) = mock_pair();

    t.hub.connect("alice", transport).await.unwrap();
    assert_eq!(t.next_notify().await.kind, NotifyKind::Connected);

    peer.fail("connection reset by peer");

    let notify = t.next_notify().await;
    assert_eq!(notify.kind, NotifyKind::Error);
    assert_eq!(notify.client_id, "alice");
    assert!(
        notify
            .detail
            .as_deref()
            .is_some_and(|d| d.contains("connection reset by peer"))
    );
    assert!(!t.hub.registry().contains("alice"));
    assert_eq!(peer.close_count(), 1);

    let metrics = t.hub.metrics();
    assert_eq!(metrics.transport_errors, 1);
    assert_eq!(metrics.connections_active, 0);
    assert_eq!(t.logger.count("fatal"), 0);
}

#[tokio::test]
async fn test_server_disconnect_emits_closed() {
    let mut t = TestHub::started(test_config());
    let (transport, peer) = mock_pair();

    t.hub.connect("alice", transport).await.unwrap();
    t.next_notify().await;

    t.hub.disconnect("alice").unwrap();

    let notify = t.next_notify().await;
    assert_eq!(notify.kind, NotifyKind::Disconnected);
    assert_eq!(notify.reason, Some(DisconnectReason::Closed));
    assert_eq!(peer.close_count(), 1);

    let err = t.hub.disconnect("alice").unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_stop_closes_every_connection_and_waits() {
    let mut t = TestHub::started(test_config());
    let (transport_a, peer_a) = mock_pair();
    let (transport_b, peer_b) = mock_pair();

    t.hub.connect("a", transport_a).await.unwrap();
    t.hub.connect("b", transport_b).await.unwrap();
    assert_eq!(t.next_notify().await.kind, NotifyKind::Connected);
    assert_eq!(t.next_notify().await.kind, NotifyKind::Connected);

    t.hub.stop().await.unwrap();

    assert_eq!(t.hub.state(), HubState::Stopped);
    assert!(t.hub.registry().is_empty());
    assert_eq!(peer_a.close_count(), 1);
    assert_eq!(peer_b.close_count(), 1);

    // Both tasks have already emitted their final event when stop returns.
    let mut reasons = HashMap::new();
    while let Ok(notify) = t.control.try_recv() {
        reasons.insert(notify.client_id.clone(), notify.reason);
    }
    assert_eq!(reasons.len(), 2);
    assert_eq!(reasons["a"], Some(DisconnectReason::Shutdown));
    assert_eq!(reasons["b"], Some(DisconnectReason::Shutdown));
    assert_eq!(t.hub.metrics().connections_active, 0);
}

#[tokio::test]
async fn test_stop_twice_is_noop() {
    let mut t = TestHub::started(test_config());
    let (transport, peer) = mock_pair();
    t.hub.connect("alice", transport).await.unwrap();
    t.next_notify().await;

    t.hub.stop().await.unwrap();
    t.next_notify().await;
    t.hub.stop().await.unwrap();

    assert_eq!(t.hub.state(), HubState::Stopped);
    assert_eq!(peer.close_count(), 1);
    t.assert_no_notify().await;
}

#[tokio::test]
async fn test_connect_after_stop_is_refused() {
    let mut t = TestHub::started(test_config());
    t.hub.stop().await.unwrap();

    let (transport, peer) = mock_pair();
    let err = t.hub.connect("late", transport).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::ShuttingDown);
    assert_eq!(peer.close_count(), 1);
    assert!(t.hub.registry().is_empty());
    t.assert_no_notify().await;
}

#[tokio::test]
async fn test_connect_before_start_is_accepted() {
    let mut t = TestHub::new(test_config());
    let (transport, _peer) = mock_pair();

    t.hub.connect("early", transport).await.unwrap();
    assert_eq!(t.next_notify().await.kind, NotifyKind::Connected);
    assert_eq!(t.hub.state(), HubState::Created);

    t.hub.start().unwrap();
    assert_eq!(t.hub.state(), HubState::Started);
    assert!(t.hub.is_connected("early"));

    let err = t.hub.start().unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidState);
}

#[tokio::test]
async fn test_stop_without_start() {
    let mut t = TestHub::new(test_config());
    let (transport, peer) = mock_pair();
    t.hub.connect("early", transport).await.unwrap();
    t.next_notify().await;

    t.hub.stop().await.unwrap();

    assert_eq!(t.hub.state(), HubState::Stopped);
    assert_eq!(peer.close_count(), 1);
    assert_eq!(t.next_notify().await.reason, Some(DisconnectReason::Shutdown));

    let err = t.hub.start().unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidState);
}

#[tokio::test]
async fn test_full_control_channel_drops_without_stalling() {
    let config = wshub_core::config::HubConfig {
        control_buffer_size: 1,
        ..test_config()
    };
    let t = TestHub::started(config);
    let (transport, peer) = mock_pair();

    t.hub.connect("alice", transport).await.unwrap();
    let handle = t.hub.registry().get("alice").unwrap();

    // The Connected event fills the channel; Disconnected has nowhere to go.
    peer.close();
    tokio::time::timeout(Duration::from_secs(2), handle.closed())
        .await
        .expect("connection task finishes even though nobody drains events");

    assert_eq!(t.hub.dropped_notifications(), 1);
    assert_eq!(t.hub.metrics().notifications_dropped, 1);
    assert!(t.hub.registry().is_empty());
    assert_eq!(peer.close_count(), 1);
}

#[tokio::test]
async fn test_stop_waits_for_replacing_connect() {
    let mut t = TestHub::started(test_config());
    let (first, first_peer) = mock_pair();
    let first_id = t.hub.connect("alice", first).await.unwrap();
    assert_eq!(t.next_notify().await.kind, NotifyKind::Connected);

    // Park the first connection in a write so the replacement has to wait for it.
    first_peer.stall_writes();
    t.hub.send("alice", Frame::text("stuck")).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let (second, second_peer) = mock_pair();
    let hub = t.hub.clone();
    let pending = tokio::spawn(async move { hub.connect("alice", second).await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    t.hub.stop().await.unwrap();

    assert_eq!(t.hub.state(), HubState::Stopped);
    assert!(t.hub.registry().is_empty());
    assert_eq!(second_peer.close_count(), 1);

    let err = pending.await.unwrap().unwrap_err();
    assert_eq!(err.kind, ErrorKind::ShuttingDown);

    // Only the first connection's terminal event; the second never announced itself.
    let ended = t.control.try_recv().unwrap();
    assert_eq!(ended.connection_id, first_id);
    assert!(ended.is_terminal());
    assert!(t.control.try_recv().is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_connect_racing_stop_never_outlives_it() {
    for _ in 0..200 {
        let mut t = TestHub::started(test_config());
        let (transport, peer) = mock_pair();
        let hub = t.hub.clone();
        let pending = tokio::spawn(async move { hub.connect("alice", transport).await });

        t.hub.stop().await.unwrap();
        let closes_at_stop = peer.close_count();
        assert!(t.hub.registry().is_empty());

        match pending.await.unwrap() {
            Ok(connection_id) => {
                // Accepted before stop began, so it was also torn down by it.
                assert_eq!(closes_at_stop, 1);
                let connected = t.control.try_recv().unwrap();
                assert_eq!(connected.kind, NotifyKind::Connected);
                assert_eq!(connected.connection_id, connection_id);
                let ended = t.control.try_recv().unwrap();
                assert_eq!(ended.kind, NotifyKind::Disconnected);
                assert_eq!(ended.reason, Some(DisconnectReason::Shutdown));
            }
            Err(err) => {
                assert_eq!(err.kind, ErrorKind::ShuttingDown);
                assert!(t.control.try_recv().is_err());
            }
        }
    }
}
