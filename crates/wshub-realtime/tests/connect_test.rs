//! Integration tests for `connect` validation and duplicate handling.

mod helpers;

use futures::future::join_all;

use helpers::{TestHub, mock_pair, test_config};
use wshub::{DisconnectReason, NotifyKind};
use wshub_core::ErrorKind;
use wshub_core::config::{DuplicatePolicy, HubConfig};

#[tokio::test]
async fn test_empty_id_registers_nothing() {
    let mut t = TestHub::started(test_config());
    let (transport, peer) = mock_pair();

    let err = t.hub.connect("", transport).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::InvalidId);
    assert!(t.hub.registry().is_empty());
    assert_eq!(peer.close_count(), 1);
    t.assert_no_notify().await;
    assert_eq!(t.hub.metrics().connections_rejected, 1);
}

#[tokio::test]
async fn test_malformed_ids_are_rejected() {
    let config = HubConfig {
        max_id_length: 8,
        ..test_config()
    };
    let mut t = TestHub::started(config);

    for bad in ["line\nbreak", "way-too-long-id"] {
        let (transport, _peer) = mock_pair();
        let err = t.hub.connect(bad, transport).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidId, "id {bad:?}");
    }

    assert!(t.hub.registry().is_empty());
    t.assert_no_notify().await;
}

#[tokio::test]
async fn test_concurrent_connects_with_distinct_ids() {
    let mut t = TestHub::started(test_config());
    let (transports, peers): (Vec<_>, Vec<_>) = (0..20).map(|_| mock_pair()).unzip();

    let results = join_all(
        transports
            .into_iter()
            .enumerate()
            .map(|(i, transport)| {
                let hub = t.hub.clone();
                async move { hub.connect(format!("client-{i}"), transport).await }
            }),
    )
    .await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(t.hub.connection_count(), 20);
    for i in 0..20 {
        let id = format!("client-{i}");
        let handle = t.hub.registry().get(&id).expect("registered");
        assert_eq!(handle.client_id, id);
    }
    for _ in 0..20 {
        assert_eq!(t.next_notify().await.kind, NotifyKind::Connected);
    }
    drop(peers);
}

#[tokio::test]
async fn test_duplicate_id_replaces_old_connection() {
    let mut t = TestHub::started(test_config());
    let (first_transport, first_peer) = mock_pair();
    let (second_transport, second_peer) = mock_pair();

    let first = t.hub.connect("alice", first_transport).await.unwrap();
    let second = t.hub.connect("alice", second_transport).await.unwrap();
    assert_ne!(first, second);

    let n1 = t.next_notify().await;
    assert_eq!((n1.kind, n1.connection_id), (NotifyKind::Connected, first));

    // The evicted connection finishes before the replacement is announced.
    let n2 = t.next_notify().await;
    assert_eq!((n2.kind, n2.connection_id), (NotifyKind::Disconnected, first));
    assert_eq!(n2.reason, Some(DisconnectReason::Replaced));

    let n3 = t.next_notify().await;
    assert_eq!((n3.kind, n3.connection_id), (NotifyKind::Connected, second));

    assert_eq!(first_peer.close_count(), 1);
    assert_eq!(second_peer.close_count(), 0);
    assert_eq!(t.hub.registry().get("alice").map(|h| h.id), Some(second));
    assert_eq!(t.hub.connection_count(), 1);
    assert_eq!(t.hub.metrics().connections_replaced, 1);

    // A late close on the evicted peer does not touch the replacement.
    first_peer.close();
    t.assert_no_notify().await;
    assert!(t.hub.is_connected("alice"));
}

#[tokio::test]
async fn test_duplicate_id_rejected_under_reject_policy() {
    let config = HubConfig {
        duplicate_policy: DuplicatePolicy::Reject,
        ..test_config()
    };
    let mut t = TestHub::started(config);
    let (first_transport, first_peer) = mock_pair();
    let (second_transport, second_peer) = mock_pair();

    let first = t.hub.connect("alice", first_transport).await.unwrap();
    t.next_notify().await;

    let err = t.hub.connect("alice", second_transport).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::DuplicateId);
    assert_eq!(second_peer.close_count(), 1);
    assert_eq!(first_peer.close_count(), 0);
    assert_eq!(t.hub.registry().get("alice").map(|h| h.id), Some(first));
    t.assert_no_notify().await;
}

#[tokio::test]
async fn test_reconnect_after_disconnect_gets_fresh_connection() {
    let mut t = TestHub::started(test_config());
    let (transport, peer) = mock_pair();
    let first = t.hub.connect("alice", transport).await.unwrap();
    t.next_notify().await;
    peer.close();
    assert_eq!(t.next_notify().await.kind, NotifyKind::Disconnected);

    let (transport, _peer) = mock_pair();
    let second = t.hub.connect("alice", transport).await.unwrap();

    assert_ne!(first, second);
    let notify = t.next_notify().await;
    assert_eq!((notify.kind, notify.connection_id), (NotifyKind::Connected, second));
}
