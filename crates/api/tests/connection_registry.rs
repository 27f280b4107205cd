//! `ConnectionRegistry` behaviour, exercised through inboxes only.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use ctrack_api::ws::{spawn_heartbeat, ConnectionRegistry};

fn text(message: &Message) -> Option<&str> {
    match message {
        Message::Text(t) => Some(t.as_str()),
        _ => None,
    }
}

#[tokio::test]
async fn open_and_close_track_the_count() {
    let registry = ConnectionRegistry::new();
    assert!(registry.is_empty().await);

    let (id, _inbox) = registry.open(1).await;
    assert_eq!(registry.len().await, 1);

    assert!(registry.close(id).await);
    assert!(registry.is_empty().await);
    assert!(!registry.close(id).await, "second close is a no-op");
}

#[tokio::test]
async fn every_open_gets_a_distinct_id() {
    let registry = ConnectionRegistry::new();

    let (a, _ia) = registry.open(7).await;
    let (b, _ib) = registry.open(7).await;

    assert_ne!(a, b);
    assert_eq!(registry.len().await, 2);
}

#[tokio::test]
async fn connections_are_counted_per_user() {
    let registry = ConnectionRegistry::new();

    let _a = registry.open(7).await;
    let _b = registry.open(7).await;
    let _c = registry.open(8).await;

    assert_eq!(registry.count_for_user(7).await, 2);
    assert_eq!(registry.count_for_user(8).await, 1);
    assert_eq!(registry.count_for_user(9).await, 0);
}

#[tokio::test]
async fn push_reaches_every_connection() {
    let registry = ConnectionRegistry::new();
    let (_, mut first) = registry.open(1).await;
    let (_, mut second) = registry.open(2).await;

    let reached = registry.push(Message::Text("Dự án mới".into())).await;
    assert_eq!(reached, 2);

    for inbox in [&mut first, &mut second] {
        let message = inbox.recv().await.unwrap();
        assert_eq!(text(&message), Some("Dự án mới"));
    }
}

#[tokio::test]
async fn push_prunes_connections_whose_socket_is_gone() {
    let registry = ConnectionRegistry::new();
    let (_, gone) = registry.open(1).await;
    let (_, mut alive) = registry.open(2).await;
    drop(gone);

    let reached = registry.push(Message::Text("still here".into())).await;

    assert_eq!(reached, 1);
    assert_eq!(registry.len().await, 1);
    assert_eq!(text(&alive.recv().await.unwrap()), Some("still here"));
}

#[tokio::test]
async fn close_all_sends_close_and_empties() {
    let registry = ConnectionRegistry::new();
    let (_, mut first) = registry.open(1).await;
    let (_, mut second) = registry.open(2).await;

    assert_eq!(registry.close_all().await, 2);
    assert!(registry.is_empty().await);

    for inbox in [&mut first, &mut second] {
        let message = inbox.recv().await.unwrap();
        assert!(matches!(message, Message::Close(None)), "got: {message:?}");
        // The registry dropped the sender.
        assert!(inbox.recv().await.is_none());
    }
}

#[tokio::test]
async fn heartbeat_pings_open_connections() {
    let registry = Arc::new(ConnectionRegistry::new());
    let (_, mut inbox) = registry.open(1).await;

    let heartbeat = spawn_heartbeat(Arc::clone(&registry), Duration::from_millis(20));
    let message = tokio::time::timeout(Duration::from_secs(2), inbox.recv())
        .await
        .expect("timed out waiting for a ping")
        .unwrap();
    heartbeat.abort();

    assert!(matches!(message, Message::Ping(_)), "got: {message:?}");
}
