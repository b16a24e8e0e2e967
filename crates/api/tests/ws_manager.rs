//! Unit tests for `WsManager`.
//!
//! These tests exercise the connection registry directly, without any
//! HTTP upgrades. They verify register/unregister semantics, the user
//! index, room purging on disconnect, targeted delivery, liveness
//! pruning, and graceful shutdown behaviour.

use std::collections::HashSet;

use axum::extract::ws::Message;
use coursehub_api::ws::WsManager;

// ---------------------------------------------------------------------------
// Test: new manager starts with zero connections
// ---------------------------------------------------------------------------

#[tokio::test]
async fn new_manager_has_zero_connections() {
    let manager = WsManager::new();

    assert_eq!(manager.connection_count().await, 0);
    assert_eq!(manager.room_count().await, 0);
}

// ---------------------------------------------------------------------------
// Test: register() increments the connection count
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_increments_connection_count() {
    let manager = WsManager::new();

    let _rx = manager.register("conn-1".to_string(), 7).await;

    assert_eq!(manager.connection_count().await, 1);
}

// ---------------------------------------------------------------------------
// Test: unregister() decrements the connection count
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unregister_decrements_connection_count() {
    let manager = WsManager::new();

    let _rx = manager.register("conn-1".to_string(), 7).await;
    assert_eq!(manager.connection_count().await, 1);

    manager.unregister("conn-1").await;
    assert_eq!(manager.connection_count().await, 0);
}

// ---------------------------------------------------------------------------
// Test: unregister() with unknown ID is a no-op
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unregister_unknown_id_is_noop() {
    let manager = WsManager::new();

    let _rx = manager.register("conn-1".to_string(), 7).await;
    manager.unregister("nonexistent").await;

    assert_eq!(manager.connection_count().await, 1);
}

// ---------------------------------------------------------------------------
// Test: unregister() purges the connection from every room
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unregister_purges_room_membership() {
    let manager = WsManager::new();

    let _rx1 = manager.register("conn-1".to_string(), 7).await;
    let _rx2 = manager.register("conn-2".to_string(), 8).await;

    assert!(manager.join("conn-1", 1).await);
    assert!(manager.join("conn-1", 2).await);
    assert!(manager.join("conn-2", 2).await);

    manager.unregister("conn-1").await;

    assert!(manager.members_of(1).await.is_empty());
    assert_eq!(
        manager.members_of(2).await,
        HashSet::from(["conn-2".to_string()])
    );
    // Room 1 emptied out and was garbage-collected.
    assert_eq!(manager.room_count().await, 1);
}

// ---------------------------------------------------------------------------
// Test: the user index tracks multi-tab connections
// ---------------------------------------------------------------------------

#[tokio::test]
async fn connections_for_tracks_multiple_tabs() {
    let manager = WsManager::new();

    let _rx1 = manager.register("tab-1".to_string(), 7).await;
    let _rx2 = manager.register("tab-2".to_string(), 7).await;
    let _rx3 = manager.register("other".to_string(), 8).await;

    assert_eq!(
        manager.connections_for(7).await,
        HashSet::from(["tab-1".to_string(), "tab-2".to_string()])
    );

    manager.unregister("tab-1").await;
    assert_eq!(
        manager.connections_for(7).await,
        HashSet::from(["tab-2".to_string()])
    );

    // The user goes fully offline with the last connection.
    manager.unregister("tab-2").await;
    assert!(manager.connections_for(7).await.is_empty());
}

// ---------------------------------------------------------------------------
// Test: join() requires a registered connection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn join_requires_registered_connection() {
    let manager = WsManager::new();

    assert!(!manager.join("ghost", 1).await);
    assert!(manager.members_of(1).await.is_empty());
}

// ---------------------------------------------------------------------------
// Test: joining the same room twice is idempotent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn join_twice_equals_join_once() {
    let manager = WsManager::new();

    let _rx = manager.register("conn-1".to_string(), 7).await;
    assert!(manager.join("conn-1", 42).await);
    assert!(manager.join("conn-1", 42).await);

    assert_eq!(manager.members_of(42).await.len(), 1);
}

// ---------------------------------------------------------------------------
// Test: send_to_user() reaches every tab of that user, nobody else
// ---------------------------------------------------------------------------

#[tokio::test]
async fn send_to_user_reaches_all_tabs() {
    let manager = WsManager::new();

    let mut rx1 = manager.register("tab-1".to_string(), 7).await;
    let mut rx2 = manager.register("tab-2".to_string(), 7).await;
    let mut rx3 = manager.register("other".to_string(), 8).await;

    let sent = manager
        .send_to_user(7, Message::Text("hello".into()))
        .await;
    assert_eq!(sent, 2);

    assert!(matches!(rx1.recv().await, Some(Message::Text(t)) if *t == *"hello"));
    assert!(matches!(rx2.recv().await, Some(Message::Text(t)) if *t == *"hello"));
    assert!(
        rx3.try_recv().is_err(),
        "user 8 must not receive user 7's message"
    );
}

// ---------------------------------------------------------------------------
// Test: send_to_connections() delivers at most once per listed id
// ---------------------------------------------------------------------------

#[tokio::test]
async fn send_to_connections_delivers_once_each() {
    let manager = WsManager::new();

    let mut rx1 = manager.register("conn-1".to_string(), 7).await;
    let _rx2 = manager.register("conn-2".to_string(), 8).await;

    let targets = HashSet::from(["conn-1".to_string(), "unknown".to_string()]);
    let sent = manager
        .send_to_connections(&targets, Message::Text("ping".into()))
        .await;
    assert_eq!(sent, 1);

    assert!(matches!(rx1.recv().await, Some(Message::Text(t)) if *t == *"ping"));
    assert!(rx1.try_recv().is_err(), "exactly one frame expected");
}

// ---------------------------------------------------------------------------
// Test: closed channels are skipped silently
// ---------------------------------------------------------------------------

#[tokio::test]
async fn closed_channels_are_skipped() {
    let manager = WsManager::new();

    let rx1 = manager.register("conn-1".to_string(), 7).await;
    let mut rx2 = manager.register("conn-2".to_string(), 7).await;

    // Drop rx1 to close its channel.
    drop(rx1);

    let sent = manager
        .send_to_user(7, Message::Text("still alive".into()))
        .await;
    assert_eq!(sent, 1);

    let msg = rx2.recv().await.expect("rx2 should receive the message");
    assert!(matches!(&msg, Message::Text(t) if *t == "still alive"));
}

// ---------------------------------------------------------------------------
// Test: re-registering an id replaces the previous connection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_id_replaces_previous_connection() {
    let manager = WsManager::new();

    let _rx_old = manager.register("conn-1".to_string(), 7).await;
    assert!(manager.join("conn-1", 5).await);
    assert_eq!(manager.connection_count().await, 1);

    // Re-register with the same ID -- replaces, and resets memberships.
    let mut rx_new = manager.register("conn-1".to_string(), 7).await;
    assert_eq!(manager.connection_count().await, 1);
    assert!(manager.members_of(5).await.is_empty());

    let sent = manager
        .send_to_user(7, Message::Text("replaced".into()))
        .await;
    assert_eq!(sent, 1);
    let msg = rx_new.recv().await.expect("new rx should receive");
    assert!(matches!(&msg, Message::Text(t) if *t == "replaced"));
}

// ---------------------------------------------------------------------------
// Test: prune_stale() drops idle connections only
// ---------------------------------------------------------------------------

#[tokio::test]
async fn prune_stale_drops_idle_connections() {
    let manager = WsManager::new();

    let _rx1 = manager.register("idle".to_string(), 7).await;
    let _rx2 = manager.register("live".to_string(), 8).await;
    assert!(manager.join("idle", 1).await);

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    manager.touch("live").await;

    let pruned = manager.prune_stale(chrono::Duration::milliseconds(25)).await;
    assert_eq!(pruned, 1);

    assert_eq!(manager.connection_count().await, 1);
    assert!(manager.connections_for(7).await.is_empty());
    // The pruned connection left its rooms too.
    assert!(manager.members_of(1).await.is_empty());
}

// ---------------------------------------------------------------------------
// Test: shutdown_all() sends Close and clears all state
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shutdown_all_sends_close_and_clears() {
    let manager = WsManager::new();

    let mut rx1 = manager.register("conn-1".to_string(), 7).await;
    let mut rx2 = manager.register("conn-2".to_string(), 8).await;
    assert!(manager.join("conn-1", 42).await);
    assert_eq!(manager.connection_count().await, 2);

    manager.shutdown_all().await;

    assert_eq!(manager.connection_count().await, 0);
    assert_eq!(manager.room_count().await, 0);

    // Both receivers should have received a Close message.
    let msg1 = rx1.recv().await.expect("rx1 should receive Close");
    assert!(
        matches!(msg1, Message::Close(None)),
        "Expected Close(None), got: {msg1:?}"
    );

    let msg2 = rx2.recv().await.expect("rx2 should receive Close");
    assert!(
        matches!(msg2, Message::Close(None)),
        "Expected Close(None), got: {msg2:?}"
    );

    // After Close, the channel should be closed (no more messages).
    assert!(
        rx1.recv().await.is_none(),
        "Channel should be closed after shutdown"
    );
}
