//! Tests for the event-to-frame fan-out: publisher -> bus -> router ->
//! per-connection channels.
//!
//! Connections are registered directly on the manager (no HTTP); frames
//! are read back off the per-connection channels and parsed.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use axum::extract::ws::Message;
use coursehub_api::realtime::{EventPublisher, RealtimeRouter};
use coursehub_api::ws::WsManager;
use coursehub_events::wire::{parse_server_frame, ServerFrame};
use coursehub_events::EventBus;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

/// Spin up a manager, bus, router task, and publisher.
fn setup() -> (Arc<WsManager>, EventPublisher) {
    let manager = Arc::new(WsManager::new());
    let bus = Arc::new(EventBus::default());

    let router = RealtimeRouter::new(Arc::clone(&manager));
    tokio::spawn(router.run(bus.subscribe()));

    let publisher = EventPublisher::new(bus);
    (manager, publisher)
}

/// Receive and parse the next frame pushed to a connection.
async fn recv_frame(rx: &mut UnboundedReceiver<Message>) -> ServerFrame {
    let msg = timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for a frame")
        .expect("connection channel closed");
    match msg {
        Message::Text(text) => parse_server_frame(&text).expect("unparseable frame"),
        other => panic!("Expected a text frame, got {other:?}"),
    }
}

/// Assert that no further frame arrives within a short window.
async fn assert_no_frame(rx: &mut UnboundedReceiver<Message>) {
    let extra = timeout(Duration::from_millis(150), rx.recv()).await;
    assert!(extra.is_err(), "unexpected extra frame: {extra:?}");
}

// ---------------------------------------------------------------------------
// Test: one publish, exactly one frame per live member connection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn publish_reaches_each_member_exactly_once() {
    let (manager, publisher) = setup();

    let mut actor_tab = manager.register("actor-tab".to_string(), 1).await;
    let mut classmate = manager.register("classmate".to_string(), 2).await;
    let mut outsider = manager.register("outsider".to_string(), 3).await;

    assert!(manager.join("actor-tab", 10).await);
    assert!(manager.join("classmate", 10).await);

    publisher.publish_enrollment(1, 10, serde_json::json!({"course_title": "Rust 101"}));

    // The actor's connection gets the personal variant only.
    let frame = recv_frame(&mut actor_tab).await;
    assert_matches!(frame, ServerFrame::EnrollmentSuccess(d) if d.course_id == 10 && d.user_id == 1);
    assert_no_frame(&mut actor_tab).await;

    // Room members get the broadcast variant, once.
    let frame = recv_frame(&mut classmate).await;
    assert_matches!(frame, ServerFrame::UserEnrolled(d) if d.course_id == 10 && d.user_id == 1);
    assert_no_frame(&mut classmate).await;

    // Connections outside the room and audience get nothing.
    assert_no_frame(&mut outsider).await;
}

// ---------------------------------------------------------------------------
// Test: the actor is notified even before joining the room
// ---------------------------------------------------------------------------

#[tokio::test]
async fn actor_notified_without_room_membership() {
    let (manager, publisher) = setup();

    let mut actor = manager.register("actor".to_string(), 1).await;
    let mut classmate = manager.register("classmate".to_string(), 2).await;
    assert!(manager.join("classmate", 10).await);

    // The actor has not joined course 10's room.
    publisher.publish_enrollment(1, 10, serde_json::json!({}));

    let frame = recv_frame(&mut actor).await;
    assert_matches!(frame, ServerFrame::EnrollmentSuccess(_));
    assert_no_frame(&mut actor).await;

    let frame = recv_frame(&mut classmate).await;
    assert_matches!(frame, ServerFrame::UserEnrolled(_));
}

// ---------------------------------------------------------------------------
// Test: progress fans out to room union actor, once per connection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn progress_reaches_room_union_actor_once() {
    let (manager, publisher) = setup();

    // Actor tab A joined the room; tab B did not; classmate joined.
    let mut tab_a = manager.register("tab-a".to_string(), 1).await;
    let mut tab_b = manager.register("tab-b".to_string(), 1).await;
    let mut classmate = manager.register("classmate".to_string(), 2).await;
    assert!(manager.join("tab-a", 10).await);
    assert!(manager.join("classmate", 10).await);

    publisher.publish_progress_update(1, 10, 62.5);

    for rx in [&mut tab_a, &mut tab_b, &mut classmate] {
        let frame = recv_frame(rx).await;
        assert_matches!(
            frame,
            ServerFrame::ProgressUpdated(d) if d.course_id == 10 && d.user_id == 1 && d.percent == 62.5
        );
        assert_no_frame(rx).await;
    }
}

// ---------------------------------------------------------------------------
// Test: module completion splits personal and room variants
// ---------------------------------------------------------------------------

#[tokio::test]
async fn module_completion_splits_variants() {
    let (manager, publisher) = setup();

    let mut actor_tab = manager.register("actor-tab".to_string(), 1).await;
    let mut classmate = manager.register("classmate".to_string(), 2).await;
    assert!(manager.join("actor-tab", 10).await);
    assert!(manager.join("classmate", 10).await);

    publisher.publish_module_completion(1, 10, 77, serde_json::json!({"module_title": "Ownership"}));

    let frame = recv_frame(&mut actor_tab).await;
    assert_matches!(frame, ServerFrame::ModuleCompleted(d) if d.module_id == 77);
    assert_no_frame(&mut actor_tab).await;

    let frame = recv_frame(&mut classmate).await;
    assert_matches!(frame, ServerFrame::UserModuleCompleted(d) if d.module_id == 77);
    assert_no_frame(&mut classmate).await;
}

// ---------------------------------------------------------------------------
// Test: typing indicators skip the actor entirely
// ---------------------------------------------------------------------------

#[tokio::test]
async fn typing_excludes_actor() {
    let (manager, publisher) = setup();

    let mut actor = manager.register("actor".to_string(), 1).await;
    let mut classmate = manager.register("classmate".to_string(), 2).await;
    assert!(manager.join("actor", 10).await);
    assert!(manager.join("classmate", 10).await);

    publisher.publish_typing(1, 10, true);
    publisher.publish_typing(1, 10, false);

    let frame = recv_frame(&mut classmate).await;
    assert_matches!(frame, ServerFrame::UserTyping(d) if d.user_id == 1);
    let frame = recv_frame(&mut classmate).await;
    assert_matches!(frame, ServerFrame::UserStoppedTyping(d) if d.user_id == 1);

    assert_no_frame(&mut actor).await;
}

// ---------------------------------------------------------------------------
// Test: no persistence -- connections joining after a publish see nothing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn late_joiner_never_sees_past_events() {
    let (manager, publisher) = setup();

    let mut early = manager.register("early".to_string(), 2).await;
    assert!(manager.join("early", 10).await);

    publisher.publish_enrollment(1, 10, serde_json::json!({}));
    let _ = recv_frame(&mut early).await;

    // A connection that joins afterwards must not receive a replay.
    let mut late = manager.register("late".to_string(), 3).await;
    assert!(manager.join("late", 10).await);
    assert_no_frame(&mut late).await;
}

// ---------------------------------------------------------------------------
// Test: frames to one connection preserve publish order
// ---------------------------------------------------------------------------

#[tokio::test]
async fn per_connection_order_matches_publish_order() {
    let (manager, publisher) = setup();

    let mut classmate = manager.register("classmate".to_string(), 2).await;
    assert!(manager.join("classmate", 10).await);

    for percent in [10.0f32, 20.0, 30.0, 40.0] {
        publisher.publish_progress_update(1, 10, percent);
    }

    for expected in [10.0f32, 20.0, 30.0, 40.0] {
        let frame = recv_frame(&mut classmate).await;
        assert_matches!(frame, ServerFrame::ProgressUpdated(d) if d.percent == expected);
    }
}
