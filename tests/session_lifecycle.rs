//! Integration tests for the HTTP session lifecycle.
//!
//! These tests verify the session registry contract: responses are
//! delivered in completion order, pending requests are rejected exactly
//! once on close or eviction, and lifecycle operations on closed sessions
//! are no-ops.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use cms_mcp::mcp::protocol::RequestId;
use cms_mcp::mcp::{SessionEvent, SessionRegistry};

fn registry() -> SessionRegistry {
    SessionRegistry::new(Duration::from_secs(300))
}

/// Drains every queued event until the session reports done.
async fn drain(registry: &SessionRegistry, id: &str) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Some(event) = registry.next_event(id).await {
        let done = matches!(event, SessionEvent::Close { .. });
        events.push(event);
        if done {
            break;
        }
    }
    events
}

#[tokio::test]
async fn test_responses_arrive_in_completion_order() {
    let registry = registry();
    let id = registry.create();

    registry.submit(&id, RequestId::Number(1), "resources/read");
    registry.submit(&id, RequestId::Number(2), "ping");

    // The second request finishes first; delivery follows completion.
    registry.complete(&id, &RequestId::Number(2), "{\"id\":2}".to_string());
    registry.complete(&id, &RequestId::Number(1), "{\"id\":1}".to_string());

    let first = registry.next_event(&id).await.unwrap();
    let second = registry.next_event(&id).await.unwrap();
    assert_eq!(first, SessionEvent::Message("{\"id\":2}".to_string()));
    assert_eq!(second, SessionEvent::Message("{\"id\":1}".to_string()));
}

#[tokio::test]
async fn test_close_rejects_each_pending_request_exactly_once() {
    let registry = registry();
    let id = registry.create();

    registry.submit(&id, RequestId::Number(1), "resources/read");
    registry.submit(&id, RequestId::String("b".to_string()), "tools/call");

    registry.close(&id, "client went away");

    let events = drain(&registry, &id).await;
    let rejections: Vec<Value> = events
        .iter()
        .filter_map(|event| match event {
            SessionEvent::Message(msg) => serde_json::from_str(msg).ok(),
            SessionEvent::Close { .. } => None,
        })
        .collect();

    assert_eq!(rejections.len(), 2);
    for envelope in &rejections {
        assert_eq!(envelope["error"]["code"], serde_json::json!(-32001));
    }
    // Both ids are present, neither twice.
    let ids: Vec<&Value> = rejections.iter().map(|e| &e["id"]).collect();
    assert!(ids.contains(&&serde_json::json!(1)));
    assert!(ids.contains(&&serde_json::json!("b")));

    assert!(matches!(events.last(), Some(SessionEvent::Close { .. })));
}

#[tokio::test]
async fn test_double_close_emits_one_close_event() {
    let registry = registry();
    let id = registry.create();

    registry.close(&id, "first");
    registry.close(&id, "second");

    let events = drain(&registry, &id).await;
    let closes = events
        .iter()
        .filter(|e| matches!(e, SessionEvent::Close { .. }))
        .count();
    assert_eq!(closes, 1);
}

#[tokio::test]
async fn test_abandoned_response_is_silently_dropped() {
    let registry = registry();
    let id = registry.create();

    registry.submit(&id, RequestId::Number(1), "ping");
    registry.complete(&id, &RequestId::Number(1), "{}".to_string());

    // A second resolution for the same id must not enqueue anything.
    assert!(!registry.complete(&id, &RequestId::Number(1), "{}".to_string()));

    registry.close(&id, "done");
    let events = drain(&registry, &id).await;
    let messages = events
        .iter()
        .filter(|e| matches!(e, SessionEvent::Message(_)))
        .count();
    assert_eq!(messages, 1);
}

#[tokio::test]
async fn test_enqueue_and_submit_on_closed_session_are_noops() {
    let registry = registry();
    let id = registry.create();
    registry.close(&id, "done");
    drain(&registry, &id).await;

    registry.enqueue(&id, SessionEvent::Message("{}".to_string()));
    assert!(!registry.submit(&id, RequestId::Number(1), "ping"));
    assert!(registry.next_event(&id).await.is_none());
}

#[tokio::test]
async fn test_eviction_rejects_pending_with_session_expired() {
    let registry = SessionRegistry::new(Duration::from_millis(1));
    let id = registry.create();
    registry.submit(&id, RequestId::Number(9), "resources/read");

    tokio::time::sleep(Duration::from_millis(10)).await;
    registry.sweep();

    assert!(!registry.is_open(&id));
    let events = drain(&registry, &id).await;
    let SessionEvent::Message(msg) = &events[0] else {
        panic!("expected rejection before close");
    };
    let envelope: Value = serde_json::from_str(msg).unwrap();
    assert_eq!(envelope["error"]["code"], serde_json::json!(-32001));
    assert_eq!(envelope["id"], serde_json::json!(9));
}

#[tokio::test]
async fn test_abandoned_sessions_are_reclaimed_without_a_stream() {
    let registry = SessionRegistry::new(Duration::from_millis(1));

    // Clients create sessions and disappear without ever opening a
    // stream; repeated sweeps must still empty the map.
    for _ in 0..3 {
        let _ = registry.create();
    }
    tokio::time::sleep(Duration::from_millis(10)).await;

    for _ in 0..10 {
        registry.sweep();
    }
    assert_eq!(registry.len(), 0);
}

#[tokio::test]
async fn test_touch_keeps_a_session_alive_through_sweeps() {
    let registry = SessionRegistry::new(Duration::from_secs(60));
    let id = registry.create();

    registry.touch(&id);
    registry.sweep();
    assert!(registry.is_open(&id));
}

#[tokio::test]
async fn test_drained_closed_session_is_removed_by_sweep() {
    let registry = registry();
    let id = registry.create();
    registry.close(&id, "done");
    drain(&registry, &id).await;

    registry.remove_if_drained(&id);
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_waiting_stream_wakes_on_completion() {
    let registry = Arc::new(registry());
    let id = registry.create();
    registry.submit(&id, RequestId::Number(1), "ping");

    let waiter = {
        let registry = registry.clone();
        let id = id.clone();
        tokio::spawn(async move { registry.next_event(&id).await })
    };

    tokio::task::yield_now().await;
    registry.complete(&id, &RequestId::Number(1), "{\"id\":1}".to_string());

    let event = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event, Some(SessionEvent::Message("{\"id\":1}".to_string())));
}
