/// Integration tests for relay fan-out across the write path
///
/// Exercises the combinations controllers rely on: an assignment unicast
/// paired with a tenant multicast, delivery counts across mixed tenants,
/// and session replacement under reconnects. No external services needed.

use std::sync::Arc;

use serde_json::{json, Value as JsonValue};
use taskhub_shared::relay::{ConnectionRegistry, EventKind, WsEvent};
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

fn drain(receiver: &mut UnboundedReceiver<String>) -> Vec<JsonValue> {
    let mut frames = Vec::new();
    while let Ok(frame) = receiver.try_recv() {
        frames.push(serde_json::from_str(&frame).unwrap());
    }
    frames
}

#[tokio::test]
async fn assignment_unicast_overlaps_tenant_multicast() {
    let registry = ConnectionRegistry::new();
    let tenant_id = Uuid::new_v4();
    let assignee_id = Uuid::new_v4();
    let watcher_id = Uuid::new_v4();

    let (_a, mut assignee_rx) = registry.connect(assignee_id, tenant_id);
    let (_w, mut watcher_rx) = registry.connect(watcher_id, tenant_id);

    let task_id = Uuid::new_v4();

    // What the task-create path emits when an assignee is set
    let assigned = WsEvent::new(EventKind::TaskAssigned, json!({"id": task_id}));
    assert!(registry.emit_to_user(assignee_id, &assigned));

    let created = WsEvent::new(EventKind::TaskCreated, json!({"id": task_id}));
    assert_eq!(registry.emit_to_tenant(tenant_id, &created), 2);

    let assignee_frames = drain(&mut assignee_rx);
    assert_eq!(assignee_frames.len(), 2);
    assert_eq!(assignee_frames[0]["event"], "task:assigned");
    assert_eq!(assignee_frames[1]["event"], "task:created");

    let watcher_frames = drain(&mut watcher_rx);
    assert_eq!(watcher_frames.len(), 1);
    assert_eq!(watcher_frames[0]["event"], "task:created");
}

#[tokio::test]
async fn multicast_counts_only_the_target_tenant() {
    let registry = ConnectionRegistry::new();
    let tenant_a = Uuid::new_v4();
    let tenant_b = Uuid::new_v4();

    let mut a_receivers = Vec::new();
    for _ in 0..3 {
        let (_h, rx) = registry.connect(Uuid::new_v4(), tenant_a);
        a_receivers.push(rx);
    }
    let (_h, mut b_rx) = registry.connect(Uuid::new_v4(), tenant_b);

    let event = WsEvent::new(EventKind::TaskDeleted, json!({"id": Uuid::new_v4()}));
    assert_eq!(registry.emit_to_tenant(tenant_a, &event), 3);

    for rx in &mut a_receivers {
        assert_eq!(drain(rx).len(), 1);
    }
    assert!(drain(&mut b_rx).is_empty());
}

#[tokio::test]
async fn reconnect_redirects_unicast_without_breaking_multicast() {
    let registry = ConnectionRegistry::new();
    let tenant_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    let (first, mut first_rx) = registry.connect(user_id, tenant_id);
    let (_second, mut second_rx) = registry.connect(user_id, tenant_id);

    // Old socket finally times out after the new session took over
    registry.disconnect(first);

    let event = WsEvent::new(EventKind::CommentCreated, json!({"id": Uuid::new_v4()}));
    assert!(registry.emit_to_user(user_id, &event));
    assert_eq!(registry.emit_to_tenant(tenant_id, &event), 1);

    assert!(drain(&mut first_rx).is_empty());
    assert_eq!(drain(&mut second_rx).len(), 2);
}

#[tokio::test]
async fn concurrent_emitters_share_one_registry() {
    let registry = Arc::new(ConnectionRegistry::new());
    let tenant_id = Uuid::new_v4();
    let (_h, mut rx) = registry.connect(Uuid::new_v4(), tenant_id);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            let event = WsEvent::new(EventKind::TaskUpdated, json!({"n": 1}));
            registry.emit_to_tenant(tenant_id, &event)
        }));
    }

    let mut delivered = 0;
    for handle in handles {
        delivered += handle.await.unwrap();
    }

    assert_eq!(delivered, 8);
    assert_eq!(drain(&mut rx).len(), 8);
}
