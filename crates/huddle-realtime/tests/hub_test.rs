//! Integration tests for the real-time hub: connection lifecycle, presence
//! transitions, subscription fan-out, and self-healing delivery.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;

use huddle_core::config::realtime::RealtimeConfig;
use huddle_core::error::AppError;
use huddle_core::result::AppResult;
use huddle_core::traits::access::ChannelAccess;
use huddle_core::traits::presence::{PresenceRecord, PresenceStatus, PresenceStore};
use huddle_core::types::{ChannelId, MessageId, UserId};
use huddle_presence::MemoryPresenceStore;
use huddle_realtime::{ChatEvent, ChatTarget, RealtimeHub};

/// Grants every join request; membership checks live in the CRUD layer.
struct AllowAll;

#[async_trait]
impl ChannelAccess for AllowAll {
    async fn can_access(&self, _user_id: UserId, _channel_id: ChannelId) -> AppResult<bool> {
        Ok(true)
    }
}

/// Denies every join request.
struct DenyAll;

#[async_trait]
impl ChannelAccess for DenyAll {
    async fn can_access(&self, _user_id: UserId, _channel_id: ChannelId) -> AppResult<bool> {
        Ok(false)
    }
}

/// Store whose every call fails, as when the backing Redis is down.
struct UnreachableStore;

#[async_trait]
impl PresenceStore for UnreachableStore {
    async fn set_online(&self, _user_id: UserId, _connection_tag: &str) -> AppResult<()> {
        Err(AppError::presence("store unreachable"))
    }

    async fn set_offline(&self, _user_id: UserId) -> AppResult<()> {
        Err(AppError::presence("store unreachable"))
    }

    async fn get(&self, _user_id: UserId) -> AppResult<PresenceRecord> {
        Err(AppError::presence("store unreachable"))
    }

    async fn online_users(&self) -> AppResult<Vec<UserId>> {
        Err(AppError::presence("store unreachable"))
    }

    async fn touch(&self, _user_id: UserId) -> AppResult<()> {
        Err(AppError::presence("store unreachable"))
    }
}

struct TestHub {
    hub: RealtimeHub,
    presence: Arc<MemoryPresenceStore>,
}

fn test_hub_with_access(access: Arc<dyn ChannelAccess>) -> TestHub {
    let presence = Arc::new(MemoryPresenceStore::new());
    let hub = RealtimeHub::new(RealtimeConfig::default(), presence.clone(), access);
    TestHub { hub, presence }
}

fn test_hub() -> TestHub {
    test_hub_with_access(Arc::new(AllowAll))
}

/// Drains every pending frame from a connection's receiver.
fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<serde_json::Value> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(serde_json::from_str(&frame).expect("frames are valid JSON"));
    }
    frames
}

fn join_frame(channel_id: ChannelId) -> String {
    format!(r#"{{"type":"join_channel","data":{{"channel_id":"{channel_id}"}}}}"#)
}

fn channel_event(sender_id: UserId, channel_id: ChannelId) -> ChatEvent {
    ChatEvent {
        message_id: MessageId::new(),
        content: "hello world".to_string(),
        message_type: "text".to_string(),
        sender_id,
        sender_name: "sender".to_string(),
        target: ChatTarget::Channel(channel_id),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn user_stays_online_until_last_connection_closes() {
    let t = test_hub();
    let alice = UserId::new();
    let bob = UserId::new();

    let (bob_conn, mut bob_rx) = t.hub.connect(bob, "bob").await;

    // Two simultaneous connections for alice (two devices).
    let (conn_a, _rx_a) = t.hub.connect(alice, "alice").await;
    let (conn_b, _rx_b) = t.hub.connect(alice, "alice").await;

    // Bob saw exactly one online broadcast for alice.
    let online: Vec<_> = drain(&mut bob_rx)
        .into_iter()
        .filter(|f| f["type"] == "user_status" && f["data"]["status"] == "online")
        .collect();
    assert_eq!(online.len(), 1);
    assert_eq!(online[0]["data"]["user_id"], alice.to_string());

    // Closing the first connection keeps alice online.
    t.hub.disconnect(conn_a.id).await;
    assert!(t.hub.is_user_connected(alice));
    assert_eq!(
        t.presence.get(alice).await.unwrap().status,
        PresenceStatus::Online
    );
    assert!(drain(&mut bob_rx).is_empty());

    // Closing the last one produces exactly one offline transition.
    t.hub.disconnect(conn_b.id).await;
    assert!(!t.hub.is_user_connected(alice));
    assert_eq!(
        t.presence.get(alice).await.unwrap().status,
        PresenceStatus::Offline
    );

    let offline: Vec<_> = drain(&mut bob_rx)
        .into_iter()
        .filter(|f| f["type"] == "user_status" && f["data"]["status"] == "offline")
        .collect();
    assert_eq!(offline.len(), 1);
    assert_eq!(offline[0]["data"]["user_id"], alice.to_string());

    drop(bob_conn);
}

#[tokio::test]
async fn disconnect_is_idempotent() {
    let t = test_hub();
    let alice = UserId::new();

    let (conn, _rx) = t.hub.connect(alice, "alice").await;
    t.hub.disconnect(conn.id).await;
    // Second disconnect for the same connection is a no-op, not an error.
    t.hub.disconnect(conn.id).await;
    assert_eq!(t.hub.connection_count(), 0);
}

#[tokio::test]
async fn resubscribe_leaves_user_subscribed_exactly_once() {
    let t = test_hub();
    let alice = UserId::new();
    let bob = UserId::new();
    let channel = ChannelId::new();

    let (alice_conn, mut alice_rx) = t.hub.connect(alice, "alice").await;
    let (_bob_conn, _bob_rx) = t.hub.connect(bob, "bob").await;

    t.hub.handle_inbound(alice_conn.id, &join_frame(channel)).await;
    t.hub
        .handle_inbound(
            alice_conn.id,
            &format!(r#"{{"type":"leave_channel","data":{{"channel_id":"{channel}"}}}}"#),
        )
        .await;
    t.hub.handle_inbound(alice_conn.id, &join_frame(channel)).await;
    t.hub.handle_inbound(alice_conn.id, &join_frame(channel)).await;

    drain(&mut alice_rx);
    t.hub.publish(channel_event(bob, channel)).await;

    let messages: Vec<_> = drain(&mut alice_rx)
        .into_iter()
        .filter(|f| f["type"] == "chat_message")
        .collect();
    assert_eq!(messages.len(), 1, "no duplicate delivery after resubscribe");
}

#[tokio::test]
async fn full_disconnect_clears_all_subscriptions() {
    let t = test_hub();
    let alice = UserId::new();
    let general = ChannelId::new();
    let random = ChannelId::new();

    let (conn, _rx) = t.hub.connect(alice, "alice").await;
    t.hub.handle_inbound(conn.id, &join_frame(general)).await;
    t.hub.handle_inbound(conn.id, &join_frame(random)).await;
    assert_eq!(t.hub.subscriptions().subscription_count(alice), 2);

    t.hub.disconnect(conn.id).await;

    assert_eq!(t.hub.subscriptions().subscription_count(alice), 0);
    assert!(t.hub.subscriptions().subscribers_of(general).is_empty());
    assert!(t.hub.subscriptions().subscribers_of(random).is_empty());
}

#[tokio::test]
async fn channel_message_reaches_all_subscribers_and_nobody_else() {
    let t = test_hub();
    let alice = UserId::new();
    let bob = UserId::new();
    let carol = UserId::new();
    let channel = ChannelId::new();

    let (alice_conn, mut alice_rx) = t.hub.connect(alice, "alice").await;
    // Alice's second device receives channel events too.
    let (_alice_tablet, mut alice_tablet_rx) = t.hub.connect(alice, "alice").await;
    let (bob_conn, mut bob_rx) = t.hub.connect(bob, "bob").await;
    let (_carol_conn, mut carol_rx) = t.hub.connect(carol, "carol").await;

    t.hub.handle_inbound(alice_conn.id, &join_frame(channel)).await;
    t.hub.handle_inbound(bob_conn.id, &join_frame(channel)).await;

    drain(&mut alice_rx);
    drain(&mut alice_tablet_rx);
    drain(&mut bob_rx);
    drain(&mut carol_rx);

    let event = channel_event(alice, channel);
    let message_id = event.message_id;
    t.hub.publish(event).await;

    for rx in [&mut alice_rx, &mut alice_tablet_rx, &mut bob_rx] {
        let frames = drain(rx);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["type"], "chat_message");
        assert_eq!(frames[0]["data"]["message_id"], message_id.to_string());
        assert_eq!(frames[0]["data"]["channel_id"], channel.to_string());
    }

    // Carol never joined channel; she receives nothing.
    assert!(drain(&mut carol_rx).is_empty());
}

#[tokio::test]
async fn direct_message_reaches_receiver_and_echoes_to_sender() {
    let t = test_hub();
    let alice = UserId::new();
    let bob = UserId::new();

    let (_alice_conn, mut alice_rx) = t.hub.connect(alice, "alice").await;
    let (_bob_conn, mut bob_rx) = t.hub.connect(bob, "bob").await;
    drain(&mut alice_rx);
    drain(&mut bob_rx);

    t.hub
        .publish(ChatEvent {
            message_id: MessageId::new(),
            content: "psst".to_string(),
            message_type: "text".to_string(),
            sender_id: alice,
            sender_name: "alice".to_string(),
            target: ChatTarget::Direct(bob),
            created_at: Utc::now(),
        })
        .await;

    let bob_frames = drain(&mut bob_rx);
    assert_eq!(bob_frames.len(), 1);
    assert_eq!(bob_frames[0]["data"]["receiver_id"], bob.to_string());
    assert!(bob_frames[0]["data"].get("channel_id").is_none());

    let alice_frames = drain(&mut alice_rx);
    assert_eq!(alice_frames.len(), 1, "sender's devices get the echo");
}

#[tokio::test]
async fn typing_reaches_other_subscribers_but_not_the_typist() {
    let t = test_hub();
    let alice = UserId::new();
    let bob = UserId::new();
    let channel = ChannelId::new();

    let (alice_conn, mut alice_rx) = t.hub.connect(alice, "alice").await;
    let (bob_conn, mut bob_rx) = t.hub.connect(bob, "bob").await;

    t.hub.handle_inbound(alice_conn.id, &join_frame(channel)).await;
    t.hub.handle_inbound(bob_conn.id, &join_frame(channel)).await;
    drain(&mut alice_rx);
    drain(&mut bob_rx);

    t.hub
        .handle_inbound(
            alice_conn.id,
            &format!(
                r#"{{"type":"typing","data":{{"channel_id":"{channel}","typing":true}}}}"#
            ),
        )
        .await;

    let bob_frames = drain(&mut bob_rx);
    assert_eq!(bob_frames.len(), 1);
    assert_eq!(bob_frames[0]["type"], "typing");
    assert_eq!(bob_frames[0]["data"]["user_id"], alice.to_string());
    assert_eq!(bob_frames[0]["data"]["typing"], true);

    assert!(drain(&mut alice_rx).is_empty(), "typist gets no echo");
}

#[tokio::test]
async fn ping_updates_activity_and_replies_on_the_same_connection() {
    let t = test_hub();
    let alice = UserId::new();
    let bob = UserId::new();

    let (alice_conn, mut alice_rx) = t.hub.connect(alice, "alice").await;
    let (_bob_conn, mut bob_rx) = t.hub.connect(bob, "bob").await;
    drain(&mut alice_rx);
    drain(&mut bob_rx);

    let before = t.presence.get(alice).await.unwrap().last_activity.unwrap();
    t.hub.handle_inbound(alice_conn.id, r#"{"type":"ping"}"#).await;

    let frames = drain(&mut alice_rx);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["type"], "pong");
    assert!(drain(&mut bob_rx).is_empty(), "pong is never broadcast");

    let after = t.presence.get(alice).await.unwrap().last_activity.unwrap();
    assert!(after >= before);
}

#[tokio::test]
async fn dead_connection_is_reaped_during_broadcast() {
    let t = test_hub();
    let alice = UserId::new();
    let bob = UserId::new();
    let channel = ChannelId::new();

    let (alice_conn, _alice_rx) = t.hub.connect(alice, "alice").await;
    let (bob_conn, bob_rx) = t.hub.connect(bob, "bob").await;

    t.hub.handle_inbound(alice_conn.id, &join_frame(channel)).await;
    t.hub.handle_inbound(bob_conn.id, &join_frame(channel)).await;

    // Bob's transport dies without a close frame.
    drop(bob_rx);

    t.hub.publish(channel_event(alice, channel)).await;

    // The failed write removed bob from the registry and his presence
    // and subscriptions were cleaned up.
    assert!(!t.hub.is_user_connected(bob));
    assert_eq!(
        t.presence.get(bob).await.unwrap().status,
        PresenceStatus::Offline
    );
    assert_eq!(t.hub.subscriptions().subscribers_of(channel), vec![alice]);
}

#[tokio::test]
async fn presence_store_outage_never_blocks_delivery() {
    let hub = RealtimeHub::new(
        RealtimeConfig::default(),
        Arc::new(UnreachableStore),
        Arc::new(AllowAll),
    );
    let alice = UserId::new();
    let bob = UserId::new();
    let channel = ChannelId::new();

    // Admission proceeds and the online transition still broadcasts.
    let (bob_conn, mut bob_rx) = hub.connect(bob, "bob").await;
    let (alice_conn, mut alice_rx) = hub.connect(alice, "alice").await;
    assert!(hub.is_user_connected(alice));
    assert!(hub.is_user_connected(bob));

    let online: Vec<_> = drain(&mut bob_rx)
        .into_iter()
        .filter(|f| f["type"] == "user_status" && f["data"]["status"] == "online")
        .collect();
    assert_eq!(online.len(), 1);
    assert_eq!(online[0]["data"]["user_id"], alice.to_string());

    // Subscriptions and fan-out are untouched by the failing writes.
    hub.handle_inbound(alice_conn.id, &join_frame(channel)).await;
    hub.handle_inbound(bob_conn.id, &join_frame(channel)).await;
    drain(&mut alice_rx);
    drain(&mut bob_rx);

    hub.publish(channel_event(bob, channel)).await;
    let frames = drain(&mut alice_rx);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["type"], "chat_message");

    // Disconnect still tears down routing state and broadcasts offline.
    hub.disconnect(alice_conn.id).await;
    assert!(!hub.is_user_connected(alice));
    assert_eq!(hub.subscriptions().subscription_count(alice), 0);

    let offline: Vec<_> = drain(&mut bob_rx)
        .into_iter()
        .filter(|f| f["type"] == "user_status" && f["data"]["status"] == "offline")
        .collect();
    assert_eq!(offline.len(), 1);
    assert_eq!(offline[0]["data"]["user_id"], alice.to_string());
}

#[tokio::test]
async fn malformed_frames_change_nothing_and_the_next_frame_works() {
    let t = test_hub();
    let alice = UserId::new();
    let bob = UserId::new();
    let channel = ChannelId::new();

    let (alice_conn, mut alice_rx) = t.hub.connect(alice, "alice").await;
    let (_bob_conn, _bob_rx) = t.hub.connect(bob, "bob").await;
    drain(&mut alice_rx);

    t.hub.handle_inbound(alice_conn.id, "not json at all").await;
    t.hub
        .handle_inbound(alice_conn.id, r#"{"type":"launch_missiles","data":{}}"#)
        .await;
    t.hub
        .handle_inbound(alice_conn.id, r#"{"type":"join_channel","data":{"channel_id":42}}"#)
        .await;

    assert!(t.hub.is_user_connected(alice));
    assert_eq!(t.hub.subscriptions().subscription_count(alice), 0);
    assert!(drain(&mut alice_rx).is_empty());

    // A well-formed envelope afterwards is still processed.
    t.hub.handle_inbound(alice_conn.id, &join_frame(channel)).await;
    t.hub.publish(channel_event(bob, channel)).await;
    assert_eq!(drain(&mut alice_rx).len(), 1);
}

#[tokio::test]
async fn denied_join_creates_no_subscription() {
    let t = test_hub_with_access(Arc::new(DenyAll));
    let alice = UserId::new();
    let channel = ChannelId::new();

    let (conn, mut rx) = t.hub.connect(alice, "alice").await;
    t.hub.handle_inbound(conn.id, &join_frame(channel)).await;

    assert_eq!(t.hub.subscriptions().subscription_count(alice), 0);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn unsubscribe_stops_future_deliveries() {
    let t = test_hub();
    let alice = UserId::new();
    let bob = UserId::new();
    let channel = ChannelId::new();

    let (alice_conn, mut alice_rx) = t.hub.connect(alice, "alice").await;
    let (_bob_conn, _bob_rx) = t.hub.connect(bob, "bob").await;

    t.hub.handle_inbound(alice_conn.id, &join_frame(channel)).await;
    t.hub.publish(channel_event(bob, channel)).await;
    drain(&mut alice_rx);

    t.hub
        .handle_inbound(
            alice_conn.id,
            &format!(r#"{{"type":"leave_channel","data":{{"channel_id":"{channel}"}}}}"#),
        )
        .await;
    t.hub.publish(channel_event(bob, channel)).await;

    // Any pass that starts after the unsubscribe must not deliver.
    assert!(drain(&mut alice_rx).is_empty());
}

#[tokio::test]
async fn shutdown_closes_everything_and_marks_users_offline() {
    let t = test_hub();
    let alice = UserId::new();
    let bob = UserId::new();

    let (_a, _a_rx) = t.hub.connect(alice, "alice").await;
    let (_b, _b_rx) = t.hub.connect(bob, "bob").await;

    t.hub.shutdown().await;

    assert_eq!(t.hub.connection_count(), 0);
    assert_eq!(t.hub.user_count(), 0);
    assert_eq!(
        t.presence.get(alice).await.unwrap().status,
        PresenceStatus::Offline
    );
    assert_eq!(
        t.presence.get(bob).await.unwrap().status,
        PresenceStatus::Offline
    );
}
