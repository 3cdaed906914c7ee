mod common;

use common::{named, TestApp};
use realtime_chat_service::config::Config;
use realtime_chat_service::error::AppError;
use realtime_chat_service::models::MessageStatus;
use realtime_chat_service::websocket::handlers::{handle_inbound, run_session_worker};
use realtime_chat_service::websocket::message_types::WsInboundEvent;
use realtime_chat_service::websocket::{ConnectionHandle, ServerEvent};
use tokio::sync::mpsc::unbounded_channel;
use uuid::Uuid;

#[tokio::test]
async fn test_reconnect_keeps_single_entry() {
    let app = TestApp::new().await;
    let (alice, bob, _conversation) = app.friends_with_conversation().await;
    let mut b = app.connect(bob).await;

    let first = app.connect(alice).await;
    let second = app.connect(alice).await;

    assert_eq!(app.state.registry.online_count().await, 2);
    let current = app.state.registry.lookup(alice).await.unwrap();
    assert_eq!(current.id, second.handle.id);
    assert_eq!(named(&b.drain(), "userOnline").len(), 2);

    // the superseded connection closing must not take the user offline
    assert!(!app.disconnect(&first).await);
    assert!(app.state.registry.is_online(alice).await);
    assert!(b.drain().is_empty());

    assert!(app.disconnect(&second).await);
    assert!(!app.state.registry.is_online(alice).await);
    let events = b.drain();
    let offline = named(&events, "userOffline");
    assert_eq!(offline.len(), 1);
    assert_eq!(offline[0]["data"]["userId"], alice.to_string());
    assert!(offline[0]["data"]["lastSeen"].is_string());

    let profile = app.state.storage.users.get_user(alice).await.unwrap().unwrap();
    assert!(!profile.is_online);
    assert!(profile.last_seen.is_some());
}

#[tokio::test]
async fn test_presence_only_reaches_friends() {
    let app = TestApp::new().await;
    let (alice, _bob, _conversation) = app.friends_with_conversation().await;
    let stranger = app.user("Stranger").await;
    let mut s = app.connect(stranger).await;
    s.drain();

    let a = app.connect(alice).await;
    assert!(s.drain().is_empty());
    app.disconnect(&a).await;
    assert!(s.drain().is_empty());
}

#[tokio::test]
async fn test_connect_delivers_pending_messages() {
    let app = TestApp::new().await;
    let (alice, bob, conversation) = app.friends_with_conversation().await;
    let mut a = app.connect(alice).await;
    let first = app.send_text(&conversation, alice, "one").await.unwrap();
    let second = app.send_text(&conversation, alice, "two").await.unwrap();
    a.drain();

    app.connect(bob).await;

    let events = a.drain();
    let delivered = named(&events, "messageDelivered");
    assert_eq!(delivered.len(), 2);
    for id in [first.message.id, second.message.id] {
        let stored = app
            .state
            .storage
            .messages
            .find_message(id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, MessageStatus::Delivered);
    }
}

#[tokio::test]
async fn test_pending_delivery_can_be_disabled() {
    let config = Config {
        deliver_pending_on_connect: false,
        ..Config::test_defaults()
    };
    let app = TestApp::with_config(config);
    let (alice, bob, conversation) = app.friends_with_conversation().await;
    let mut a = app.connect(alice).await;
    let sent = app.send_text(&conversation, alice, "one").await.unwrap();
    a.drain();

    app.connect(bob).await;

    assert!(named(&a.drain(), "messageDelivered").is_empty());
    let stored = app
        .state
        .storage
        .messages
        .find_message(sent.message.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, MessageStatus::Sent);
}

#[tokio::test]
async fn test_get_online_users_replies_to_caller() {
    let app = TestApp::new().await;
    let (alice, bob, _conversation) = app.friends_with_conversation().await;
    app.connect(alice).await;
    app.connect(bob).await;

    let reply = handle_inbound(&app.state, alice, WsInboundEvent::GetOnlineUsers)
        .await
        .unwrap();
    match reply {
        Some(ServerEvent::OnlineUsersList { mut user_ids }) => {
            user_ids.sort();
            let mut expected = vec![alice, bob];
            expected.sort();
            assert_eq!(user_ids, expected);
        }
        other => panic!("unexpected reply: {other:?}"),
    }
}

#[tokio::test]
async fn test_typing_goes_to_other_participant_only() {
    let app = TestApp::new().await;
    let (alice, bob, conversation) = app.friends_with_conversation().await;
    let mut a = app.connect(alice).await;
    let mut b = app.connect(bob).await;
    a.drain();
    b.drain();

    let typing = WsInboundEvent::Typing {
        conversation_id: conversation.id,
    };
    handle_inbound(&app.state, alice, typing).await.unwrap();
    let stop = WsInboundEvent::StopTyping {
        conversation_id: conversation.id,
    };
    handle_inbound(&app.state, alice, stop).await.unwrap();

    let events = b.drain();
    assert_eq!(named(&events, "userTyping").len(), 1);
    assert_eq!(named(&events, "userStoppedTyping").len(), 1);
    assert!(a.drain().is_empty());

    let mallory = app.user("Mallory").await;
    let err = app
        .state
        .typing
        .typing(conversation.id, mallory, true)
        .await
        .unwrap_err();
    assert_eq!(err, AppError::NotFound("conversation"));
}

#[tokio::test]
async fn test_session_worker_lifecycle() {
    let app = TestApp::new().await;
    let (alice, bob, conversation) = app.friends_with_conversation().await;
    let mut b = app.connect(bob).await;
    b.drain();

    let (handle, mut outbound) = ConnectionHandle::new(alice);
    let (tx, rx) = unbounded_channel();
    tx.send(WsInboundEvent::Typing {
        conversation_id: conversation.id,
    })
    .unwrap();
    tx.send(WsInboundEvent::EditMessage {
        message_id: Uuid::new_v4(),
        new_content: "nope".into(),
    })
    .unwrap();
    tx.send(WsInboundEvent::GetOnlineUsers).unwrap();
    // closing the inbound side ends the worker once the queue is drained
    drop(tx);

    run_session_worker(app.state.clone(), handle, rx).await;

    let mut events = Vec::new();
    while let Ok(raw) = outbound.try_recv() {
        events.push(serde_json::from_str::<serde_json::Value>(&raw).unwrap());
    }
    let names: Vec<&str> = events.iter().map(|e| e["event"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["onlineUsersList", "error", "onlineUsersList"]);
    assert_eq!(events[1]["data"]["operation"], "editMessage");
    assert_eq!(events[1]["data"]["message"], "Message not found");

    let to_bob: Vec<String> = b
        .drain()
        .iter()
        .map(|e| e["event"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(to_bob, vec!["userOnline", "userTyping", "userOffline"]);
    assert!(!app.state.registry.is_online(alice).await);
}
