mod common;

use common::{named, TestApp};
use realtime_chat_service::error::AppError;
use realtime_chat_service::models::{MessageStatus, MessageType, TOMBSTONE_CONTENT};
use realtime_chat_service::services::MessageService;
use realtime_chat_service::websocket::message_types::ReactionAction;
use std::time::Duration;

#[tokio::test]
async fn test_mark_conversation_read_is_idempotent() {
    let app = TestApp::new().await;
    let (alice, bob, conversation) = app.friends_with_conversation().await;
    for text in ["one", "two", "three"] {
        app.send_text(&conversation, alice, text).await.unwrap();
    }
    let mut a = app.connect(alice).await;
    a.drain();

    let changed = app
        .state
        .messages
        .mark_conversation_read(conversation.id, bob)
        .await
        .unwrap();
    assert_eq!(changed, 3);
    let reads = a.drain();
    assert_eq!(named(&reads, "messageRead").len(), 3);
    assert!(reads.iter().all(|e| e["data"]["readBy"] == bob.to_string()));

    let again = app
        .state
        .messages
        .mark_conversation_read(conversation.id, bob)
        .await
        .unwrap();
    assert_eq!(again, 0);
    assert!(a.drain().is_empty());

    let history = app
        .state
        .conversations
        .history(conversation.id, alice, None, None)
        .await
        .unwrap();
    assert!(history.iter().all(|m| m.status == MessageStatus::Read));
}

#[tokio::test]
async fn test_sender_reading_own_message_is_noop() {
    let app = TestApp::new().await;
    let (alice, bob, conversation) = app.friends_with_conversation().await;
    let sent = app.send_text(&conversation, alice, "hi").await.unwrap();

    assert!(!app.state.messages.mark_read(sent.message.id, alice).await.unwrap());
    assert!(app.state.messages.mark_read(sent.message.id, bob).await.unwrap());
    // read never moves back to delivered
    assert!(!app.state.messages.mark_delivered(sent.message.id).await.unwrap());
}

#[tokio::test]
async fn test_mark_read_by_outsider_is_not_found() {
    let app = TestApp::new().await;
    let (alice, _bob, conversation) = app.friends_with_conversation().await;
    let sent = app.send_text(&conversation, alice, "hi").await.unwrap();
    let mallory = app.user("Mallory").await;

    let err = app
        .state
        .messages
        .mark_read(sent.message.id, mallory)
        .await
        .unwrap_err();
    assert_eq!(err, AppError::NotFound("message"));
}

#[tokio::test]
async fn test_edit_routes_to_both_participants() {
    let app = TestApp::new().await;
    let (alice, bob, conversation) = app.friends_with_conversation().await;
    let mut a = app.connect(alice).await;
    let mut b = app.connect(bob).await;
    let sent = app.send_text(&conversation, alice, "helo").await.unwrap();
    a.drain();
    b.drain();

    let edited = app
        .state
        .messages
        .edit_message(sent.message.id, alice, "hello".into())
        .await
        .unwrap();
    assert_eq!(edited.content, "hello");
    assert!(edited.is_edited);
    assert!(edited.edited_at.is_some());

    for events in [a.drain(), b.drain()] {
        let edits = named(&events, "messageEdited");
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0]["data"]["content"], "hello");
        assert_eq!(edits[0]["data"]["isEdited"], true);
    }
}

#[tokio::test]
async fn test_edit_rules() {
    let app = TestApp::new().await;
    let (alice, bob, conversation) = app.friends_with_conversation().await;
    let text = app.send_text(&conversation, alice, "hi").await.unwrap();
    let image = app
        .send(&conversation, alice, MessageType::Image, "https://cdn.example.com/a.png")
        .await
        .unwrap();

    let err = app
        .state
        .messages
        .edit_message(text.message.id, bob, "mine now".into())
        .await
        .unwrap_err();
    assert_eq!(err, AppError::Unauthorized);

    let err = app
        .state
        .messages
        .edit_message(image.message.id, alice, "caption".into())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = app
        .state
        .messages
        .edit_message(text.message.id, alice, "  ".into())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn test_edit_after_window_is_rejected() {
    let app = TestApp::new().await;
    let (alice, _bob, conversation) = app.friends_with_conversation().await;
    let sent = app.send_text(&conversation, alice, "hi").await.unwrap();

    let strict = MessageService::new(
        app.state.storage.conversations.clone(),
        app.state.storage.messages.clone(),
        app.state.router.clone(),
        Some(chrono::Duration::zero()),
    );
    tokio::time::sleep(Duration::from_millis(5)).await;

    let err = strict
        .edit_message(sent.message.id, alice, "too late".into())
        .await
        .unwrap_err();
    assert_eq!(err, AppError::EditWindowExpired { max_edit_minutes: 0 });
}

#[tokio::test]
async fn test_delete_for_everyone_is_final() {
    let app = TestApp::new().await;
    let (alice, bob, conversation) = app.friends_with_conversation().await;
    let mut a = app.connect(alice).await;
    let mut b = app.connect(bob).await;
    let sent = app.send_text(&conversation, alice, "oops").await.unwrap();
    a.drain();
    b.drain();
    let id = sent.message.id;

    let deleted = app.state.messages.delete_message(id, alice, true).await.unwrap();
    assert!(deleted.deleted_for_everyone);
    assert_eq!(deleted.content, TOMBSTONE_CONTENT);

    for events in [a.drain(), b.drain()] {
        let deletes = named(&events, "messageDeleted");
        assert_eq!(deletes.len(), 1);
        assert_eq!(deletes[0]["data"]["deletedForEveryone"], true);
    }

    let edit = app.state.messages.edit_message(id, alice, "again".into()).await;
    assert_eq!(edit.unwrap_err(), AppError::MessageDeleted);
    let delete = app.state.messages.delete_message(id, alice, false).await;
    assert_eq!(delete.unwrap_err(), AppError::MessageDeleted);
    let react = app.state.messages.react(id, bob, "👍", ReactionAction::Add).await;
    assert_eq!(react.unwrap_err(), AppError::MessageDeleted);
}

#[tokio::test]
async fn test_delete_for_me_only_notifies_requester() {
    let app = TestApp::new().await;
    let (alice, bob, conversation) = app.friends_with_conversation().await;
    let mut a = app.connect(alice).await;
    let mut b = app.connect(bob).await;
    let sent = app.send_text(&conversation, alice, "draft").await.unwrap();
    a.drain();
    b.drain();

    app.state
        .messages
        .delete_message(sent.message.id, alice, false)
        .await
        .unwrap();

    let to_alice = a.drain();
    let deletes = named(&to_alice, "messageDeleted");
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0]["data"]["deletedForMe"], true);
    assert!(b.drain().is_empty());

    let alice_view = app
        .state
        .conversations
        .history(conversation.id, alice, None, None)
        .await
        .unwrap();
    assert!(alice_view.is_empty());
    let bob_view = app
        .state
        .conversations
        .history(conversation.id, bob, None, None)
        .await
        .unwrap();
    assert_eq!(bob_view.len(), 1);
}

#[tokio::test]
async fn test_only_sender_can_delete() {
    let app = TestApp::new().await;
    let (alice, bob, conversation) = app.friends_with_conversation().await;
    let sent = app.send_text(&conversation, alice, "mine").await.unwrap();

    let err = app
        .state
        .messages
        .delete_message(sent.message.id, bob, true)
        .await
        .unwrap_err();
    assert_eq!(err, AppError::Unauthorized);
}

#[tokio::test]
async fn test_reactions_route_full_list() {
    let app = TestApp::new().await;
    let (alice, bob, conversation) = app.friends_with_conversation().await;
    let mut a = app.connect(alice).await;
    let mut b = app.connect(bob).await;
    let sent = app.send_text(&conversation, alice, "party").await.unwrap();
    let id = sent.message.id;
    a.drain();
    b.drain();

    app.state.messages.react(id, alice, "🎉", ReactionAction::Add).await.unwrap();
    let reactions = app
        .state
        .messages
        .react(id, bob, "🎉", ReactionAction::Add)
        .await
        .unwrap();
    assert_eq!(reactions.len(), 1);
    assert_eq!(reactions[0].users, vec![alice, bob]);

    let updates = a.drain();
    let updates = named(&updates, "messageReactionUpdate");
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[1]["data"]["reactions"][0]["users"].as_array().unwrap().len(), 2);
    assert_eq!(named(&b.drain(), "messageReactionUpdate").len(), 2);

    let reactions = app
        .state
        .messages
        .react(id, alice, "🎉", ReactionAction::Remove)
        .await
        .unwrap();
    assert_eq!(reactions[0].users, vec![bob]);
    let reactions = app
        .state
        .messages
        .react(id, bob, "🎉", ReactionAction::Remove)
        .await
        .unwrap();
    assert!(reactions.is_empty());
}

#[tokio::test]
async fn test_reaction_emoji_is_validated() {
    let app = TestApp::new().await;
    let (alice, _bob, conversation) = app.friends_with_conversation().await;
    let sent = app.send_text(&conversation, alice, "hi").await.unwrap();

    let empty = app
        .state
        .messages
        .react(sent.message.id, alice, "", ReactionAction::Add)
        .await;
    assert!(matches!(empty, Err(AppError::BadRequest(_))));

    let long = "x".repeat(21);
    let too_long = app
        .state
        .messages
        .react(sent.message.id, alice, &long, ReactionAction::Add)
        .await;
    assert!(matches!(too_long, Err(AppError::BadRequest(_))));
}
