//! Emergency alerts: chat setup, the question interview and archiving.

mod common;

use crate::common::{create_user, TestHarness};
use chat_core::common::{ChatCapability, ChatId, MessageId};
use chat_core::domains::chats::activities::{
    archive_chat, get_chat, raise_alert, update_message_content, AlertLocation, RevisionOutcome,
};
use chat_core::domains::chats::models::{
    Chat, ChatPermission, ChatType, Membership, Message, MessageContentVersion, MessageType,
};
use chat_core::domains::chats::{ChatError, ChatUser};
use serde_json::{json, Value as JsonValue};
use test_context::test_context;

async fn pending(ctx: &TestHarness, chat: ChatId) -> i64 {
    Message::count_pending_questions(chat, &ctx.db_pool)
        .await
        .unwrap()
}

/// The newest unanswered question in the chat and its payload
async fn open_question(ctx: &TestHarness, chat: ChatId) -> (MessageId, JsonValue) {
    let messages = Message::find_by_chat(chat, &ctx.db_pool).await.unwrap();
    let question = messages
        .iter()
        .rev()
        .find(|m| m.message_type == MessageType::AlertQuestion)
        .expect("no alert question");
    let payload = MessageContentVersion::find_latest_payload(question.id, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    (question.id, payload)
}

async fn answer(
    ctx: &TestHarness,
    user: &ChatUser,
    question: MessageId,
    question_ref: &str,
    option_id: &str,
) -> Result<RevisionOutcome, ChatError> {
    update_message_content(
        question,
        user,
        json!({ "questionRefId": question_ref, "selectedOptionId": option_id }),
        "en",
        ctx.deps(),
    )
    .await
}

#[test_context(TestHarness)]
#[tokio::test]
async fn raise_alert_opens_emergency_chat(ctx: &TestHarness) {
    let camper = create_user(&ctx.db_pool, "Robin").await.unwrap();

    let chat_id = raise_alert(
        &camper,
        Some(AlertLocation {
            latitude: 47.37,
            longitude: 8.54,
        }),
        "en",
        ctx.deps(),
    )
    .await
    .unwrap();

    let chat = Chat::find_by_id(chat_id, &ctx.db_pool).await.unwrap().unwrap();
    assert_eq!(chat.chat_type, ChatType::Emergency);
    assert_eq!(chat.name.as_deref(), Some("Emergency from Robin"));

    let memberships = Membership::find_for_chat(chat_id, &ctx.db_pool).await.unwrap();
    assert_eq!(memberships.len(), 1);
    assert_eq!(memberships[0].permission, ChatPermission::Owner);

    let types: Vec<MessageType> = Message::find_by_chat(chat_id, &ctx.db_pool)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.message_type)
        .collect();
    assert_eq!(
        types,
        vec![
            MessageType::System,
            MessageType::Location,
            MessageType::AlertQuestion
        ]
    );

    let (_, question) = open_question(ctx, chat_id).await;
    assert_eq!(question["questionRefId"], "q-injured");
    assert!(question["selectedOption"].is_null());

    // Messaging is switched on for the emergency chat regardless of defaults
    let details = get_chat(chat_id, camper.id, ctx.deps()).await.unwrap();
    assert!(details
        .capabilities
        .iter()
        .any(|c| c.capability == ChatCapability::SendMessages && c.enabled));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn raise_alert_rejects_bad_location(ctx: &TestHarness) {
    let camper = create_user(&ctx.db_pool, "Robin").await.unwrap();

    let result = raise_alert(
        &camper,
        Some(AlertLocation {
            latitude: 123.0,
            longitude: 8.0,
        }),
        "en",
        ctx.deps(),
    )
    .await;
    assert!(matches!(result, Err(ChatError::BadRequest(_))));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn interview_branches_then_finishes(ctx: &TestHarness) {
    let camper = create_user(&ctx.db_pool, "Robin").await.unwrap();
    let chat_id = raise_alert(&camper, None, "en", ctx.deps()).await.unwrap();
    let before = Message::find_by_chat(chat_id, &ctx.db_pool).await.unwrap().len();
    assert_eq!(pending(ctx, chat_id).await, 1);

    // "Yes, injured" branches to the ambulance question
    let (question, _) = open_question(ctx, chat_id).await;
    let outcome = answer(ctx, &camper, question, "q-injured", "q-injured-yes")
        .await
        .unwrap();
    assert_eq!(outcome.revision, 1);
    assert_eq!(outcome.follow_up_type, Some(MessageType::AlertQuestion));

    let answered = MessageContentVersion::find_latest_payload(question, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(answered["selectedOption"], "Yes");
    assert_eq!(answered["question"], "Are you injured?");

    // Exactly one new message per answer
    let after = Message::find_by_chat(chat_id, &ctx.db_pool).await.unwrap().len();
    assert_eq!(after, before + 1);
    assert_eq!(pending(ctx, chat_id).await, 1);

    let (ambulance, payload) = open_question(ctx, chat_id).await;
    assert_eq!(payload["questionRefId"], "q-ambulance");
    answer(ctx, &camper, ambulance, "q-ambulance", "q-ambulance-no")
        .await
        .unwrap();
    assert_eq!(pending(ctx, chat_id).await, 1);

    let (can_move, payload) = open_question(ctx, chat_id).await;
    assert_eq!(payload["questionRefId"], "q-can-move");
    let outcome = answer(ctx, &camper, can_move, "q-can-move", "q-can-move-yes")
        .await
        .unwrap();
    assert_eq!(outcome.follow_up_type, Some(MessageType::AlertResponse));
    assert_eq!(pending(ctx, chat_id).await, 0);

    let response_id = outcome.follow_up_message_id.unwrap();
    let response = MessageContentVersion::find_latest_payload(response_id, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    assert!(response["phoneNumber"].is_string());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn question_cannot_be_answered_twice(ctx: &TestHarness) {
    let camper = create_user(&ctx.db_pool, "Robin").await.unwrap();
    let chat_id = raise_alert(&camper, None, "en", ctx.deps()).await.unwrap();
    let (question, _) = open_question(ctx, chat_id).await;

    answer(ctx, &camper, question, "q-injured", "q-injured-no")
        .await
        .unwrap();
    let second = answer(ctx, &camper, question, "q-injured", "q-injured-yes").await;
    assert!(matches!(second, Err(ChatError::Conflict(_))));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn concurrent_answers_write_one_follow_up(ctx: &TestHarness) {
    let camper = create_user(&ctx.db_pool, "Robin").await.unwrap();
    let chat_id = raise_alert(&camper, None, "en", ctx.deps()).await.unwrap();
    let (question, _) = open_question(ctx, chat_id).await;
    let before = Message::find_by_chat(chat_id, &ctx.db_pool).await.unwrap().len();

    let (a, b) = tokio::join!(
        answer(ctx, &camper, question, "q-injured", "q-injured-no"),
        answer(ctx, &camper, question, "q-injured", "q-injured-yes"),
    );
    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);

    let after = Message::find_by_chat(chat_id, &ctx.db_pool).await.unwrap().len();
    assert_eq!(after, before + 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn answer_requires_question_ref(ctx: &TestHarness) {
    let camper = create_user(&ctx.db_pool, "Robin").await.unwrap();
    let chat_id = raise_alert(&camper, None, "en", ctx.deps()).await.unwrap();
    let (question, _) = open_question(ctx, chat_id).await;

    let result = update_message_content(
        question,
        &camper,
        json!({ "selectedOption": "Yes" }),
        "en",
        ctx.deps(),
    )
    .await;
    assert!(matches!(result, Err(ChatError::BadRequest(_))));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn answer_cannot_claim_a_later_question(ctx: &TestHarness) {
    let camper = create_user(&ctx.db_pool, "Robin").await.unwrap();
    let chat_id = raise_alert(&camper, None, "en", ctx.deps()).await.unwrap();
    let (question, _) = open_question(ctx, chat_id).await;
    let before = Message::find_by_chat(chat_id, &ctx.db_pool).await.unwrap().len();

    // Answering the first question while naming the last one would end the interview
    let result = answer(ctx, &camper, question, "q-can-move", "q-injured-no").await;
    assert!(matches!(result, Err(ChatError::BadRequest(_))));

    let stored = MessageContentVersion::find_latest_payload(question, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored["questionRefId"], "q-injured");
    assert!(stored["selectedOption"].is_null());

    let after = Message::find_by_chat(chat_id, &ctx.db_pool).await.unwrap().len();
    assert_eq!(after, before);
    assert_eq!(pending(ctx, chat_id).await, 1);

    // The honest answer still moves on to the next question
    let outcome = answer(ctx, &camper, question, "q-injured", "q-injured-no")
        .await
        .unwrap();
    assert_eq!(outcome.follow_up_type, Some(MessageType::AlertQuestion));
    let (_, next) = open_question(ctx, chat_id).await;
    assert_eq!(next["questionRefId"], "q-ambulance");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn any_member_may_archive_an_emergency(ctx: &TestHarness) {
    let camper = create_user(&ctx.db_pool, "Robin").await.unwrap();
    let counsellor = create_user(&ctx.db_pool, "Sam").await.unwrap();
    let chat_id = raise_alert(&camper, None, "en", ctx.deps()).await.unwrap();
    crate::common::add_member(&ctx.db_pool, chat_id, counsellor.id, ChatPermission::Guest)
        .await
        .unwrap();

    let outcome = archive_chat(chat_id, counsellor.id, ctx.deps()).await.unwrap();
    assert!(!outcome.already_archived);

    let chat = Chat::find_by_id(chat_id, &ctx.db_pool).await.unwrap().unwrap();
    assert!(chat.is_archived());
}
