//! End-to-end tests through the HTTP router.

mod common;

use crate::common::{
    create_course_chat, create_user, unique_course_id, TestHarness, TEST_INTERNAL_TOKEN,
};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chat_core::common::{ChatId, UserId};
use chat_core::domains::chats::models::{ChatPermission, User};
use serde_json::json;
use test_context::test_context;
use tower::ServiceExt;

#[test_context(TestHarness)]
#[tokio::test]
async fn chat_round_trip_over_rpc(ctx: &TestHarness) {
    let alice = create_user(&ctx.db_pool, "Alice").await.unwrap();
    let bob = create_user(&ctx.db_pool, "Bob").await.unwrap();
    let alice_token = ctx.token(alice.id, "Alice", false);
    let bob_token = ctx.token(bob.id, "Bob", false);

    let (status, body) = ctx
        .post_json(
            "/rpc/createChat",
            Some(&alice_token),
            json!({ "memberIds": [bob.id] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let chat_id = body["chatId"].as_str().unwrap().to_string();

    let (status, body) = ctx
        .post_json(
            "/rpc/postMessage",
            Some(&alice_token),
            json!({ "chatId": chat_id, "content": "campfire at 8" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let message_id = body["messageId"].as_str().unwrap().to_string();

    let (status, body) = ctx
        .post_json(
            "/rpc/markRead",
            Some(&bob_token),
            json!({ "messageId": message_id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "recorded");

    let (status, body) = ctx
        .post_json(
            "/rpc/listMessages",
            Some(&alice_token),
            json!({ "chatId": chat_id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().unwrap();
    let posted = items
        .iter()
        .find(|m| m["id"] == message_id.as_str())
        .unwrap();
    assert_eq!(posted["status"], "READ");
    assert_eq!(posted["messageType"], "TEXT");

    let (status, body) = ctx
        .post_json(
            "/rpc/getMessage",
            Some(&alice_token),
            json!({ "messageId": message_id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], message_id.as_str());
    assert_eq!(body["status"], "READ");
    assert_eq!(body["payload"]["text"], "campfire at 8");

    // Outsiders cannot tell the message exists
    let carol = create_user(&ctx.db_pool, "Carol").await.unwrap();
    let (status, _) = ctx
        .post_json(
            "/rpc/getMessage",
            Some(&ctx.token(carol.id, "Carol", false)),
            json!({ "messageId": message_id }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = ctx
        .post_json("/rpc/listChats", Some(&bob_token), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let entry = body["chats"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == chat_id.as_str())
        .unwrap();
    assert_eq!(entry["name"], "Alice");
    assert_eq!(entry["chatType"], "ONE_TO_ONE");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn errors_map_to_status_codes(ctx: &TestHarness) {
    let alice = create_user(&ctx.db_pool, "Alice").await.unwrap();
    let token = ctx.token(alice.id, "Alice", false);

    let (status, body) = ctx
        .post_json(
            "/rpc/createChat",
            Some(&token),
            json!({ "memberIds": [alice.id] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let (status, body) = ctx
        .post_json(
            "/rpc/getChat",
            Some(&token),
            json!({ "chatId": ChatId::new() }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = ctx
        .post_json("/rpc/listChats", Some("not-a-jwt"), json!({}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn authenticated_requests_refresh_presence(ctx: &TestHarness) {
    let user_id = UserId::new();
    let token = ctx.token(user_id, "Newcomer", false);

    let (status, body) = ctx
        .post_json("/rpc/onlinePing", Some(&token), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["userId"], user_id.to_string());

    // The token alone is enough to create the user row
    let user = User::find_by_id(user_id, &ctx.db_pool).await.unwrap().unwrap();
    assert_eq!(user.name, "Newcomer");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn raise_alert_uses_request_locale(ctx: &TestHarness) {
    let user_id = UserId::new();
    let token = ctx.token(user_id, "Robin", false);

    let (status, body) = ctx
        .post_json(
            "/rpc/raiseAlert",
            Some(&token),
            json!({ "location": { "latitude": 46.9, "longitude": 7.4 }, "locale": "en" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let chat_id = body["chatId"].as_str().unwrap().to_string();

    let (status, body) = ctx
        .post_json("/rpc/getChat", Some(&token), json!({ "chatId": chat_id }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["chatType"], "EMERGENCY");
    assert_eq!(body["name"], "Emergency from Robin");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn organisers_changed_hook(ctx: &TestHarness) {
    let owner = create_user(&ctx.db_pool, "Owner").await.unwrap();
    let lead = create_user(&ctx.db_pool, "Lead").await.unwrap();
    let course = unique_course_id();
    let chat_id = create_course_chat(&ctx.db_pool, &course, "Camp", owner.id)
        .await
        .unwrap();

    let request = Request::post("/internal/organisers-changed")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-internal-token", TEST_INTERNAL_TOKEN)
        .body(Body::from(
            json!({ "courseId": course, "organiserIds": [lead.id] }).to_string(),
        ))
        .unwrap();
    let response = ctx.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let report: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(report["chatId"], chat_id.to_string());
    assert_eq!(report["added"], json!([lead.id]));

    let m = crate::common::membership(&ctx.db_pool, chat_id, lead.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(m.permission, ChatPermission::Admin);

    // A user token is not the internal token
    let token = ctx.token(owner.id, "Owner", true);
    let (status, _) = ctx
        .post_json(
            "/internal/organisers-changed",
            Some(&token),
            json!({ "courseId": course, "organiserIds": [] }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
