//! Chat creation: validation, private-chat dedup and the creation race.

mod common;

use crate::common::{create_user, TestHarness};
use chat_core::common::{ChatCapability, UserId};
use chat_core::domains::chats::activities::{archive_chat, create_chat};
use chat_core::domains::chats::models::{
    private_pair_key, Chat, ChatPermission, ChatType, Membership, Message,
};
use chat_core::domains::chats::ChatError;
use chat_core::kernel::test_dependencies::StaticCapabilityService;
use chat_core::kernel::TestDependencies;
use test_context::test_context;

#[test_context(TestHarness)]
#[tokio::test]
async fn private_chat_is_created_once_per_pair(ctx: &TestHarness) {
    let alice = create_user(&ctx.db_pool, "Alice").await.unwrap();
    let bob = create_user(&ctx.db_pool, "Bob").await.unwrap();

    let first = create_chat(&alice, vec![bob.id], None, false, ctx.deps())
        .await
        .unwrap();
    // Order of the pair does not matter
    let second = create_chat(&bob, vec![alice.id], None, false, ctx.deps())
        .await
        .unwrap();
    assert_eq!(first, second);

    let chat = Chat::find_by_id(first, &ctx.db_pool).await.unwrap().unwrap();
    assert_eq!(chat.chat_type, ChatType::OneToOne);
    assert!(chat.name.is_none());

    let memberships = Membership::find_for_chat(first, &ctx.db_pool).await.unwrap();
    assert_eq!(memberships.len(), 2);
    let owner = memberships.iter().find(|m| m.user_id == alice.id).unwrap();
    assert_eq!(owner.permission, ChatPermission::Owner);
    let guest = memberships.iter().find(|m| m.user_id == bob.id).unwrap();
    assert_eq!(guest.permission, ChatPermission::Guest);

    // Only the "New chat created" system message
    let messages = Message::find_by_chat(first, &ctx.db_pool).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].sender_id.is_none());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn concurrent_private_creation_yields_one_chat(ctx: &TestHarness) {
    let alice = create_user(&ctx.db_pool, "Alice").await.unwrap();
    let bob = create_user(&ctx.db_pool, "Bob").await.unwrap();

    let deps = ctx.deps();
    let (a, b) = tokio::join!(
        create_chat(&alice, vec![bob.id], None, false, deps),
        create_chat(&bob, vec![alice.id], None, false, deps),
    );
    assert_eq!(a.unwrap(), b.unwrap());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn archived_private_chat_is_replaced(ctx: &TestHarness) {
    let alice = create_user(&ctx.db_pool, "Alice").await.unwrap();
    let bob = create_user(&ctx.db_pool, "Bob").await.unwrap();

    let original = create_chat(&alice, vec![bob.id], None, false, ctx.deps())
        .await
        .unwrap();
    archive_chat(original, alice.id, ctx.deps()).await.unwrap();

    let fresh = create_chat(&alice, vec![bob.id], None, false, ctx.deps())
        .await
        .unwrap();
    assert_ne!(original, fresh);

    // Archived chats are found again only by admins asking for them
    let for_admin = create_chat(&alice.clone().admin(), vec![bob.id], None, true, ctx.deps())
        .await
        .unwrap();
    assert_eq!(for_admin, fresh);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn admin_can_recover_archived_private_chat(ctx: &TestHarness) {
    let alice = create_user(&ctx.db_pool, "Alice").await.unwrap();
    let bob = create_user(&ctx.db_pool, "Bob").await.unwrap();

    let original = create_chat(&alice, vec![bob.id], None, false, ctx.deps())
        .await
        .unwrap();
    archive_chat(original, alice.id, ctx.deps()).await.unwrap();

    // Only the archived chat exists for the pair
    let for_admin = create_chat(&alice.clone().admin(), vec![bob.id], None, true, ctx.deps())
        .await
        .unwrap();
    assert_eq!(for_admin, original);
    let chat = Chat::find_by_id(for_admin, &ctx.db_pool).await.unwrap().unwrap();
    assert!(chat.is_archived());

    // Non-admins asking for archived chats get a fresh one instead
    let fresh = create_chat(&bob, vec![alice.id], None, true, ctx.deps())
        .await
        .unwrap();
    assert_ne!(fresh, original);
    let chat = Chat::find_by_id(fresh, &ctx.db_pool).await.unwrap().unwrap();
    assert!(!chat.is_archived());
}

#[tokio::test]
async fn disabled_creation_is_forbidden() {
    let test_deps = TestDependencies::new().mock_capabilities(
        StaticCapabilityService::default().with_global(ChatCapability::CreateChat, false),
    );
    let ctx = TestHarness::with_dependencies(test_deps).await.unwrap();

    let alice = create_user(&ctx.db_pool, "Alice").await.unwrap();
    let bob = create_user(&ctx.db_pool, "Bob").await.unwrap();

    let result = create_chat(&alice, vec![bob.id], None, false, ctx.deps()).await;
    assert!(matches!(result, Err(ChatError::Forbidden(_))));

    let key = private_pair_key(alice.id, bob.id);
    let stored = Chat::find_private(&key, true, &ctx.db_pool).await.unwrap();
    assert!(stored.is_none());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn group_chat_requires_name(ctx: &TestHarness) {
    let alice = create_user(&ctx.db_pool, "Alice").await.unwrap();
    let bob = create_user(&ctx.db_pool, "Bob").await.unwrap();
    let carol = create_user(&ctx.db_pool, "Carol").await.unwrap();

    let result = create_chat(&alice, vec![bob.id, carol.id], None, false, ctx.deps()).await;
    assert!(matches!(result, Err(ChatError::BadRequest(_))));

    let chat_id = create_chat(
        &alice,
        vec![bob.id, carol.id],
        Some("  Camp Crew ".to_string()),
        false,
        ctx.deps(),
    )
    .await
    .unwrap();
    let chat = Chat::find_by_id(chat_id, &ctx.db_pool).await.unwrap().unwrap();
    assert_eq!(chat.chat_type, ChatType::Group);
    assert_eq!(chat.name.as_deref(), Some("Camp Crew"));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn unknown_members_are_not_found(ctx: &TestHarness) {
    let alice = create_user(&ctx.db_pool, "Alice").await.unwrap();

    let result = create_chat(&alice, vec![UserId::new()], None, false, ctx.deps()).await;
    assert!(matches!(result, Err(ChatError::NotFound(_))));
}
