//! Organiser reconciliation against course chats.

mod common;

use crate::common::{
    add_member, create_course_chat, create_user, enroll, membership, unique_course_id, TestHarness,
};
use chat_core::common::UserId;
use chat_core::domains::chats::activities::reconcile_organisers;
use chat_core::domains::chats::models::{ChatPermission, Membership, Message};
use test_context::test_context;

#[test_context(TestHarness)]
#[tokio::test]
async fn declared_organisers_become_admins(ctx: &TestHarness) {
    let owner = create_user(&ctx.db_pool, "Owner").await.unwrap();
    let lead = create_user(&ctx.db_pool, "Lead").await.unwrap();
    let camper = create_user(&ctx.db_pool, "Camper").await.unwrap();
    let course = unique_course_id();
    let chat_id = create_course_chat(&ctx.db_pool, &course, "Summer camp", owner.id)
        .await
        .unwrap();
    add_member(&ctx.db_pool, chat_id, camper.id, ChatPermission::Guest)
        .await
        .unwrap();

    let report = reconcile_organisers(&course, &[lead.id, camper.id], ctx.deps())
        .await
        .unwrap();
    assert_eq!(report.chat_id, Some(chat_id));
    assert_eq!(report.added, vec![lead.id]);
    assert_eq!(report.promoted, vec![camper.id]);

    for user in [lead.id, camper.id] {
        let m = membership(&ctx.db_pool, chat_id, user).await.unwrap().unwrap();
        assert_eq!(m.permission, ChatPermission::Admin);
        assert!(!m.has_left);
    }

    // Same input again is a fixed point
    let again = reconcile_organisers(&course, &[lead.id, camper.id], ctx.deps())
        .await
        .unwrap();
    assert!(again.is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn retired_organiser_leaves_unless_enrolled(ctx: &TestHarness) {
    let owner = create_user(&ctx.db_pool, "Owner").await.unwrap();
    let lead = create_user(&ctx.db_pool, "Lead").await.unwrap();
    let helper = create_user(&ctx.db_pool, "Helper").await.unwrap();
    let course = unique_course_id();
    let chat_id = create_course_chat(&ctx.db_pool, &course, "Summer camp", owner.id)
        .await
        .unwrap();
    enroll(&ctx.db_pool, &course, helper.id).await.unwrap();

    reconcile_organisers(&course, &[lead.id, helper.id], ctx.deps())
        .await
        .unwrap();
    let messages_before = Message::find_by_chat(chat_id, &ctx.db_pool).await.unwrap().len();

    let report = reconcile_organisers(&course, &[], ctx.deps()).await.unwrap();
    assert_eq!(report.removed, vec![lead.id]);
    assert_eq!(report.downgraded, vec![helper.id]);

    assert!(membership(&ctx.db_pool, chat_id, lead.id).await.unwrap().is_none());
    let helper_membership = membership(&ctx.db_pool, chat_id, helper.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(helper_membership.permission, ChatPermission::Guest);

    // The owner is never touched
    let owner_membership = membership(&ctx.db_pool, chat_id, owner.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(owner_membership.permission, ChatPermission::Owner);

    // One "left the group" notice for the removal only
    let messages_after = Message::find_by_chat(chat_id, &ctx.db_pool).await.unwrap().len();
    assert_eq!(messages_after, messages_before + 1);

    assert!(reconcile_organisers(&course, &[], ctx.deps())
        .await
        .unwrap()
        .is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn unknown_course_and_users_are_skipped(ctx: &TestHarness) {
    let report = reconcile_organisers(&unique_course_id(), &[UserId::new()], ctx.deps())
        .await
        .unwrap();
    assert!(report.chat_id.is_none());
    assert!(report.is_empty());

    let owner = create_user(&ctx.db_pool, "Owner").await.unwrap();
    let course = unique_course_id();
    let chat_id = create_course_chat(&ctx.db_pool, &course, "Winter camp", owner.id)
        .await
        .unwrap();

    let report = reconcile_organisers(&course, &[UserId::new()], ctx.deps())
        .await
        .unwrap();
    assert!(report.is_empty());
    assert_eq!(
        Membership::find_for_chat(chat_id, &ctx.db_pool).await.unwrap().len(),
        1
    );
}
