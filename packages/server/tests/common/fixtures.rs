//! Test fixtures for creating test data.
//!
//! These fixtures use the model methods directly to create test data.

use anyhow::Result;
use chat_core::common::{ChatId, UserId};
use chat_core::domains::chats::models::{
    Chat, ChatPermission, ChatType, Enrollment, Membership, NewChat, User,
};
use chat_core::domains::chats::ChatUser;
use sqlx::PgPool;
use uuid::Uuid;

/// Create a user row with a fresh id
pub async fn create_user(pool: &PgPool, name: &str) -> Result<ChatUser> {
    let id = UserId::new();
    User::upsert_seen(id, name, pool).await?;
    Ok(ChatUser::new(id, name))
}

/// Course id that no other test uses
pub fn unique_course_id() -> String {
    format!("course-{}", Uuid::new_v4())
}

/// Create a course GROUP chat owned by `owner`, the way the course system does
pub async fn create_course_chat(
    pool: &PgPool,
    course_id: &str,
    name: &str,
    owner: UserId,
) -> Result<ChatId> {
    let mut tx = pool.begin().await?;
    let chat = Chat::insert(
        NewChat {
            name: Some(name.to_string()),
            chat_type: ChatType::Group,
            course_id: Some(course_id.to_string()),
            private_pair_key: None,
        },
        &mut *tx,
    )
    .await?;
    Membership::insert(chat.id, owner, ChatPermission::Owner, &mut *tx).await?;
    tx.commit().await?;
    Ok(chat.id)
}

/// Add a membership row directly
pub async fn add_member(
    pool: &PgPool,
    chat_id: ChatId,
    user_id: UserId,
    permission: ChatPermission,
) -> Result<()> {
    let mut conn = pool.acquire().await?;
    Membership::insert(chat_id, user_id, permission, &mut *conn).await?;
    Ok(())
}

pub async fn enroll(pool: &PgPool, course_id: &str, user_id: UserId) -> Result<()> {
    Enrollment::enroll(course_id, user_id, pool).await
}

/// Membership of one user in a chat, if any
pub async fn membership(pool: &PgPool, chat_id: ChatId, user_id: UserId) -> Result<Option<Membership>> {
    Ok(Membership::find_for_chat(chat_id, pool)
        .await?
        .into_iter()
        .find(|m| m.user_id == user_id))
}
