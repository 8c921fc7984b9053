use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

use crate::common::{ChatId, UserId};

/// Membership tier, ordered OWNER > ADMIN > GUEST
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "chat_permission", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatPermission {
    Owner,
    Admin,
    Guest,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub permission: ChatPermission,
    pub has_left: bool,
    pub joined_at: DateTime<Utc>,
}

/// Membership joined with the user's profile
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Participant {
    pub user_id: UserId,
    pub name: String,
    pub permission: ChatPermission,
    pub has_left: bool,
    pub last_seen_at: DateTime<Utc>,
}

impl Membership {
    pub async fn find_for_chat(chat_id: ChatId, pool: &PgPool) -> Result<Vec<Self>> {
        let memberships = sqlx::query_as::<_, Membership>(
            "SELECT * FROM chat_memberships WHERE chat_id = $1 ORDER BY joined_at",
        )
        .bind(chat_id)
        .fetch_all(pool)
        .await?;
        Ok(memberships)
    }

    /// Same as `find_for_chat`, inside an open transaction
    pub async fn find_for_chat_in(chat_id: ChatId, conn: &mut PgConnection) -> Result<Vec<Self>> {
        let memberships = sqlx::query_as::<_, Membership>(
            "SELECT * FROM chat_memberships WHERE chat_id = $1 ORDER BY joined_at",
        )
        .bind(chat_id)
        .fetch_all(conn)
        .await?;
        Ok(memberships)
    }

    pub async fn find(
        chat_id: ChatId,
        user_id: UserId,
        conn: &mut PgConnection,
    ) -> Result<Option<Self>> {
        let membership = sqlx::query_as::<_, Membership>(
            "SELECT * FROM chat_memberships WHERE chat_id = $1 AND user_id = $2 FOR NO KEY UPDATE",
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
        Ok(membership)
    }

    pub async fn insert(
        chat_id: ChatId,
        user_id: UserId,
        permission: ChatPermission,
        conn: &mut PgConnection,
    ) -> Result<Self> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO chat_memberships (chat_id, user_id, permission)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(permission)
        .fetch_one(conn)
        .await?;
        Ok(membership)
    }

    /// Set the tier and clear `has_left`
    pub async fn set_permission(
        chat_id: ChatId,
        user_id: UserId,
        permission: ChatPermission,
        conn: &mut PgConnection,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE chat_memberships
            SET permission = $3, has_left = FALSE
            WHERE chat_id = $1 AND user_id = $2
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(permission)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn mark_left(chat_id: ChatId, user_id: UserId, conn: &mut PgConnection) -> Result<()> {
        sqlx::query(
            "UPDATE chat_memberships SET has_left = TRUE WHERE chat_id = $1 AND user_id = $2",
        )
        .bind(chat_id)
        .bind(user_id)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn delete(chat_id: ChatId, user_id: UserId, conn: &mut PgConnection) -> Result<()> {
        sqlx::query("DELETE FROM chat_memberships WHERE chat_id = $1 AND user_id = $2")
            .bind(chat_id)
            .bind(user_id)
            .execute(conn)
            .await?;
        Ok(())
    }
}

impl Participant {
    pub async fn find_for_chat(chat_id: ChatId, pool: &PgPool) -> Result<Vec<Self>> {
        let participants = sqlx::query_as::<_, Participant>(
            r#"
            SELECT m.user_id, u.name, m.permission, m.has_left, u.last_seen_at
            FROM chat_memberships m
            JOIN users u ON u.id = m.user_id
            WHERE m.chat_id = $1
            ORDER BY m.joined_at, u.name
            "#,
        )
        .bind(chat_id)
        .fetch_all(pool)
        .await?;
        Ok(participants)
    }
}
