use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

use crate::common::{ChatId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "chat_type", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatType {
    OneToOne,
    Group,
    Emergency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "chat_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatStatus {
    Open,
    Closed,
    Archived,
}

/// Chat - a conversation between members
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Chat {
    pub id: ChatId,
    pub name: Option<String>,
    pub chat_type: ChatType,
    pub status: ChatStatus,
    pub course_id: Option<String>,
    pub private_pair_key: Option<String>,
    pub last_activity_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fields for a new chat row
#[derive(Debug, Clone)]
pub struct NewChat {
    pub name: Option<String>,
    pub chat_type: ChatType,
    pub course_id: Option<String>,
    pub private_pair_key: Option<String>,
}

/// Order-independent key for a two-person chat, `"low:high"`.
pub fn private_pair_key(a: UserId, b: UserId) -> String {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    format!("{}:{}", low, high)
}

impl Chat {
    pub fn is_archived(&self) -> bool {
        self.status == ChatStatus::Archived
    }

    pub async fn find_by_id(id: ChatId, pool: &PgPool) -> Result<Option<Self>> {
        let chat = sqlx::query_as::<_, Chat>("SELECT * FROM chats WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(chat)
    }

    /// Lock the chat row for the rest of the transaction
    pub async fn find_by_id_for_update(id: ChatId, conn: &mut PgConnection) -> Result<Option<Self>> {
        let chat = sqlx::query_as::<_, Chat>("SELECT * FROM chats WHERE id = $1 FOR NO KEY UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(chat)
    }

    pub async fn find_by_course_id(course_id: &str, pool: &PgPool) -> Result<Option<Self>> {
        let chat = sqlx::query_as::<_, Chat>("SELECT * FROM chats WHERE course_id = $1")
            .bind(course_id)
            .fetch_optional(pool)
            .await?;
        Ok(chat)
    }

    /// Find the private chat for a member pair.
    ///
    /// A live chat always wins over an archived one; with `include_archived`
    /// the most recent archived chat is returned when no live one exists.
    pub async fn find_private(
        pair_key: &str,
        include_archived: bool,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        let chat = sqlx::query_as::<_, Chat>(
            r#"
            SELECT * FROM chats
            WHERE private_pair_key = $1
              AND chat_type = 'one_to_one'
              AND ($2 OR status <> 'archived')
            ORDER BY (status = 'archived'), created_at DESC
            LIMIT 1
            "#,
        )
        .bind(pair_key)
        .bind(include_archived)
        .fetch_optional(pool)
        .await?;
        Ok(chat)
    }

    /// Chats the user is an active member of, most recently active first
    pub async fn find_active_for_user(user_id: UserId, pool: &PgPool) -> Result<Vec<Self>> {
        let chats = sqlx::query_as::<_, Chat>(
            r#"
            SELECT c.* FROM chats c
            JOIN chat_memberships m ON m.chat_id = c.id
            WHERE m.user_id = $1 AND m.has_left = FALSE
            ORDER BY c.last_activity_at DESC, c.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(chats)
    }

    pub async fn insert(new: NewChat, conn: &mut PgConnection) -> Result<Self> {
        let chat = sqlx::query_as::<_, Chat>(
            r#"
            INSERT INTO chats (id, name, chat_type, course_id, private_pair_key)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(ChatId::new())
        .bind(new.name)
        .bind(new.chat_type)
        .bind(new.course_id)
        .bind(new.private_pair_key)
        .fetch_one(conn)
        .await?;
        Ok(chat)
    }

    pub async fn touch_activity(id: ChatId, conn: &mut PgConnection) -> Result<()> {
        sqlx::query("UPDATE chats SET last_activity_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Move the chat to ARCHIVED. Returns false if it already was.
    pub async fn mark_archived(id: ChatId, conn: &mut PgConnection) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE chats
            SET status = 'archived', archived_at = NOW(), last_activity_at = NOW()
            WHERE id = $1 AND status <> 'archived'
            "#,
        )
        .bind(id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn rename(id: ChatId, name: &str, conn: &mut PgConnection) -> Result<Self> {
        let chat = sqlx::query_as::<_, Chat>(
            r#"
            UPDATE chats
            SET name = $2, last_activity_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_one(conn)
        .await?;
        Ok(chat)
    }
}
