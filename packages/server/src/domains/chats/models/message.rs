use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{PgConnection, PgPool};

use crate::common::{ChatId, MessageId, UserId, ValidatedPageArgs};

/// Closed set of message kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "message_type", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Text,
    Image,
    Location,
    System,
    AlertQuestion,
    AlertResponse,
}

impl MessageType {
    /// Types a client may post directly; the rest are written by the core
    pub fn is_client_postable(&self) -> bool {
        match self {
            MessageType::Text | MessageType::Image => true,
            MessageType::Location
            | MessageType::System
            | MessageType::AlertQuestion
            | MessageType::AlertResponse => false,
        }
    }
}

/// Message - immutable envelope; the payload lives in content versions
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub sender_id: Option<UserId>,
    pub message_type: MessageType,
    pub parent_id: Option<MessageId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub chat_id: ChatId,
    pub sender_id: Option<UserId>,
    pub message_type: MessageType,
    pub parent_id: Option<MessageId>,
    /// Explicit timestamp, for messages that must sort in a fixed order
    pub created_at: Option<DateTime<Utc>>,
}

/// A message with its latest payload and thread counters, as listed to a viewer
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MessageWithContent {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub sender_id: Option<UserId>,
    pub message_type: MessageType,
    pub parent_id: Option<MessageId>,
    pub created_at: DateTime<Utc>,
    pub payload: Option<JsonValue>,
    pub revision: Option<i32>,
    pub reply_count: i64,
    pub has_unread_replies: bool,
}

// Shared projection for MessageWithContent; $1 is always the viewer
const WITH_CONTENT_SELECT: &str = r#"
    SELECT m.id, m.chat_id, m.sender_id, m.message_type, m.parent_id, m.created_at,
           v.payload, v.revision,
           (SELECT COUNT(*) FROM messages r WHERE r.parent_id = m.id) AS reply_count,
           EXISTS (
               SELECT 1 FROM messages r
               WHERE r.parent_id = m.id
                 AND r.sender_id IS DISTINCT FROM $1
                 AND NOT EXISTS (
                     SELECT 1 FROM message_events e
                     WHERE e.message_id = r.id AND e.event_type = 'read' AND e.user_id = $1
                 )
           ) AS has_unread_replies
    FROM messages m
    LEFT JOIN LATERAL (
        SELECT payload, revision FROM message_content_versions
        WHERE message_id = m.id
        ORDER BY revision DESC
        LIMIT 1
    ) v ON TRUE
"#;

impl Message {
    pub async fn find_by_id(id: MessageId, pool: &PgPool) -> Result<Option<Self>> {
        let message = sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(message)
    }

    /// Lock the message row; serialises concurrent answers to one alert question
    pub async fn find_by_id_for_update(
        id: MessageId,
        conn: &mut PgConnection,
    ) -> Result<Option<Self>> {
        let message =
            sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = $1 FOR NO KEY UPDATE")
                .bind(id)
                .fetch_optional(conn)
                .await?;
        Ok(message)
    }

    pub async fn insert(new: NewMessage, conn: &mut PgConnection) -> Result<Self> {
        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (id, chat_id, sender_id, message_type, parent_id, created_at)
            VALUES ($1, $2, $3, $4, $5, COALESCE($6, clock_timestamp()))
            RETURNING *
            "#,
        )
        .bind(MessageId::new())
        .bind(new.chat_id)
        .bind(new.sender_id)
        .bind(new.message_type)
        .bind(new.parent_id)
        .bind(new.created_at)
        .fetch_one(conn)
        .await?;
        Ok(message)
    }

    /// One page of a chat's root messages (or of one thread), newest first.
    ///
    /// Fetches `args.fetch_limit()` rows so the caller can tell whether an
    /// older page exists.
    pub async fn find_page(
        chat_id: ChatId,
        parent_id: Option<MessageId>,
        viewer: UserId,
        args: &ValidatedPageArgs,
        pool: &PgPool,
    ) -> Result<Vec<MessageWithContent>> {
        let sql = format!(
            r#"
            {}
            WHERE m.chat_id = $2
              AND (($3::uuid IS NULL AND m.parent_id IS NULL) OR m.parent_id = $3)
              AND (
                  $4::uuid IS NULL
                  OR (m.created_at, m.id) < (SELECT c.created_at, c.id FROM messages c WHERE c.id = $4)
              )
            ORDER BY m.created_at DESC, m.id DESC
            LIMIT $5
            "#,
            WITH_CONTENT_SELECT
        );

        let rows = sqlx::query_as::<_, MessageWithContent>(&sql)
            .bind(viewer)
            .bind(chat_id)
            .bind(parent_id)
            .bind(args.cursor)
            .bind(args.fetch_limit())
            .fetch_all(pool)
            .await?;
        Ok(rows)
    }

    pub async fn find_with_content(
        id: MessageId,
        viewer: UserId,
        pool: &PgPool,
    ) -> Result<Option<MessageWithContent>> {
        let sql = format!("{} WHERE m.id = $2", WITH_CONTENT_SELECT);
        let row = sqlx::query_as::<_, MessageWithContent>(&sql)
            .bind(viewer)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row)
    }

    /// Latest message of each chat in `chat_ids`
    pub async fn find_latest_per_chat(
        chat_ids: &[ChatId],
        viewer: UserId,
        pool: &PgPool,
    ) -> Result<Vec<MessageWithContent>> {
        let sql = format!(
            r#"
            SELECT DISTINCT ON (x.chat_id) x.* FROM (
                {}
                WHERE m.chat_id = ANY($2)
            ) x
            ORDER BY x.chat_id, x.created_at DESC, x.id DESC
            "#,
            WITH_CONTENT_SELECT
        );
        let rows = sqlx::query_as::<_, MessageWithContent>(&sql)
            .bind(viewer)
            .bind(chat_ids)
            .fetch_all(pool)
            .await?;
        Ok(rows)
    }

    /// Per chat, the number of messages from others the viewer has not read
    pub async fn count_unread_per_chat(
        chat_ids: &[ChatId],
        viewer: UserId,
        pool: &PgPool,
    ) -> Result<Vec<(ChatId, i64)>> {
        let counts = sqlx::query_as::<_, (ChatId, i64)>(
            r#"
            SELECT m.chat_id, COUNT(*)
            FROM messages m
            WHERE m.chat_id = ANY($1)
              AND m.sender_id IS DISTINCT FROM $2
              AND NOT EXISTS (
                  SELECT 1 FROM message_events e
                  WHERE e.message_id = m.id AND e.event_type = 'read' AND e.user_id = $2
              )
            GROUP BY m.chat_id
            "#,
        )
        .bind(chat_ids)
        .bind(viewer)
        .fetch_all(pool)
        .await?;
        Ok(counts)
    }

    /// Unanswered alert questions in a chat (latest revision has no selection)
    pub async fn count_pending_questions(chat_id: ChatId, pool: &PgPool) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM messages m
            JOIN LATERAL (
                SELECT payload FROM message_content_versions
                WHERE message_id = m.id
                ORDER BY revision DESC
                LIMIT 1
            ) v ON TRUE
            WHERE m.chat_id = $1
              AND m.message_type = 'alert_question'
              AND COALESCE(v.payload -> 'selectedOption', 'null'::jsonb) = 'null'::jsonb
              AND COALESCE(v.payload -> 'selectedOptionId', 'null'::jsonb) = 'null'::jsonb
            "#,
        )
        .bind(chat_id)
        .fetch_one(pool)
        .await?;
        Ok(count)
    }

    pub async fn find_by_chat(chat_id: ChatId, pool: &PgPool) -> Result<Vec<Self>> {
        let messages = sqlx::query_as::<_, Message>(
            "SELECT * FROM messages WHERE chat_id = $1 ORDER BY created_at, id",
        )
        .bind(chat_id)
        .fetch_all(pool)
        .await?;
        Ok(messages)
    }
}
