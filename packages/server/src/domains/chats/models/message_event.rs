use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

use crate::common::{MessageEventId, MessageId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "message_event_type", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageEventType {
    Created,
    Stored,
    Delivered,
    Read,
}

/// Event types that feed display status; `Created` is bookkeeping only
pub const USER_RELEVANT_EVENTS: [MessageEventType; 3] = [
    MessageEventType::Stored,
    MessageEventType::Delivered,
    MessageEventType::Read,
];

/// Append-only delivery log entry. `user_id` is the producer; NULL means the
/// system produced it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MessageEvent {
    pub id: MessageEventId,
    pub message_id: MessageId,
    pub event_type: MessageEventType,
    pub user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl MessageEvent {
    pub async fn append(
        message_id: MessageId,
        event_type: MessageEventType,
        user_id: Option<UserId>,
        conn: &mut PgConnection,
    ) -> Result<Self> {
        let event = sqlx::query_as::<_, MessageEvent>(
            r#"
            INSERT INTO message_events (id, message_id, event_type, user_id, created_at)
            VALUES ($1, $2, $3, $4, clock_timestamp())
            RETURNING *
            "#,
        )
        .bind(MessageEventId::new())
        .bind(message_id)
        .bind(event_type)
        .bind(user_id)
        .fetch_one(conn)
        .await?;
        Ok(event)
    }

    /// Events of the `USER_RELEVANT_EVENTS` types for a batch of messages
    pub async fn find_relevant_for_messages(
        message_ids: &[MessageId],
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        let events = sqlx::query_as::<_, MessageEvent>(
            r#"
            SELECT * FROM message_events
            WHERE message_id = ANY($1) AND event_type IN ('stored', 'delivered', 'read')
            ORDER BY created_at, id
            "#,
        )
        .bind(message_ids)
        .fetch_all(pool)
        .await?;
        Ok(events)
    }

    pub async fn find_for_message(message_id: MessageId, pool: &PgPool) -> Result<Vec<Self>> {
        let events = sqlx::query_as::<_, MessageEvent>(
            "SELECT * FROM message_events WHERE message_id = $1 ORDER BY created_at, id",
        )
        .bind(message_id)
        .fetch_all(pool)
        .await?;
        Ok(events)
    }
}
