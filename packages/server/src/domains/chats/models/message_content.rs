use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{PgConnection, PgPool};

use crate::common::MessageId;

/// One payload revision. `(message_id, revision)` is the primary key, so two
/// writers racing for the same revision cannot both commit.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MessageContentVersion {
    pub message_id: MessageId,
    pub revision: i32,
    pub payload: JsonValue,
    pub created_at: DateTime<Utc>,
}

impl MessageContentVersion {
    pub async fn insert(
        message_id: MessageId,
        revision: i32,
        payload: &JsonValue,
        conn: &mut PgConnection,
    ) -> Result<Self> {
        let version = sqlx::query_as::<_, MessageContentVersion>(
            r#"
            INSERT INTO message_content_versions (message_id, revision, payload)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(message_id)
        .bind(revision)
        .bind(payload)
        .fetch_one(conn)
        .await?;
        Ok(version)
    }

    /// The authoritative (highest) revision
    pub async fn find_latest(
        message_id: MessageId,
        conn: &mut PgConnection,
    ) -> Result<Option<Self>> {
        let version = sqlx::query_as::<_, MessageContentVersion>(
            r#"
            SELECT * FROM message_content_versions
            WHERE message_id = $1
            ORDER BY revision DESC
            LIMIT 1
            "#,
        )
        .bind(message_id)
        .fetch_optional(conn)
        .await?;
        Ok(version)
    }

    pub async fn find_latest_payload(message_id: MessageId, pool: &PgPool) -> Result<Option<JsonValue>> {
        let payload = sqlx::query_scalar::<_, JsonValue>(
            r#"
            SELECT payload FROM message_content_versions
            WHERE message_id = $1
            ORDER BY revision DESC
            LIMIT 1
            "#,
        )
        .bind(message_id)
        .fetch_optional(pool)
        .await?;
        Ok(payload)
    }

    pub async fn find_all(message_id: MessageId, pool: &PgPool) -> Result<Vec<Self>> {
        let versions = sqlx::query_as::<_, MessageContentVersion>(
            "SELECT * FROM message_content_versions WHERE message_id = $1 ORDER BY revision",
        )
        .bind(message_id)
        .fetch_all(pool)
        .await?;
        Ok(versions)
    }
}
