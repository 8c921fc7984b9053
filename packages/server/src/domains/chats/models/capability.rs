use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

use crate::common::ChatId;

/// Per-chat capability switch (`SEND_MESSAGES`, `PICTURE_UPLOAD`, `THREADS`)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatCapabilitySetting {
    pub chat_id: ChatId,
    pub capability: String,
    pub is_enabled: bool,
}

impl ChatCapabilitySetting {
    pub async fn find_flag(chat_id: ChatId, key: &str, pool: &PgPool) -> Result<Option<bool>> {
        let flag = sqlx::query_scalar::<_, bool>(
            "SELECT is_enabled FROM chat_capabilities WHERE chat_id = $1 AND capability = $2",
        )
        .bind(chat_id)
        .bind(key)
        .fetch_optional(pool)
        .await?;
        Ok(flag)
    }

    pub async fn find_for_chat(chat_id: ChatId, pool: &PgPool) -> Result<Vec<Self>> {
        let settings = sqlx::query_as::<_, ChatCapabilitySetting>(
            "SELECT * FROM chat_capabilities WHERE chat_id = $1 ORDER BY capability",
        )
        .bind(chat_id)
        .fetch_all(pool)
        .await?;
        Ok(settings)
    }

    pub async fn set(
        chat_id: ChatId,
        key: &str,
        is_enabled: bool,
        conn: &mut PgConnection,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO chat_capabilities (chat_id, capability, is_enabled)
            VALUES ($1, $2, $3)
            ON CONFLICT (chat_id, capability) DO UPDATE SET is_enabled = EXCLUDED.is_enabled
            "#,
        )
        .bind(chat_id)
        .bind(key)
        .bind(is_enabled)
        .execute(conn)
        .await?;
        Ok(())
    }
}
