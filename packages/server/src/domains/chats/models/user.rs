use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

use crate::common::UserId;

/// User - local mirror of an identity-provider account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub last_seen_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub async fn find_by_id(id: UserId, pool: &PgPool) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_id_in(id: UserId, conn: &mut PgConnection) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(user)
    }

    /// Ids from `ids` that have no user row
    pub async fn find_missing(ids: &[UserId], pool: &PgPool) -> Result<Vec<UserId>> {
        let missing = sqlx::query_scalar::<_, UserId>(
            r#"
            SELECT requested.id
            FROM UNNEST($1::uuid[]) AS requested(id)
            LEFT JOIN users u ON u.id = requested.id
            WHERE u.id IS NULL
            "#,
        )
        .bind(ids)
        .fetch_all(pool)
        .await?;
        Ok(missing)
    }

    /// Insert or refresh the user from verified token claims, marking them seen
    pub async fn upsert_seen(id: UserId, name: &str, pool: &PgPool) -> Result<Self> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, last_seen_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name, last_seen_at = NOW()
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_one(pool)
        .await?;
        Ok(user)
    }

    pub async fn touch_last_seen(id: UserId, pool: &PgPool) -> Result<()> {
        sqlx::query("UPDATE users SET last_seen_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Online means seen within the last 30 seconds
    pub fn is_online_at(last_seen_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(last_seen_at) <= chrono::Duration::seconds(30)
    }
}
