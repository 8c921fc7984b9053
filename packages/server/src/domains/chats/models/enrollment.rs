use anyhow::Result;
use sqlx::PgPool;
use std::collections::HashSet;

use crate::common::UserId;

/// Enrollment roster, owned by the enrollment system. Read-only here apart
/// from the admin CLI import.
pub struct Enrollment;

impl Enrollment {
    pub async fn user_ids_for_course(course_id: &str, pool: &PgPool) -> Result<HashSet<UserId>> {
        let ids = sqlx::query_scalar::<_, UserId>(
            "SELECT user_id FROM enrollments WHERE course_id = $1",
        )
        .bind(course_id)
        .fetch_all(pool)
        .await?;
        Ok(ids.into_iter().collect())
    }

    pub async fn enroll(course_id: &str, user_id: UserId, pool: &PgPool) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO enrollments (course_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(course_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(())
    }
}
