use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::registry::StoreError;

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct FollowRow {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub feed_name: String,
    pub feed_url: String,
    pub user_name: String,
}

pub async fn create_follow(pool: &PgPool, user_id: Uuid, feed_id: Uuid) -> Result<FollowRow, StoreError> {
    let now = Utc::now();
    let row = sqlx::query_as::<_, FollowRow>(
        r#"
        WITH inserted AS (
            INSERT INTO feed_follows (id, created_at, updated_at, user_id, feed_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, created_at, user_id, feed_id
        )
        SELECT i.id, i.created_at, f.name AS feed_name, f.url AS feed_url, u.name AS user_name
        FROM inserted i
        JOIN feeds f ON f.id = i.feed_id
        JOIN users u ON u.id = i.user_id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(now)
    .bind(now)
    .bind(user_id)
    .bind(feed_id)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn follows_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<FollowRow>, sqlx::Error> {
    sqlx::query_as::<_, FollowRow>(
        r#"
        SELECT ff.id, ff.created_at, f.name AS feed_name, f.url AS feed_url, u.name AS user_name
        FROM feed_follows ff
        JOIN feeds f ON f.id = ff.feed_id
        JOIN users u ON u.id = ff.user_id
        WHERE ff.user_id = $1
        ORDER BY ff.created_at
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn delete_follow(pool: &PgPool, user_id: Uuid, feed_url: &str) -> Result<bool, sqlx::Error> {
    let res = sqlx::query(
        r#"
        DELETE FROM feed_follows ff
        USING feeds f
        WHERE ff.feed_id = f.id
          AND ff.user_id = $1
          AND f.url = $2
        "#,
    )
    .bind(user_id)
    .bind(feed_url)
    .execute(pool)
    .await?;
    Ok(res.rows_affected() > 0)
}
