use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::types::FeedWithOwner;
use crate::registry::{Feed, StoreError};

pub async fn create_feed(pool: &PgPool, name: &str, url: &str, user_id: Uuid) -> Result<Feed, StoreError> {
    let now = Utc::now();
    let feed = sqlx::query_as::<_, Feed>(
        r#"
        INSERT INTO feeds (id, created_at, updated_at, name, url, user_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, created_at, updated_at, name, url, user_id, last_fetched_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(now)
    .bind(now)
    .bind(name)
    .bind(url)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(feed)
}

pub async fn feed_by_url(pool: &PgPool, url: &str) -> Result<Option<Feed>, sqlx::Error> {
    sqlx::query_as::<_, Feed>(
        r#"
        SELECT id, created_at, updated_at, name, url, user_id, last_fetched_at
        FROM feeds
        WHERE url = $1
        "#,
    )
    .bind(url)
    .fetch_optional(pool)
    .await
}

pub async fn list_feeds(pool: &PgPool) -> Result<Vec<FeedWithOwner>, sqlx::Error> {
    sqlx::query_as::<_, FeedWithOwner>(
        r#"
        SELECT f.id, f.name, f.url, u.name AS owner, f.last_fetched_at
        FROM feeds f
        JOIN users u ON u.id = f.user_id
        ORDER BY f.created_at
        "#,
    )
    .fetch_all(pool)
    .await
}
