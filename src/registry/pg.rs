use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{Feed, FeedRegistry, NewPost, PostStore, RegistryError, StoreError, User, UserLookup};

/// Postgres-backed registry; every mutation is a single statement.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeedRegistry for PgStore {
    async fn next_feed_to_poll(&self) -> Result<Feed, RegistryError> {
        let feed = sqlx::query_as::<_, Feed>(
            r#"
            SELECT id, created_at, updated_at, name, url, user_id, last_fetched_at
            FROM feeds
            ORDER BY last_fetched_at ASC NULLS FIRST, created_at ASC, id ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;
        feed.ok_or(RegistryError::NotFound)
    }

    async fn mark_fetched(&self, feed_id: Uuid, at: DateTime<Utc>) -> Result<(), RegistryError> {
        // GREATEST ignores NULL, so the first mark takes `at` as-is
        let res = sqlx::query(
            r#"
            UPDATE feeds
            SET last_fetched_at = GREATEST(last_fetched_at, $2),
                updated_at      = $2
            WHERE id = $1
            "#,
        )
        .bind(feed_id)
        .bind(at)
        .execute(&self.pool)
        .await?;
        if res.rows_affected() == 0 {
            return Err(RegistryError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl PostStore for PgStore {
    async fn insert_post(&self, post: &NewPost) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, created_at, updated_at, title, url, description, published_at, feed_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(post.id)
        .bind(post.created_at)
        .bind(post.updated_at)
        .bind(&post.title)
        .bind(&post.url)
        .bind(&post.description)
        .bind(post.published_at)
        .bind(post.feed_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl UserLookup for PgStore {
    async fn user_by_name(&self, name: &str) -> Result<Option<User>, sqlx::Error> {
        crate::users::db::user_by_name(&self.pool, name).await
    }
}
