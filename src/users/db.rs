use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::registry::{StoreError, User};

pub async fn create_user(pool: &PgPool, name: &str) -> Result<User, StoreError> {
    let now = Utc::now();
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, created_at, updated_at, name)
        VALUES ($1, $2, $3, $4)
        RETURNING id, created_at, updated_at, name
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(now)
    .bind(now)
    .bind(name)
    .fetch_one(pool)
    .await?;
    Ok(user)
}

pub async fn user_by_name(pool: &PgPool, name: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, created_at, updated_at, name
        FROM users
        WHERE name = $1
        "#,
    )
    .bind(name)
    .fetch_optional(pool)
    .await
}

pub async fn list_users(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, created_at, updated_at, name
        FROM users
        ORDER BY name
        "#,
    )
    .fetch_all(pool)
    .await
}
