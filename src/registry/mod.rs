//! Durable records of users, feeds and posts, plus the seams the poll loop
//! and ingestion talk to. Postgres lives in [`pg`]; tests use [`memory`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub mod pg;
#[cfg(test)]
pub mod memory;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Feed {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub name: String,
    pub url: String,
    pub user_id: Uuid,
    pub last_fetched_at: Option<DateTime<Utc>>,
}

/// A post ready to be written; ids and timestamps are assigned by ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub title: String,
    pub url: String,
    pub description: String,
    pub published_at: Option<DateTime<Utc>>,
    pub feed_id: Uuid,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no feeds registered")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// A row with the same unique key already exists.
    #[error("unique constraint violated{}", constraint_suffix(.constraint))]
    UniqueViolation { constraint: Option<String> },
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

fn constraint_suffix(constraint: &Option<String>) -> String {
    constraint.as_deref().map(|c| format!(" ({c})")).unwrap_or_default()
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return StoreError::UniqueViolation { constraint: db.constraint().map(str::to_string) };
            }
        }
        StoreError::Database(err)
    }
}

#[async_trait]
pub trait FeedRegistry: Send + Sync {
    /// The feed with a null or the oldest `last_fetched_at`.
    async fn next_feed_to_poll(&self) -> Result<Feed, RegistryError>;

    /// Record a poll attempt. Never moves `last_fetched_at` backwards.
    async fn mark_fetched(&self, feed_id: Uuid, at: DateTime<Utc>) -> Result<(), RegistryError>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn insert_post(&self, post: &NewPost) -> Result<(), StoreError>;
}

#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn user_by_name(&self, name: &str) -> Result<Option<User>, sqlx::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_display_names_constraint() {
        let err = StoreError::UniqueViolation { constraint: Some("posts_url_key".into()) };
        assert_eq!(err.to_string(), "unique constraint violated (posts_url_key)");

        let bare = StoreError::UniqueViolation { constraint: None };
        assert_eq!(bare.to_string(), "unique constraint violated");
    }

    #[test]
    fn non_database_sqlx_errors_stay_generic() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::Database(_)));
    }
}
