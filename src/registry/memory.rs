use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::{Feed, FeedRegistry, NewPost, PostStore, RegistryError, StoreError, User, UserLookup};

/// In-memory stand-in for the Postgres store with the same ordering and
/// uniqueness rules.
#[derive(Debug, Default)]
pub struct MemoryStore {
    feeds: Mutex<Vec<Feed>>,
    posts: Mutex<Vec<NewPost>>,
    users: Mutex<Vec<User>>,
    failing_urls: Mutex<HashSet<String>>,
    selections: Mutex<Vec<Uuid>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a feed whose `created_at` is `seq` seconds after a fixed base.
    pub fn add_feed(&self, name: &str, url: &str, seq: i64, last_fetched_at: Option<DateTime<Utc>>) -> Feed {
        let created = base_time() + Duration::seconds(seq);
        let feed = Feed {
            id: Uuid::new_v4(),
            created_at: created,
            updated_at: created,
            name: name.to_string(),
            url: url.to_string(),
            user_id: Uuid::nil(),
            last_fetched_at,
        };
        self.feeds.lock().unwrap().push(feed.clone());
        feed
    }

    pub fn add_user(&self, name: &str) -> User {
        let user = User { id: Uuid::new_v4(), created_at: base_time(), updated_at: base_time(), name: name.to_string() };
        self.users.lock().unwrap().push(user.clone());
        user
    }

    /// Make `insert_post` fail with a non-constraint error for this url.
    pub fn fail_inserts_for(&self, url: &str) {
        self.failing_urls.lock().unwrap().insert(url.to_string());
    }

    pub fn feed(&self, id: Uuid) -> Option<Feed> {
        self.feeds.lock().unwrap().iter().find(|f| f.id == id).cloned()
    }

    pub fn posts(&self) -> Vec<NewPost> {
        self.posts.lock().unwrap().clone()
    }

    /// Feed ids in the order `next_feed_to_poll` returned them.
    pub fn selections(&self) -> Vec<Uuid> {
        self.selections.lock().unwrap().clone()
    }
}

pub fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
}

#[async_trait]
impl FeedRegistry for MemoryStore {
    async fn next_feed_to_poll(&self) -> Result<Feed, RegistryError> {
        let feeds = self.feeds.lock().unwrap();
        // None sorts before Some, matching NULLS FIRST
        let next = feeds
            .iter()
            .min_by_key(|f| (f.last_fetched_at, f.created_at, f.id))
            .cloned()
            .ok_or(RegistryError::NotFound)?;
        self.selections.lock().unwrap().push(next.id);
        Ok(next)
    }

    async fn mark_fetched(&self, feed_id: Uuid, at: DateTime<Utc>) -> Result<(), RegistryError> {
        let mut feeds = self.feeds.lock().unwrap();
        let feed = feeds.iter_mut().find(|f| f.id == feed_id).ok_or(RegistryError::NotFound)?;
        feed.last_fetched_at = Some(feed.last_fetched_at.map_or(at, |prev| prev.max(at)));
        feed.updated_at = at;
        Ok(())
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn insert_post(&self, post: &NewPost) -> Result<(), StoreError> {
        if self.failing_urls.lock().unwrap().contains(&post.url) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut posts = self.posts.lock().unwrap();
        if posts.iter().any(|p| p.url == post.url) {
            return Err(StoreError::UniqueViolation { constraint: Some("posts_url_key".into()) });
        }
        posts.push(post.clone());
        Ok(())
    }
}

#[async_trait]
impl UserLookup for MemoryStore {
    async fn user_by_name(&self, name: &str) -> Result<Option<User>, sqlx::Error> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.name == name).cloned())
    }
}
