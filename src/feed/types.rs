use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::registry::Feed;

/// A feed joined with the name of the user who added it.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct FeedWithOwner {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub owner: String,
    pub last_fetched_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct FeedAddResult {
    pub feed: Feed,
    pub followed: bool,
}

#[derive(Serialize)]
pub struct FeedList {
    pub feeds: Vec<FeedWithOwner>,
}
