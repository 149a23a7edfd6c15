//! Turns parsed feed entries into stored posts.
//!
//! Each entry is handled on its own: a bad date, a missing link or a store
//! failure skips that entry only, and a url that is already stored counts as
//! a duplicate rather than an error. Ingesting the same batch twice therefore
//! stores each url exactly once.

use chrono::Utc;
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::fetcher::ParsedFeedEntry;
use crate::registry::{NewPost, PostStore, StoreError};
use crate::telemetry::{self};
use crate::telemetry::ops::agg::Phase as AggPhase;

pub mod date;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Newly stored posts.
    pub inserted: usize,
    pub duplicates: usize,
    /// Entries with no link or an unrecognised publication date.
    pub skipped: usize,
    /// Entries whose insert failed for a reason other than uniqueness.
    pub failed: usize,
}

impl IngestReport {
    pub fn merge(&mut self, other: IngestReport) {
        self.inserted += other.inserted;
        self.duplicates += other.duplicates;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

pub fn to_post(feed_id: Uuid, entry: &ParsedFeedEntry) -> Result<NewPost, date::DateFormatError> {
    let published_at = date::parse_pub_date(&entry.pub_date)?;
    let now = Utc::now();
    Ok(NewPost {
        id: Uuid::new_v4(),
        created_at: now,
        updated_at: now,
        title: entry.title.clone(),
        url: entry.link.clone(),
        description: entry.description.clone(),
        published_at: Some(published_at),
        feed_id,
    })
}

pub async fn ingest(store: &dyn PostStore, feed_id: Uuid, entries: &[ParsedFeedEntry]) -> IngestReport {
    let log = telemetry::agg();
    let mut report = IngestReport::default();

    for entry in entries {
        if entry.link.is_empty() {
            report.skipped += 1;
            log.info_kv("↩️ skip", [("reason", "no-link".to_string()), ("title", entry.title.clone())]);
            continue;
        }

        let post = match to_post(feed_id, entry) {
            Ok(post) => post,
            Err(e) => {
                report.skipped += 1;
                log.warn_kv("↩️ skip", [("reason", e.to_string()), ("url", entry.link.clone())]);
                continue;
            }
        };

        let span = log.span_kv(&AggPhase::WritePost, [("url", post.url.clone())]);
        match store.insert_post(&post).instrument(span).await {
            Ok(()) => {
                report.inserted += 1;
                log.info_kv("➕ insert", [("url", post.url.clone()), ("title", post.title.clone())]);
            }
            Err(StoreError::UniqueViolation { .. }) => {
                report.duplicates += 1;
                log.debug(format!("♻️ already stored: {}", post.url));
            }
            Err(e) => {
                report.failed += 1;
                log.error_kv("❌ insert failed", [("url", post.url.clone()), ("error", e.to_string())]);
            }
        }
    }

    report
}
