use anyhow::{bail, Result};
use clap::Args;
use url::Url;

use crate::context::AppContext;
use crate::follow::{self, db::FollowRow};
use crate::registry::{StoreError, User};
use crate::telemetry::{self};
use crate::telemetry::ops::feed::Phase as FeedPhase;

pub mod db;
pub mod types;

/// gator addfeed <name> <url>
#[derive(Args)]
pub struct AddFeedCmd {
    pub name: String,
    pub url: String,
}

// Friendly error before DB I/O; only http(s) feeds can be polled.
pub fn validate_feed_url(raw: &str) -> Result<Url> {
    let Ok(url) = Url::parse(raw.trim()) else { bail!("Invalid URL: {}", raw) };
    if !matches!(url.scheme(), "http" | "https") {
        bail!("Unsupported URL scheme {:?}: {}", url.scheme(), raw);
    }
    Ok(url)
}

pub async fn add(ctx: &AppContext, user: User, args: AddFeedCmd) -> Result<()> {
    let log = telemetry::feed();
    let _g = log.root_span_kv([
        ("name", args.name.clone()),
        ("url", args.url.clone()),
        ("user", user.name.clone()),
    ]).entered();

    let name = args.name.trim();
    if name.is_empty() { bail!("addfeed requires a non-empty feed name"); }
    validate_feed_url(&args.url)?;
    // stored as typed so `follow <url>` matches byte-for-byte
    let url = args.url.trim();

    let feed = {
        let _s = log.span(&FeedPhase::Add).entered();
        match db::create_feed(&ctx.pool, name, url, user.id).await {
            Ok(feed) => feed,
            Err(StoreError::UniqueViolation { .. }) => bail!("feed already registered: {}", url),
            Err(e) => return Err(e.into()),
        }
    };
    log.info(format!("➕ Feed added: {} ({})", feed.name, feed.url));

    // the creator follows their own feed
    {
        let _s = log.span(&FeedPhase::AutoFollow).entered();
        let res = follow::db::create_follow(&ctx.pool, user.id, feed.id).await;
        if let Some(row) = auto_follow_outcome(res)? {
            log.info(format!("📌 {} is now following {}", row.user_name, row.feed_name));
        }
    }

    if ctx.json {
        log.result(&types::FeedAddResult { feed, followed: true })?;
    }
    Ok(())
}

// An existing follow is fine; any other failure leaves the feed unfollowed.
fn auto_follow_outcome(res: Result<FollowRow, StoreError>) -> Result<Option<FollowRow>> {
    match res {
        Ok(row) => Ok(Some(row)),
        Err(StoreError::UniqueViolation { .. }) => Ok(None),
        Err(e) => Err(anyhow::Error::new(e).context("feed created but follow failed")),
    }
}

pub async fn list(ctx: &AppContext) -> Result<()> {
    let log = telemetry::feed();
    let _g = log.root_span().entered();
    let _s = log.span(&FeedPhase::List).entered();
    let feeds = db::list_feeds(&ctx.pool).await?;

    if ctx.json {
        return log.result(&types::FeedList { feeds });
    }
    for f in &feeds {
        let fetched = f.last_fetched_at.map(|t| t.to_rfc3339()).unwrap_or_else(|| "never".to_string());
        println!("----------");
        println!("Feed Name : {}", f.name);
        println!("Feed URL  : {}", f.url);
        println!("Created By: {}", f.owner);
        println!("Fetched   : {}", fetched);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        assert_eq!(validate_feed_url("https://blog.boot.dev/index.xml").unwrap().as_str(), "https://blog.boot.dev/index.xml");
        assert!(validate_feed_url(" http://example.test/rss ").is_ok());
    }

    #[test]
    fn rejects_garbage_and_other_schemes() {
        assert!(validate_feed_url("not a url").is_err());
        assert!(validate_feed_url("ftp://example.test/feed").is_err());
        assert!(validate_feed_url("file:///etc/passwd").is_err());
    }

    #[test]
    fn existing_follow_is_not_an_error() {
        let res = auto_follow_outcome(Err(StoreError::UniqueViolation { constraint: None }));
        assert!(res.unwrap().is_none());
    }

    #[test]
    fn failed_auto_follow_fails_the_command() {
        let err = auto_follow_outcome(Err(StoreError::Database(sqlx::Error::PoolTimedOut))).unwrap_err();
        assert!(err.to_string().contains("feed created but follow failed"));
    }
}
