use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;

use crate::context::AppContext;
use crate::registry::User;
use crate::telemetry::{self};
use crate::telemetry::ops::browse::Phase as BrowsePhase;

pub mod db;

pub const DEFAULT_LIMIT: i64 = 2;

/// gator browse [limit]
#[derive(Args)]
pub struct BrowseArgs {
    /// Number of posts to show (default 2)
    pub limit: Option<i64>,
}

impl BrowseArgs {
    fn effective_limit(&self) -> Result<i64> {
        match self.limit {
            None => Ok(DEFAULT_LIMIT),
            Some(n) if n > 0 => Ok(n),
            Some(n) => bail!("browse limit must be positive, got {}", n),
        }
    }
}

#[derive(Serialize)]
struct BrowseResult<'a> {
    user: &'a str,
    posts: Vec<db::PostRow>,
}

pub async fn run(ctx: &AppContext, user: User, args: BrowseArgs) -> Result<()> {
    let log = telemetry::browse();
    let limit = args.effective_limit()?;
    let _g = log.root_span_kv([("user", user.name.clone()), ("limit", limit.to_string())]).entered();
    let _s = log.span(&BrowsePhase::FetchPosts).entered();

    let posts = db::posts_for_user(&ctx.pool, user.id, limit).await?;
    log.debug(format!("{} post(s) for {}", posts.len(), user.name));

    if ctx.json {
        return log.result(&BrowseResult { user: &user.name, posts });
    }
    if posts.is_empty() {
        println!("No posts yet; follow some feeds and run `gator agg`.");
    }
    for p in &posts {
        let date = p.published_at.map(|t| t.format("%a %b %e %Y").to_string()).unwrap_or_else(|| "undated".to_string());
        println!("{} from {}", date, p.feed_name);
        println!("--- {} ---", p.title);
        if !p.description.is_empty() {
            println!("    {}", p.description);
        }
        println!("Link: {}", p.url);
        println!("=====================================");
    }
    Ok(())
}
