use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;

use crate::context::AppContext;
use crate::feed;
use crate::registry::{StoreError, User};
use crate::telemetry::{self};
use crate::telemetry::ops::follow::Phase as FollowPhase;

pub mod db;

/// `gator follow <url>` / `gator unfollow <url>`
#[derive(Args)]
pub struct UrlArgs {
    pub url: String,
}

#[derive(Serialize)]
struct Following<'a> {
    user: &'a str,
    feeds: Vec<db::FollowRow>,
}

#[derive(Serialize)]
struct Unfollowed<'a> {
    url: &'a str,
    removed: bool,
}

pub async fn follow(ctx: &AppContext, user: User, args: UrlArgs) -> Result<()> {
    let log = telemetry::follow();
    let _g = log.root_span_kv([("url", args.url.clone()), ("user", user.name.clone())]).entered();

    let feed = {
        let _s = log.span(&FollowPhase::Resolve).entered();
        let url = args.url.trim();
        match feed::db::feed_by_url(&ctx.pool, url).await? {
            Some(feed) => feed,
            None => bail!("no feed registered with url {} (add it with `gator addfeed`)", url),
        }
    };

    let _s = log.span(&FollowPhase::Follow).entered();
    let row = match db::create_follow(&ctx.pool, user.id, feed.id).await {
        Ok(row) => row,
        Err(StoreError::UniqueViolation { .. }) => bail!("{} is already following {}", user.name, feed.name),
        Err(e) => return Err(e.into()),
    };
    log.info(format!("📌 {} is now following {}", row.user_name, row.feed_name));
    if ctx.json {
        log.result(&row)?;
    }
    Ok(())
}

pub async fn following(ctx: &AppContext, user: User) -> Result<()> {
    let log = telemetry::follow();
    let _g = log.root_span_kv([("user", user.name.clone())]).entered();
    let _s = log.span(&FollowPhase::List).entered();

    let feeds = db::follows_for_user(&ctx.pool, user.id).await?;
    if ctx.json {
        return log.result(&Following { user: &user.name, feeds });
    }
    if feeds.is_empty() {
        println!("{} is not following any feeds", user.name);
    }
    for f in &feeds {
        println!("* {}", f.feed_name);
    }
    Ok(())
}

pub async fn unfollow(ctx: &AppContext, user: User, args: UrlArgs) -> Result<()> {
    let log = telemetry::follow();
    let _g = log.root_span_kv([("url", args.url.clone()), ("user", user.name.clone())]).entered();
    let _s = log.span(&FollowPhase::Unfollow).entered();

    let url = args.url.trim();
    let removed = db::delete_follow(&ctx.pool, user.id, url).await?;
    if !removed {
        bail!("{} does not follow {}", user.name, url);
    }
    log.info(format!("🗑️ {} unfollowed {}", user.name, url));
    if ctx.json {
        log.result(&Unfollowed { url, removed })?;
    }
    Ok(())
}
