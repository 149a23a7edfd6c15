use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;

use crate::context::AppContext;
use crate::registry::StoreError;
use crate::telemetry::{self};
use crate::telemetry::ops::user::Phase as UserPhase;

pub mod db;

/// `gator register <name>` / `gator login <name>`
#[derive(Args)]
pub struct NameArgs {
    pub name: String,
}

#[derive(Serialize)]
struct SessionResult<'a> {
    current_user: &'a str,
    created: bool,
}

#[derive(Serialize)]
struct UserRow<'a> {
    name: &'a str,
    current: bool,
}

pub async fn register(ctx: &AppContext, args: NameArgs) -> Result<()> {
    let log = telemetry::user();
    let _g = log.root_span_kv([("name", args.name.clone())]).entered();
    let _s = log.span(&UserPhase::Register).entered();

    let name = args.name.trim();
    if name.is_empty() { bail!("register requires a non-empty username"); }

    let user = match db::create_user(&ctx.pool, name).await {
        Ok(user) => user,
        Err(StoreError::UniqueViolation { .. }) => bail!("user {:?} already exists", name),
        Err(e) => return Err(e.into()),
    };

    let mut config = ctx.config.clone();
    config.set_user(&ctx.config_path, &user.name)?;
    log.info(format!("👤 User {:?} registered and logged in", user.name));
    if ctx.json {
        log.result(&SessionResult { current_user: &user.name, created: true })?;
    }
    Ok(())
}

pub async fn login(ctx: &AppContext, args: NameArgs) -> Result<()> {
    let log = telemetry::user();
    let _g = log.root_span_kv([("name", args.name.clone())]).entered();
    let _s = log.span(&UserPhase::Login).entered();

    let Some(user) = db::user_by_name(&ctx.pool, args.name.trim()).await? else {
        bail!("cannot log in as {:?}: no such user", args.name);
    };

    let mut config = ctx.config.clone();
    config.set_user(&ctx.config_path, &user.name)?;
    log.info(format!("🔑 User set to {}", user.name));
    if ctx.json {
        log.result(&SessionResult { current_user: &user.name, created: false })?;
    }
    Ok(())
}

pub async fn list(ctx: &AppContext) -> Result<()> {
    let log = telemetry::user();
    let _g = log.root_span().entered();
    let _s = log.span(&UserPhase::List).entered();

    let users = db::list_users(&ctx.pool).await?;
    let current = ctx.config.current_user();
    let rows: Vec<UserRow> = users
        .iter()
        .map(|u| UserRow { name: &u.name, current: Some(u.name.as_str()) == current })
        .collect();

    if ctx.json {
        return log.result(&rows);
    }
    for row in &rows {
        if row.current { println!("* {} (current)", row.name); } else { println!("* {}", row.name); }
    }
    Ok(())
}
