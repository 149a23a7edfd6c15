use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::context::AppContext;
use crate::telemetry::{self};
use crate::telemetry::ops::init::Phase as InitPhase;

pub async fn connect(dsn: &str) -> Result<PgPool> {
    let log = telemetry::init();
    let _s = log.span(&InitPhase::Connect).entered();
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(dsn)
        .await
        .context("connecting to database")?;
    Ok(pool)
}

pub async fn run(ctx: &AppContext) -> Result<()> {
    let log = telemetry::init();
    let _g = log.root_span().entered();
    let _s = log.span(&InitPhase::Migrate).entered();

    // Apply any pending migrations (idempotent)
    sqlx::migrate!("./migrations").run(&ctx.pool).await?;

    log.info("✅ Database initialized successfully");
    if ctx.json {
        log.result(&serde_json::json!({ "migrated": true }))?;
    }
    Ok(())
}
