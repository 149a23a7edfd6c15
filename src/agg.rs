use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use crate::config::parse_interval;
use crate::context::AppContext;
use crate::fetcher::HttpFetcher;
use crate::scheduler::Scheduler;
use crate::telemetry::{self};

/// gator agg <interval> [--timeout 20s]
#[derive(Args)]
pub struct AggCmd {
    /// Time between polls, e.g. "30s", "1m", "1h30m"
    #[arg(value_parser = parse_interval)]
    pub interval: Duration,
    /// Upper bound on a single feed fetch
    #[arg(long, default_value = "20s", value_parser = parse_interval)]
    pub timeout: Duration,
}

#[derive(Serialize)]
struct AggResult {
    ticks: u64,
}

pub async fn run(ctx: &AppContext, args: AggCmd) -> Result<()> {
    let log = telemetry::agg();
    let _g = log.root_span_kv([
        ("interval", format!("{:?}", args.interval)),
        ("timeout", format!("{:?}", args.timeout)),
    ]).entered();

    let fetcher = HttpFetcher::new(args.timeout).context("building http client")?;
    let handle = Scheduler::new(ctx.store.clone(), ctx.store.clone(), Arc::new(fetcher), args.interval)
        .with_fetch_timeout(args.timeout)
        .spawn();

    let signal = shutdown_signal().await?;
    log.info(format!("👋 Received {signal}, waiting for the current tick"));
    let ticks = handle.stop().await.context("scheduler task panicked")?;

    if ctx.json {
        log.result(&AggResult { ticks })?;
    }
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix, and names the signal.
async fn shutdown_signal() -> Result<&'static str> {
    #[cfg(unix)]
    let mut sigterm = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
    #[cfg(unix)]
    let sigterm_fut = sigterm.recv();
    #[cfg(not(unix))]
    let sigterm_fut = std::future::pending::<Option<()>>();

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res.context("waiting for ctrl-c")?;
            Ok("SIGINT")
        }
        _ = sigterm_fut => Ok("SIGTERM"),
    }
}
