use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::env;

mod agg;
mod browse;
mod config;
mod context;
mod feed;
mod fetcher;
mod follow;
mod ingestion;
mod init;
mod registry;
mod scheduler;
mod telemetry;
mod users;
mod util;

use context::{with_current_user, AppContext};

#[derive(Parser)]
#[command(name = "gator", about = "RSS feed aggregator CLI")]
struct Cli {
    #[arg(global = true, short, long)]
    dsn: Option<String>,
    /// Emit a single JSON envelope to stdout; logs go to stderr
    #[arg(global = true, long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply database migrations
    Init,
    /// Create a user and log in as them
    Register(users::NameArgs),
    /// Switch the current user
    Login(users::NameArgs),
    /// List users, marking the current one
    Users,
    /// Register a feed and follow it
    Addfeed(feed::AddFeedCmd),
    /// List every registered feed
    Feeds,
    /// Follow an already registered feed by url
    Follow(follow::UrlArgs),
    /// List the feeds the current user follows
    Following,
    /// Stop following a feed by url
    Unfollow(follow::UrlArgs),
    /// Show the newest posts from followed feeds
    Browse(browse::BrowseArgs),
    /// Poll feeds forever, one per interval
    Agg(agg::AggCmd),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    // initialize logging/tracing (stderr). Respect RUST_LOG and GATOR_LOG_FORMAT
    telemetry::config::init_tracing();

    let config_path = config::Config::default_path()?;
    let cfg = config::Config::load_from(&config_path)?;
    let dsn = config::resolve_dsn(cli.dsn, env::var("DATABASE_URL").ok(), &cfg)?;
    let pool = init::connect(&dsn).await?;
    let ctx = AppContext::new(pool, cfg, config_path, cli.json);

    match cli.command {
        Commands::Init => init::run(&ctx).await?,
        Commands::Register(args) => users::register(&ctx, args).await?,
        Commands::Login(args) => users::login(&ctx, args).await?,
        Commands::Users => users::list(&ctx).await?,
        Commands::Feeds => feed::list(&ctx).await?,
        Commands::Agg(args) => agg::run(&ctx, args).await?,
        Commands::Addfeed(args) => with_current_user(&ctx, |ctx, user| feed::add(ctx, user, args)).await?,
        Commands::Follow(args) => with_current_user(&ctx, |ctx, user| follow::follow(ctx, user, args)).await?,
        Commands::Following => with_current_user(&ctx, follow::following).await?,
        Commands::Unfollow(args) => with_current_user(&ctx, |ctx, user| follow::unfollow(ctx, user, args)).await?,
        Commands::Browse(args) => with_current_user(&ctx, |ctx, user| browse::run(ctx, user, args)).await?,
    }

    Ok(())
}
