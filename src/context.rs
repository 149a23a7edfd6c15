use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use sqlx::PgPool;
use thiserror::Error;

use crate::config::Config;
use crate::registry::pg::PgStore;
use crate::registry::{User, UserLookup};

/// Everything a command needs, owned by `main` and passed down by reference.
pub struct AppContext {
    pub pool: PgPool,
    pub store: Arc<PgStore>,
    pub config: Config,
    pub config_path: PathBuf,
    /// Emit a JSON envelope on stdout instead of human output.
    pub json: bool,
}

impl AppContext {
    pub fn new(pool: PgPool, config: Config, config_path: PathBuf, json: bool) -> Self {
        let store = Arc::new(PgStore::new(pool.clone()));
        Self { pool, store, config, config_path, json }
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("no user logged in (run `gator login <name>` or `gator register <name>`)")]
    NoUserLoggedIn,
    #[error("current user {0:?} does not exist; log in again")]
    UnknownUser(String),
    #[error("looking up current user: {0}")]
    Lookup(#[from] sqlx::Error),
}

/// Resolve the session's user once.
pub async fn current_user(config: &Config, users: &dyn UserLookup) -> Result<User, CommandError> {
    let name = config.current_user().ok_or(CommandError::NoUserLoggedIn)?;
    users
        .user_by_name(name)
        .await?
        .ok_or_else(|| CommandError::UnknownUser(name.to_string()))
}

/// Run `handler` with the logged-in user, failing fast when there is none.
pub async fn with_current_user<'c, F, Fut>(ctx: &'c AppContext, handler: F) -> Result<()>
where
    F: FnOnce(&'c AppContext, User) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let user = current_user(&ctx.config, &*ctx.store).await?;
    handler(ctx, user).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::memory::MemoryStore;

    fn config_for(name: Option<&str>) -> Config {
        Config { db_url: String::new(), current_user_name: name.map(str::to_string) }
    }

    #[tokio::test]
    async fn resolves_logged_in_user() {
        let store = MemoryStore::new();
        let kahya = store.add_user("kahya");
        let user = current_user(&config_for(Some("kahya")), &store).await.unwrap();
        assert_eq!(user, kahya);
    }

    #[tokio::test]
    async fn missing_session_is_no_user_logged_in() {
        let store = MemoryStore::new();
        let err = current_user(&config_for(None), &store).await.unwrap_err();
        assert!(matches!(err, CommandError::NoUserLoggedIn));

        let err = current_user(&config_for(Some("  ")), &store).await.unwrap_err();
        assert!(matches!(err, CommandError::NoUserLoggedIn));
    }

    #[tokio::test]
    async fn session_naming_unknown_user_fails() {
        let store = MemoryStore::new();
        store.add_user("holgith");
        let err = current_user(&config_for(Some("kahya")), &store).await.unwrap_err();
        assert!(matches!(err, CommandError::UnknownUser(ref n) if n == "kahya"));
    }
}
