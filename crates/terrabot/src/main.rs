use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use dotenvy::dotenv;
use teloxide::prelude::*;
use tokio::time::{interval, sleep};

use terracore::core::init_logger;
use terracore::core::retry::{retry, RetryConfig};
use terracore::i18n::DEFAULT_LANG;
use terracore::{config, provisioning, Engine, SqliteStorage, Storage, Workflow};

mod cli;
mod telegram;
mod web_server;

use cli::{Cli, Commands};
use telegram::{create_bot, schema, setup_bot_commands, HandlerDeps, TelegramMessenger};

/// Main entry point for the territory bot
///
/// Parses CLI arguments and dispatches to the appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, database, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Log panics that escape a task instead of losing them on stderr
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
        if let Some(msg) = panic_info.payload().downcast_ref::<&str>() {
            log::error!("Panic message: {}", msg);
        }
    }));

    // Environment first: the logger reads its level and path from it
    let _ = dotenv();
    init_logger(*config::LOG_LEVEL, &config::LOG_FILE_PATH)?;

    match cli.command {
        None | Some(Commands::Run) => run_bot().await,
        Some(Commands::AddCongregation { name }) => {
            let storage = SqliteStorage::open(&config::DATABASE_PATH)?;
            let congregation = provisioning::add_congregation(&storage, &name)?;
            log::info!("Congregation '{}' registered with id {}", congregation.name, congregation.id);
            Ok(())
        }
        Some(Commands::PromoteAdmin { user_id, congregation }) => {
            let storage = SqliteStorage::open(&config::DATABASE_PATH)?;
            let user = provisioning::promote_admin(&storage, user_id, &congregation)?;
            log::info!("User {} ({}) is now an admin of '{}'", user_id, user.full_name, congregation);
            Ok(())
        }
    }
}

async fn run_bot() -> Result<()> {
    log::info!("Starting territory bot...");

    let storage: Arc<SqliteStorage> = Arc::new(SqliteStorage::open(&config::DATABASE_PATH)?);
    log::info!("Database ready at {}", *config::DATABASE_PATH);

    let bot = create_bot()?;

    // The Bot API may still be coming up next to us
    let me = retry(&RetryConfig::startup(), || async { bot.get_me().await })
        .await
        .map_err(|e| anyhow::anyhow!("Bot API is unreachable: {}", e))?;
    log::info!("Authorized as @{}", me.username());

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    let port = *config::PORT;
    tokio::spawn(async move {
        if let Err(e) = web_server::start_web_server(port).await {
            log::error!("Health server stopped: {}", e);
        }
    });

    spawn_pending_action_purge(storage.clone());

    let messenger = Arc::new(TelegramMessenger::new(bot.clone()));
    let workflow = Arc::new(Workflow::new(storage, messenger, (*DEFAULT_LANG).clone()));
    let engine = Arc::new(Engine::new(workflow, config::update_timeout()));
    let handler = schema(HandlerDeps::new(engine));

    log::info!("Starting bot in long polling mode");

    // Run the dispatcher with retry logic
    let mut retry_count = 0;
    loop {
        let bot_clone = bot.clone();
        let handler_clone = handler.clone();

        // A separate task isolates dispatcher panics; they surface via the JoinHandle
        let handle = tokio::spawn(async move {
            use teloxide::update_listeners::Polling;

            let listener = Polling::builder(bot_clone.clone()).build();

            Dispatcher::builder(bot_clone, handler_clone)
                .enable_ctrlc_handler()
                .build()
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await
        });

        match handle.await {
            Ok(()) => {
                log::info!("Dispatcher shutdown gracefully");
                break;
            }
            Err(join_err) => {
                if join_err.is_panic() {
                    log::error!("Dispatcher panicked: {}", join_err);

                    if retry_count < config::retry::MAX_DISPATCHER_RETRIES {
                        retry_count += 1;
                        log::info!(
                            "Restarting dispatcher after panic (attempt {}/{})...",
                            retry_count,
                            config::retry::MAX_DISPATCHER_RETRIES
                        );
                        exponential_backoff(retry_count).await;
                    } else {
                        log::error!("Max retries reached after panic. Exiting...");
                        break;
                    }
                } else {
                    log::warn!("Dispatcher task was cancelled: {}", join_err);
                    break;
                }
            }
        }

        sleep(config::retry::dispatcher_delay()).await;
    }

    Ok(())
}

/// Periodically drops pending actions nobody resolved within the TTL.
fn spawn_pending_action_purge(storage: Arc<SqliteStorage>) {
    tokio::spawn(async move {
        let mut ticker = interval(config::purge::interval());
        loop {
            ticker.tick().await;
            let cutoff = Utc::now() - config::pending_action_ttl();
            match purge_expired(storage.clone(), cutoff).await {
                Ok(0) => {}
                Ok(purged) => log::info!("Purged {} expired pending action(s)", purged),
                Err(e) => log::warn!("Failed to purge pending actions: {}", e),
            }
        }
    });
}

/// Deletes pending actions created before `cutoff` on the blocking pool.
async fn purge_expired(storage: Arc<SqliteStorage>, cutoff: DateTime<Utc>) -> Result<usize> {
    let purged = tokio::task::spawn_blocking(move || storage.purge_pending_actions(cutoff)).await??;
    Ok(purged)
}

async fn exponential_backoff(retry_count: u32) {
    let delay = Duration::from_secs(config::retry::EXPONENTIAL_BACKOFF_BASE.pow(retry_count));
    sleep(delay).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use terracore::domain::{MessageRef, PendingAction, PendingKind};

    #[tokio::test]
    async fn purge_expired_removes_only_older_actions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("purge.sqlite");
        let storage = Arc::new(SqliteStorage::open(path.to_str().unwrap()).unwrap());
        storage
            .create_pending_action(&PendingAction::new("r1", PendingKind::Join, vec![MessageRef::new(1, 10)]))
            .unwrap();

        let before = Utc::now() - chrono::Duration::hours(1);
        assert_eq!(purge_expired(storage.clone(), before).await.unwrap(), 0);

        let after = Utc::now() + chrono::Duration::minutes(1);
        assert_eq!(purge_expired(storage.clone(), after).await.unwrap(), 1);
        assert!(storage.take_pending_action("r1").unwrap().is_none());
    }
}
