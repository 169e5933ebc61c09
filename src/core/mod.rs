//! Core control plane - framework-agnostic services behind the REST boundary.
//!
//! Each service guards its own resource: configuration, command registry,
//! connection lifecycle and activity log are locked independently. Every call
//! into the bot runtime goes through [`bounded`], so nothing here blocks forever.

/// Append-only activity log
pub mod activity_log;
/// Slash command registry and bulk registration
pub mod commands;
/// Singleton bot configuration
pub mod config_store;
/// Connection lifecycle state machine
pub mod connection;
/// Single-message delivery
pub mod dispatcher;

use crate::{
    bot::{BotRuntime, RuntimeError},
    config::AppConfig,
    errors::Result,
};
use activity_log::ActivityLog;
use commands::CommandRegistry;
use config_store::ConfigStore;
use connection::ConnectionManager;
use dispatcher::MessageDispatcher;
use sea_orm::DatabaseConnection;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Runs a runtime call with an upper bound; running out of time counts as a
/// transport failure, which callers may retry.
pub(crate) async fn bounded<T, F>(limit: Duration, call: F) -> std::result::Result<T, RuntimeError>
where
    F: Future<Output = std::result::Result<T, RuntimeError>>,
{
    tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
        Err(RuntimeError::Transport(format!(
            "timed out after {}s",
            limit.as_secs_f32()
        )))
    })
}

/// All control plane services, wired to one database and one bot runtime.
#[derive(Clone, Debug)]
pub struct ControlPlane {
    pub log: ActivityLog,
    pub config: ConfigStore,
    pub connection: Arc<ConnectionManager>,
    pub commands: CommandRegistry,
    pub dispatcher: MessageDispatcher,
}

impl ControlPlane {
    #[must_use]
    pub fn new(db: DatabaseConnection, runtime: Arc<dyn BotRuntime>, app_config: &AppConfig) -> Self {
        let request_timeout = app_config.runtime.request_timeout();
        let log = ActivityLog::new(db.clone(), &app_config.activity_log);
        let config = ConfigStore::new(db.clone(), log.clone());
        let connection = Arc::new(ConnectionManager::new(
            Arc::clone(&runtime),
            config.clone(),
            log.clone(),
            request_timeout,
        ));
        let commands = CommandRegistry::new(
            db,
            Arc::clone(&runtime),
            Arc::clone(&connection),
            log.clone(),
            request_timeout,
        );
        let dispatcher =
            MessageDispatcher::new(runtime, Arc::clone(&connection), log.clone(), request_timeout);

        Self {
            log,
            config,
            connection,
            commands,
            dispatcher,
        }
    }

    /// First-boot setup: configuration row, optional token seed, default commands.
    pub async fn bootstrap(&self, seed_token: Option<String>) -> Result<()> {
        self.config.initialize().await?;
        if let Some(token) = seed_token {
            if self.config.seed_token(token).await? {
                self.log.info("Bot token loaded from environment").await;
            }
        }
        let seeded = self.commands.seed_defaults().await?;
        if seeded > 0 {
            info!("Seeded {} default command(s)", seeded);
        }
        self.log.info("Control plane started").await;
        Ok(())
    }
}
