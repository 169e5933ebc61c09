//! Configuration store - credentials, target IDs and the draft message.
//!
//! Updates are partial: only fields present in a [`ConfigUpdate`] are written.
//! The token is write-only from the outside; [`ConfigStore::get`] exposes only
//! whether one is set. Changing credentials while connected does not reconnect,
//! the new values are picked up by the next connect.

use crate::{
    bot::Credentials,
    core::activity_log::ActivityLog,
    entities::{BotConfig, bot_config},
    errors::Result,
};
use chrono::Utc;
use sea_orm::{Set, prelude::*};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::{info, instrument};

/// Redacted view of the bot configuration handed to readers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigView {
    pub guild_id: String,
    pub channel_id: String,
    pub message: String,
    pub is_connected: bool,
    pub has_token: bool,
}

/// Partial update; `None` fields are left untouched.
///
/// Derived fields (`isConnected`, `hasToken`) are not accepted and are ignored
/// if a client sends them back.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    pub token: Option<String>,
    pub guild_id: Option<String>,
    pub channel_id: Option<String>,
    pub message: Option<String>,
}

impl fmt::Debug for ConfigUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigUpdate")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("guild_id", &self.guild_id)
            .field("channel_id", &self.channel_id)
            .field("message", &self.message)
            .finish()
    }
}

impl ConfigUpdate {
    fn credential_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.token.is_some() {
            fields.push("token");
        }
        if self.guild_id.is_some() {
            fields.push("guild ID");
        }
        if self.channel_id.is_some() {
            fields.push("channel ID");
        }
        fields
    }
}

/// Shared handle to the singleton configuration row.
///
/// All access goes through `write_lock` so the row is created exactly once.
#[derive(Clone, Debug)]
pub struct ConfigStore {
    db: DatabaseConnection,
    log: ActivityLog,
    connected: Arc<AtomicBool>,
    write_lock: Arc<Mutex<()>>,
}

impl ConfigStore {
    #[must_use]
    pub fn new(db: DatabaseConnection, log: ActivityLog) -> Self {
        Self {
            db,
            log,
            connected: Arc::new(AtomicBool::new(false)),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Loads the configuration row, creating it with empty defaults on first use.
    async fn load(&self) -> Result<bot_config::Model> {
        if let Some(row) = BotConfig::find_by_id(bot_config::SINGLETON_ID)
            .one(&self.db)
            .await?
        {
            return Ok(row);
        }

        info!("No bot configuration stored yet, creating defaults");
        let defaults = bot_config::ActiveModel {
            id: Set(bot_config::SINGLETON_ID),
            token: Set(String::new()),
            guild_id: Set(String::new()),
            channel_id: Set(String::new()),
            message: Set(String::new()),
            updated_at: Set(Utc::now().naive_utc()),
        };
        defaults.insert(&self.db).await.map_err(Into::into)
    }

    fn view(&self, row: bot_config::Model) -> ConfigView {
        ConfigView {
            guild_id: row.guild_id,
            channel_id: row.channel_id,
            message: row.message,
            is_connected: self.is_connected(),
            has_token: !row.token.is_empty(),
        }
    }

    /// Makes sure the configuration row exists.
    pub async fn initialize(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.load().await.map(|_| ())
    }

    /// Returns the configuration with the token redacted to `has_token`.
    pub async fn get(&self) -> Result<ConfigView> {
        let _guard = self.write_lock.lock().await;
        let row = self.load().await?;
        Ok(self.view(row))
    }

    /// Merges the provided fields into the stored configuration.
    #[instrument(skip(self, update))]
    pub async fn update(&self, update: ConfigUpdate) -> Result<ConfigView> {
        let _guard = self.write_lock.lock().await;
        let current = self.load().await?;

        let credential_fields = update.credential_fields();
        let draft_changed = update.message.is_some();
        if credential_fields.is_empty() && !draft_changed {
            return Ok(self.view(current));
        }

        let mut active: bot_config::ActiveModel = current.into();
        if let Some(token) = update.token {
            active.token = Set(token.trim().to_string());
        }
        if let Some(guild_id) = update.guild_id {
            active.guild_id = Set(guild_id.trim().to_string());
        }
        if let Some(channel_id) = update.channel_id {
            active.channel_id = Set(channel_id.trim().to_string());
        }
        if let Some(message) = update.message {
            active.message = Set(message);
        }
        active.updated_at = Set(Utc::now().naive_utc());
        let saved = active.update(&self.db).await?;

        if credential_fields.is_empty() {
            self.log.info("Draft message updated").await;
        } else {
            info!("Configuration updated: {}", credential_fields.join(", "));
            let mut summary = credential_fields.join(", ");
            if draft_changed {
                summary.push_str(", draft message");
            }
            self.log
                .success(format!("Configuration saved ({summary})"))
                .await;
        }

        Ok(self.view(saved))
    }

    /// Stores `token` only if no token has been saved yet. Returns whether it was stored.
    pub async fn seed_token(&self, token: String) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let current = self.load().await?;
        if !current.token.is_empty() {
            return Ok(false);
        }

        let mut active: bot_config::ActiveModel = current.into();
        active.token = Set(token);
        active.updated_at = Set(Utc::now().naive_utc());
        active.update(&self.db).await?;
        info!("Seeded bot token from the environment");
        Ok(true)
    }

    /// Credentials as they are right now, for a connect attempt.
    pub(crate) async fn credentials(&self) -> Result<Credentials> {
        let _guard = self.write_lock.lock().await;
        let row = self.load().await?;
        Ok(Credentials {
            token: SecretString::from(row.token),
            guild_id: row.guild_id,
            channel_id: row.channel_id,
        })
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Flipped only by connection lifecycle transitions.
    pub(crate) fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}
