//! Connection lifecycle - `disconnected` → `connecting` → `connected` and back.
//!
//! Only one transition runs at a time. A `connect` arriving while another attempt
//! is in flight is rejected instead of queued. `disconnect` waits for an in-flight
//! attempt to settle and then tears down whatever it produced. Teardown failures
//! are logged as warnings and never reach the caller.

use super::{activity_log::ActivityLog, bounded, config_store::ConfigStore};
use crate::{
    bot::{BotIdentity, BotRuntime},
    errors::{Error, Result},
};
use secrecy::ExposeSecret;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

/// The live session as seen by the control plane.
///
/// Guild and channel are the values captured at connect time; edits made to the
/// configuration afterwards only apply after reconnecting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub identity: BotIdentity,
    pub guild_id: String,
    pub channel_id: String,
}

/// Local mirror of the remote session's state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected(Session),
}

/// Wire label for a [`ConnectionState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionPhase {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    #[must_use]
    pub const fn phase(&self) -> ConnectionPhase {
        match self {
            Self::Disconnected => ConnectionPhase::Disconnected,
            Self::Connecting => ConnectionPhase::Connecting,
            Self::Connected(_) => ConnectionPhase::Connected,
        }
    }
}

pub struct ConnectionManager {
    runtime: Arc<dyn BotRuntime>,
    config: ConfigStore,
    log: ActivityLog,
    request_timeout: Duration,
    state: Mutex<ConnectionState>,
    transition: Mutex<()>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    #[must_use]
    pub fn new(
        runtime: Arc<dyn BotRuntime>,
        config: ConfigStore,
        log: ActivityLog,
        request_timeout: Duration,
    ) -> Self {
        Self {
            runtime,
            config,
            log,
            request_timeout,
            state: Mutex::new(ConnectionState::Disconnected),
            transition: Mutex::new(()),
        }
    }

    /// Snapshot of the current state.
    pub async fn state(&self) -> ConnectionState {
        self.state.lock().await.clone()
    }

    /// The active session, or `NotConnected`.
    pub async fn session(&self) -> Result<Session> {
        match &*self.state.lock().await {
            ConnectionState::Connected(session) => Ok(session.clone()),
            _ => Err(Error::NotConnected),
        }
    }

    async fn set_state(&self, next: ConnectionState) {
        self.config
            .set_connected(matches!(next, ConnectionState::Connected(_)));
        *self.state.lock().await = next;
    }

    async fn reject(&self, message: &str) -> Error {
        self.log.warning(format!("Connect rejected: {message}")).await;
        Error::Connection {
            message: message.to_string(),
            retryable: false,
        }
    }

    /// Opens a session with the stored credentials and returns the bot identity.
    #[instrument(skip(self))]
    pub async fn connect(&self) -> Result<BotIdentity> {
        let Ok(_transition) = self.transition.try_lock() else {
            return Err(self
                .reject("a connection transition is already in progress")
                .await);
        };

        if !matches!(*self.state.lock().await, ConnectionState::Disconnected) {
            return Err(self.reject("the bot is already connected").await);
        }

        let credentials = match self.config.credentials().await {
            Ok(credentials) => credentials,
            Err(e) => {
                self.log
                    .error(format!("Failed to connect: could not load credentials: {e}"))
                    .await;
                return Err(e);
            }
        };
        if credentials.token.expose_secret().is_empty() {
            self.log
                .warning("Cannot connect: no bot token configured")
                .await;
            return Err(Error::configuration("no bot token configured"));
        }

        self.set_state(ConnectionState::Connecting).await;
        info!("Connecting to Discord...");

        match bounded(self.request_timeout, self.runtime.connect(&credentials)).await {
            Ok(identity) => {
                let session = Session {
                    identity: identity.clone(),
                    guild_id: credentials.guild_id,
                    channel_id: credentials.channel_id,
                };
                self.set_state(ConnectionState::Connected(session)).await;
                self.log
                    .success(format!("Connected as {}", identity.username))
                    .await;
                Ok(identity)
            }
            Err(e) => {
                // A timed-out attempt may still have left a session behind.
                if e.is_retryable() {
                    if let Err(teardown) =
                        bounded(self.request_timeout, self.runtime.disconnect()).await
                    {
                        warn!("Cleanup after failed connect reported: {}", teardown);
                    }
                }
                self.set_state(ConnectionState::Disconnected).await;
                self.log.error(format!("Failed to connect: {e}")).await;
                Err(Error::Connection {
                    message: e.to_string(),
                    retryable: e.is_retryable(),
                })
            }
        }
    }

    /// Tears down the session. A no-op when already disconnected.
    #[instrument(skip(self))]
    pub async fn disconnect(&self) -> Result<()> {
        let _transition = self.transition.lock().await;

        if matches!(*self.state.lock().await, ConnectionState::Disconnected) {
            return Ok(());
        }

        if let Err(e) = bounded(self.request_timeout, self.runtime.disconnect()).await {
            warn!("Teardown failed: {}", e);
            self.log
                .warning(format!("Disconnect teardown reported an error: {e}"))
                .await;
        }

        self.set_state(ConnectionState::Disconnected).await;
        self.log.success("Bot disconnected").await;
        Ok(())
    }
}
