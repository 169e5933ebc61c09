//! Shared test utilities for the control plane.
//!
//! Provides an in-memory database, a small activity log and [`MockRuntime`], a
//! scripted stand-in for the Discord runtime that counts calls and can be told
//! to fail or stall.
#![allow(clippy::unwrap_used)]

use crate::{
    bot::{BotIdentity, BotRuntime, Credentials, RuntimeError},
    config::{
        AppConfig,
        app::{ActivityLogConfig, RuntimeConfig},
    },
    core::{ControlPlane, activity_log::ActivityLog},
    entities::SlashCommandModel,
    errors::Result,
};
use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

fn test_log_limits() -> ActivityLogConfig {
    ActivityLogConfig {
        max_entries: 100,
        list_limit: 100,
    }
}

/// Activity log over `db` with roomy limits.
pub fn test_activity_log(db: &DatabaseConnection) -> ActivityLog {
    ActivityLog::new(db.clone(), &test_log_limits())
}

/// App config used by tests: 1s runtime timeout, roomy log limits.
pub fn test_app_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        runtime: RuntimeConfig {
            request_timeout_secs: 1,
        },
        activity_log: test_log_limits(),
        ..Default::default()
    }
}

/// Wires a full control plane over a fresh database and `runtime`.
///
/// Nothing is bootstrapped; the activity log starts empty.
pub async fn setup_control_plane(runtime: Arc<MockRuntime>) -> Result<ControlPlane> {
    let db = setup_test_db().await?;
    Ok(ControlPlane::new(db, runtime, &test_app_config()))
}

/// Scripted [`BotRuntime`] double.
///
/// Failures set with `fail_*_with` stay in effect until replaced.
#[derive(Debug, Default)]
pub struct MockRuntime {
    connect_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
    send_calls: AtomicUsize,
    register_calls: AtomicUsize,
    active_sessions: AtomicUsize,
    connect_delay: Mutex<Option<Duration>>,
    disconnect_delay: Mutex<Option<Duration>>,
    connect_failure: Mutex<Option<RuntimeError>>,
    disconnect_failure: Mutex<Option<RuntimeError>>,
    send_failure: Mutex<Option<RuntimeError>>,
    register_failure: Mutex<Option<RuntimeError>>,
    sent: Mutex<Vec<(String, String)>>,
    registered: Mutex<Option<(String, Vec<String>)>>,
}

impl MockRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    pub fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    /// Sessions currently open on the "remote" side (0 or 1).
    pub fn active_sessions(&self) -> usize {
        self.active_sessions.load(Ordering::SeqCst)
    }

    /// Makes every connect take `delay` before answering.
    pub fn delay_for(&self, delay: Duration) {
        *self.connect_delay.lock().unwrap() = Some(delay);
    }

    /// Makes every disconnect take `delay` before answering.
    pub fn delay_disconnect_for(&self, delay: Duration) {
        *self.disconnect_delay.lock().unwrap() = Some(delay);
    }

    pub fn fail_connect_with(&self, error: RuntimeError) {
        *self.connect_failure.lock().unwrap() = Some(error);
    }

    pub fn fail_disconnect_with(&self, error: RuntimeError) {
        *self.disconnect_failure.lock().unwrap() = Some(error);
    }

    pub fn fail_send_with(&self, error: RuntimeError) {
        *self.send_failure.lock().unwrap() = Some(error);
    }

    pub fn fail_register_with(&self, error: RuntimeError) {
        *self.register_failure.lock().unwrap() = Some(error);
    }

    /// `(channel_id, text)` for every delivered message.
    pub fn sent_messages(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// Names pushed by the last successful registration.
    pub fn registered_names(&self) -> Vec<String> {
        self.registered
            .lock()
            .unwrap()
            .as_ref()
            .map(|(_, names)| names.clone())
            .unwrap_or_default()
    }

    /// Guild targeted by the last successful registration.
    pub fn registered_guild(&self) -> Option<String> {
        self.registered
            .lock()
            .unwrap()
            .as_ref()
            .map(|(guild, _)| guild.clone())
    }

    fn injected(slot: &Mutex<Option<RuntimeError>>) -> std::result::Result<(), RuntimeError> {
        slot.lock().unwrap().clone().map_or(Ok(()), Err)
    }
}

#[async_trait]
impl BotRuntime for MockRuntime {
    async fn connect(&self, _credentials: &Credentials) -> std::result::Result<BotIdentity, RuntimeError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.connect_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Self::injected(&self.connect_failure)?;

        self.active_sessions.store(1, Ordering::SeqCst);
        Ok(BotIdentity {
            id: "424242".to_string(),
            username: "TestBot".to_string(),
            avatar_url: None,
        })
    }

    async fn disconnect(&self) -> std::result::Result<(), RuntimeError> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.disconnect_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.active_sessions.store(0, Ordering::SeqCst);
        Self::injected(&self.disconnect_failure)
    }

    async fn send_message(&self, channel_id: &str, text: &str) -> std::result::Result<(), RuntimeError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        Self::injected(&self.send_failure)?;
        self.sent
            .lock()
            .unwrap()
            .push((channel_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn register_commands(
        &self,
        guild_id: &str,
        commands: &[SlashCommandModel],
    ) -> std::result::Result<usize, RuntimeError> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        Self::injected(&self.register_failure)?;
        let names = commands.iter().map(|c| c.name.clone()).collect();
        *self.registered.lock().unwrap() = Some((guild_id.to_string(), names));
        Ok(commands.len())
    }
}
