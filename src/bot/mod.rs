//! Bot layer - the Discord-facing runtime the control plane delegates to.
//!
//! The control plane never talks to Discord directly. It drives a [`BotRuntime`],
//! whose production implementation is [`runtime::SerenityRuntime`]; tests swap in
//! a scripted double. Runtime failures are reported as [`RuntimeError`] and
//! translated into the crate's error taxonomy by the calling component.

/// Discord gateway event handlers (slash command replies)
pub mod handlers;
/// Serenity-backed runtime implementation
pub mod runtime;

use crate::entities::SlashCommandModel;
use async_trait::async_trait;
use secrecy::SecretString;
use serde::Serialize;
use thiserror::Error;

pub use runtime::SerenityRuntime;

/// Identity of the authenticated bot account, returned on a successful connect.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BotIdentity {
    pub id: String,
    pub username: String,
    pub avatar_url: Option<String>,
}

/// Credentials captured from the configuration at connect time.
///
/// `token` stays wrapped so it is redacted from `Debug` output and tracing fields.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub token: SecretString,
    pub guild_id: String,
    pub channel_id: String,
}

/// Failure reported by the runtime.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// Discord refused the request (bad token, unknown guild or channel, missing access).
    #[error("rejected by Discord: {0}")]
    Rejected(String),
    /// Network or gateway failure; the same request may succeed later.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl RuntimeError {
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// The external bot session the control plane drives.
///
/// Implementations own at most one live session. `disconnect` must be safe to call
/// when no session exists.
#[async_trait]
pub trait BotRuntime: Send + Sync {
    /// Opens a session and returns the authenticated bot identity.
    async fn connect(&self, credentials: &Credentials) -> Result<BotIdentity, RuntimeError>;

    /// Tears down the current session, if any.
    async fn disconnect(&self) -> Result<(), RuntimeError>;

    /// Posts `text` to `channel_id` over the current session.
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<(), RuntimeError>;

    /// Replaces the remote command set for `guild_id` (globally when empty) with
    /// exactly `commands`, returning how many are now registered.
    async fn register_commands(
        &self,
        guild_id: &str,
        commands: &[SlashCommandModel],
    ) -> Result<usize, RuntimeError>;
}

/// Parses a Discord snowflake, rejecting anything that is not a non-zero integer.
pub(crate) fn parse_snowflake(kind: &str, value: &str) -> Result<u64, RuntimeError> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .ok_or_else(|| RuntimeError::Rejected(format!("invalid {kind} id '{value}'")))
}
