//! Unified error types for the bot control plane.
//!
//! Every failure the dashboard can observe is one of these variants. Errors coming
//! back from the Discord runtime are translated into `Connection`, `Delivery` or
//! `Registration` at the component boundary, never surfaced raw.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A prerequisite is missing from the stored configuration (e.g. no token).
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Lifecycle violation or transport failure while connecting.
    #[error("Connection error: {message}")]
    Connection { message: String, retryable: bool },

    /// Malformed input, rejected before any state changes.
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Command '/{name}' not found")]
    NotFound { name: String },

    #[error("Bot is not connected")]
    NotConnected,

    /// A message could not be delivered over a live connection.
    #[error("Delivery error: {message}")]
    Delivery { message: String, retryable: bool },

    /// The bulk command push partially or fully failed.
    #[error("Registration error: {message}")]
    Registration { message: String, retryable: bool },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Process settings (config file, environment) could not be loaded.
    #[error("Settings error: {message}")]
    Settings { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the caller may sensibly retry the same action later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Connection { retryable, .. }
            | Self::Delivery { retryable, .. }
            | Self::Registration { retryable, .. } => *retryable,
            _ => false,
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
