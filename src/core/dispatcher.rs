//! Message dispatcher - posts a single message to the configured channel.
//!
//! Sending is fire-once: there is no queue and no retry. The draft stored in the
//! configuration is never read or cleared here; callers pass the text explicitly.

use super::{activity_log::ActivityLog, bounded, connection::ConnectionManager};
use crate::{
    bot::BotRuntime,
    errors::{Error, Result},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Discord's limit on message content.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

#[derive(Clone)]
pub struct MessageDispatcher {
    runtime: Arc<dyn BotRuntime>,
    connection: Arc<ConnectionManager>,
    log: ActivityLog,
    request_timeout: Duration,
}

impl std::fmt::Debug for MessageDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageDispatcher")
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl MessageDispatcher {
    #[must_use]
    pub fn new(
        runtime: Arc<dyn BotRuntime>,
        connection: Arc<ConnectionManager>,
        log: ActivityLog,
        request_timeout: Duration,
    ) -> Self {
        Self {
            runtime,
            connection,
            log,
            request_timeout,
        }
    }

    async fn refuse(&self, error: Error) -> Error {
        self.log.warning(format!("Message not sent: {error}")).await;
        error
    }

    /// Posts `text` to the channel captured when the session was opened.
    #[instrument(skip(self, text), fields(len = text.chars().count()))]
    pub async fn send(&self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Err(self.refuse(Error::validation("message text is empty")).await);
        }
        if text.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(self
                .refuse(Error::validation(format!(
                    "message exceeds {MAX_MESSAGE_LENGTH} characters"
                )))
                .await);
        }

        let session = match self.connection.session().await {
            Ok(session) => session,
            Err(e) => return Err(self.refuse(e).await),
        };
        if session.channel_id.is_empty() {
            return Err(self
                .refuse(Error::configuration(
                    "no channel ID was configured when the bot connected",
                ))
                .await);
        }

        match bounded(
            self.request_timeout,
            self.runtime.send_message(&session.channel_id, text),
        )
        .await
        {
            Ok(()) => {
                self.log
                    .success(format!("Message sent to channel {}", session.channel_id))
                    .await;
                Ok(())
            }
            Err(e) => {
                self.log.error(format!("Failed to send message: {e}")).await;
                Err(Error::Delivery {
                    message: e.to_string(),
                    retryable: e.is_retryable(),
                })
            }
        }
    }
}
