//! Slash command replies over the gateway.
//!
//! Commands are registered with Discord by the control plane; when a user invokes
//! one, this handler looks the name up in the registered set and replies with the
//! stored response text.

use poise::serenity_prelude as serenity;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

/// Command name to response text for the last successfully registered set.
pub type SharedResponses = Arc<RwLock<HashMap<String, String>>>;

/// Serenity event handler attached to each gateway session.
pub struct InteractionHandler {
    responses: SharedResponses,
}

impl InteractionHandler {
    #[must_use]
    pub const fn new(responses: SharedResponses) -> Self {
        Self { responses }
    }

    /// Finds the reply for an invoked command, if it is part of the registered set.
    pub async fn reply_for(&self, command_name: &str) -> Option<String> {
        self.responses.read().await.get(command_name).cloned()
    }
}

/// Replaces the registered set after a successful bulk registration.
pub async fn replace_responses<'a, I>(responses: &SharedResponses, commands: I)
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut writer = responses.write().await;
    writer.clear();
    writer.extend(
        commands
            .into_iter()
            .map(|(name, response)| (name.to_string(), response.to_string())),
    );
    debug!("Gateway now answers {} command(s)", writer.len());
}

#[async_trait::async_trait]
impl serenity::EventHandler for InteractionHandler {
    async fn ready(&self, _ctx: serenity::Context, ready: serenity::Ready) {
        info!("Gateway session ready as {}", ready.user.name);
    }

    async fn interaction_create(&self, ctx: serenity::Context, interaction: serenity::Interaction) {
        let serenity::Interaction::Command(command) = interaction else {
            return;
        };

        let Some(reply) = self.reply_for(&command.data.name).await else {
            debug!("Ignoring unregistered command /{}", command.data.name);
            return;
        };

        let builder = serenity::CreateInteractionResponse::Message(
            serenity::CreateInteractionResponseMessage::new().content(reply),
        );
        if let Err(e) = command.create_response(&ctx.http, builder).await {
            error!("Failed to answer /{}: {}", command.data.name, e);
        }
    }
}
