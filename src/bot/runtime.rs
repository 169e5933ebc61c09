//! Serenity-backed runtime - owns the gateway session and talks to Discord's REST API.

use super::handlers::{InteractionHandler, SharedResponses, interaction::replace_responses};
use super::{BotIdentity, BotRuntime, Credentials, RuntimeError, parse_snowflake};
use crate::entities::SlashCommandModel;
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use secrecy::ExposeSecret;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

/// A live gateway session plus the REST client bound to the same token.
struct Session {
    http: Arc<serenity::Http>,
    shard_manager: Arc<serenity::ShardManager>,
    gateway_task: JoinHandle<()>,
}

/// Production [`BotRuntime`] built on Serenity.
///
/// Holds at most one session. The registered response set outlives sessions so a
/// reconnect keeps answering the commands Discord still has registered.
pub struct SerenityRuntime {
    session: Mutex<Option<Session>>,
    responses: SharedResponses,
}

impl Default for SerenityRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl SerenityRuntime {
    #[must_use]
    pub fn new() -> Self {
        Self {
            session: Mutex::new(None),
            responses: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn http(&self) -> Result<Arc<serenity::Http>, RuntimeError> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|session| Arc::clone(&session.http))
            .ok_or_else(|| RuntimeError::Rejected("no active gateway session".to_string()))
    }
}

/// Splits Serenity failures into requests Discord refused and transport problems.
fn classify(error: &serenity::Error) -> RuntimeError {
    match error {
        serenity::Error::Http(http_error)
            if http_error
                .status_code()
                .is_some_and(|status| status.is_client_error()) =>
        {
            RuntimeError::Rejected(error.to_string())
        }
        _ => RuntimeError::Transport(error.to_string()),
    }
}

async fn shutdown(session: Session) {
    session.shard_manager.shutdown_all().await;
    session.gateway_task.abort();
}

#[async_trait]
impl BotRuntime for SerenityRuntime {
    #[instrument(skip(self, credentials), fields(guild_id = %credentials.guild_id, channel_id = %credentials.channel_id))]
    async fn connect(&self, credentials: &Credentials) -> Result<BotIdentity, RuntimeError> {
        let mut slot = self.session.lock().await;
        if let Some(stale) = slot.take() {
            warn!("Replacing a stale gateway session before reconnecting");
            shutdown(stale).await;
        }

        let token = credentials.token.expose_secret();
        let http = Arc::new(serenity::Http::new(token));
        let user = http.get_current_user().await.map_err(|e| classify(&e))?;

        if !credentials.guild_id.trim().is_empty() {
            let guild_id = serenity::GuildId::new(parse_snowflake("guild", &credentials.guild_id)?);
            guild_id
                .to_partial_guild(&*http)
                .await
                .map_err(|e| classify(&e))?;
        }
        if !credentials.channel_id.trim().is_empty() {
            let channel_id =
                serenity::ChannelId::new(parse_snowflake("channel", &credentials.channel_id)?);
            channel_id.to_channel(&*http).await.map_err(|e| classify(&e))?;
        }

        let intents = serenity::GatewayIntents::GUILDS;
        info!("Setting up Serenity client...");
        let mut client = serenity::Client::builder(token, intents)
            .event_handler(InteractionHandler::new(Arc::clone(&self.responses)))
            .await
            .map_err(|e| classify(&e))?;

        let shard_manager = Arc::clone(&client.shard_manager);
        let client_http = Arc::clone(&client.http);
        let gateway_task = tokio::spawn(async move {
            info!("Starting bot client...");
            if let Err(why) = client.start().await {
                error!("Client error: {:?}", why);
            }
        });

        *slot = Some(Session {
            http: client_http,
            shard_manager,
            gateway_task,
        });

        info!("Logged in as {}", user.name);
        Ok(BotIdentity {
            id: user.id.to_string(),
            username: user.name.clone(),
            avatar_url: user.avatar_url(),
        })
    }

    async fn disconnect(&self) -> Result<(), RuntimeError> {
        if let Some(session) = self.session.lock().await.take() {
            info!("Shutting down gateway session...");
            shutdown(session).await;
        }
        Ok(())
    }

    async fn send_message(&self, channel_id: &str, text: &str) -> Result<(), RuntimeError> {
        let http = self.http().await?;
        let channel_id = serenity::ChannelId::new(parse_snowflake("channel", channel_id)?);
        channel_id
            .say(&*http, text)
            .await
            .map_err(|e| classify(&e))?;
        Ok(())
    }

    async fn register_commands(
        &self,
        guild_id: &str,
        commands: &[SlashCommandModel],
    ) -> Result<usize, RuntimeError> {
        let http = self.http().await?;
        let builders: Vec<serenity::CreateCommand> = commands
            .iter()
            .map(|command| {
                serenity::CreateCommand::new(command.name.as_str())
                    .description(command.description.as_str())
            })
            .collect();

        // Both calls overwrite the whole remote set, which also removes commands
        // that are no longer enabled locally.
        let registered = if guild_id.trim().is_empty() {
            info!("Registering {} command(s) globally...", builders.len());
            serenity::Command::set_global_commands(&http, builders)
                .await
                .map_err(|e| classify(&e))?
        } else {
            let guild_id = serenity::GuildId::new(parse_snowflake("guild", guild_id)?);
            info!("Registering {} command(s) in guild {}...", builders.len(), guild_id);
            guild_id
                .set_commands(&http, builders)
                .await
                .map_err(|e| classify(&e))?
        };

        replace_responses(
            &self.responses,
            commands
                .iter()
                .map(|command| (command.name.as_str(), command.response.as_str())),
        )
        .await;
        Ok(registered.len())
    }
}
