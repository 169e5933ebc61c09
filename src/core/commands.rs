//! Slash command registry - local definitions, enabled flags and registration.
//!
//! Enabling a command only flips the local flag. Nothing reaches Discord until
//! [`CommandRegistry::register`] pushes the whole enabled set in one bulk
//! overwrite, so the remote set ends up equal to the locally enabled set
//! (commands disabled since the last push are removed remotely too).

use super::{activity_log::ActivityLog, bounded, connection::ConnectionManager};
use crate::{
    bot::BotRuntime,
    entities::{SlashCommand, slash_command},
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, prelude::*};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Discord's limit on command names.
pub const MAX_NAME_LENGTH: usize = 32;
/// Discord's limit on command descriptions.
pub const MAX_DESCRIPTION_LENGTH: usize = 100;
/// Discord's limit on message content, which bounds the reply text.
pub const MAX_RESPONSE_LENGTH: usize = 2000;

const DEFAULT_COMMANDS: [(&str, &str, &str); 2] = [
    ("ping", "Check that the bot is responsive", "Pong!"),
    (
        "help",
        "Show what this bot can do",
        "Use the slash commands listed in the command picker. Ask a moderator if you need anything else.",
    ),
];

const fn enabled_by_default() -> bool {
    true
}

/// A command definition as submitted by a client.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct NewCommand {
    pub name: String,
    pub description: String,
    pub response: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

/// The three registry mutations, as multiplexed on `POST /commands`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum CommandAction {
    Add { command: NewCommand },
    Toggle { name: String, enabled: bool },
    Register,
}

/// Result of applying a [`CommandAction`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    Added(slash_command::Model),
    Toggled(slash_command::Model),
    Registered { count: usize },
}

/// Lowercases and joins whitespace-separated words with hyphens.
///
/// `"Hello World"` becomes `"hello-world"`.
#[must_use]
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Checks a submitted command and returns it with its name normalized.
///
/// # Errors
/// Returns `Error::Validation` if any field is blank after trimming, the name has
/// characters outside `[a-z0-9-]`, or a field exceeds Discord's limits.
pub fn validate_command(command: NewCommand) -> Result<NewCommand> {
    if command.name.trim().is_empty()
        || command.description.trim().is_empty()
        || command.response.trim().is_empty()
    {
        return Err(Error::validation(
            "name, description and response are all required",
        ));
    }

    let name = normalize_name(&command.name);
    if !is_valid_name(&name) {
        return Err(Error::validation(format!(
            "command name '{name}' may only contain lowercase letters, digits and hyphens"
        )));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(Error::validation(format!(
            "command name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }

    let description = command.description.trim().to_string();
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(Error::validation(format!(
            "description must be at most {MAX_DESCRIPTION_LENGTH} characters"
        )));
    }
    if command.response.chars().count() > MAX_RESPONSE_LENGTH {
        return Err(Error::validation(format!(
            "response must be at most {MAX_RESPONSE_LENGTH} characters"
        )));
    }

    Ok(NewCommand {
        name,
        description,
        response: command.response,
        enabled: command.enabled,
    })
}

/// Shared handle to the command registry.
#[derive(Clone)]
pub struct CommandRegistry {
    db: DatabaseConnection,
    runtime: Arc<dyn BotRuntime>,
    connection: Arc<ConnectionManager>,
    log: ActivityLog,
    request_timeout: Duration,
    write_lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl CommandRegistry {
    #[must_use]
    pub fn new(
        db: DatabaseConnection,
        runtime: Arc<dyn BotRuntime>,
        connection: Arc<ConnectionManager>,
        log: ActivityLog,
        request_timeout: Duration,
    ) -> Self {
        Self {
            db,
            runtime,
            connection,
            log,
            request_timeout,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// All commands, ordered by name.
    pub async fn list(&self) -> Result<Vec<slash_command::Model>> {
        SlashCommand::find()
            .order_by_asc(slash_command::Column::Name)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Dispatches one multiplexed action to its operation.
    pub async fn apply(&self, action: CommandAction) -> Result<CommandOutcome> {
        match action {
            CommandAction::Add { command } => self.add(command).await.map(CommandOutcome::Added),
            CommandAction::Toggle { name, enabled } => self
                .toggle(&name, enabled)
                .await
                .map(CommandOutcome::Toggled),
            CommandAction::Register => self
                .register()
                .await
                .map(|count| CommandOutcome::Registered { count }),
        }
    }

    /// Adds a new command; the name is normalized before the uniqueness check.
    #[instrument(skip(self, command), fields(name = %command.name))]
    pub async fn add(&self, command: NewCommand) -> Result<slash_command::Model> {
        let command = match validate_command(command) {
            Ok(command) => command,
            Err(e) => {
                self.log.warning(format!("Command rejected: {e}")).await;
                return Err(e);
            }
        };

        let _guard = self.write_lock.lock().await;
        if SlashCommand::find_by_id(command.name.clone())
            .one(&self.db)
            .await?
            .is_some()
        {
            let e = Error::validation(format!("command /{} already exists", command.name));
            self.log.warning(format!("Command rejected: {e}")).await;
            return Err(e);
        }

        let created = slash_command::ActiveModel {
            name: Set(command.name),
            description: Set(command.description),
            response: Set(command.response),
            enabled: Set(command.enabled),
        }
        .insert(&self.db)
        .await?;

        self.log
            .success(format!("Command /{} created", created.name))
            .await;
        Ok(created)
    }

    /// Sets the local enabled flag. Does not contact Discord.
    #[instrument(skip(self))]
    pub async fn toggle(&self, name: &str, enabled: bool) -> Result<slash_command::Model> {
        let name = normalize_name(name);
        let _guard = self.write_lock.lock().await;

        let Some(existing) = SlashCommand::find_by_id(name.clone()).one(&self.db).await? else {
            self.log
                .warning(format!("Cannot toggle /{name}: command not found"))
                .await;
            return Err(Error::NotFound { name });
        };

        let mut active: slash_command::ActiveModel = existing.into();
        active.enabled = Set(enabled);
        let updated = active.update(&self.db).await?;

        let state = if enabled { "enabled" } else { "disabled" };
        self.log
            .success(format!("Command /{} {state}", updated.name))
            .await;
        Ok(updated)
    }

    /// Pushes every enabled command to Discord, replacing the remote set.
    #[instrument(skip(self))]
    pub async fn register(&self) -> Result<usize> {
        let session = match self.connection.session().await {
            Ok(session) => session,
            Err(e) => {
                self.log
                    .warning("Cannot register commands: bot is not connected")
                    .await;
                return Err(e);
            }
        };

        let _guard = self.write_lock.lock().await;
        let enabled = SlashCommand::find()
            .filter(slash_command::Column::Enabled.eq(true))
            .order_by_asc(slash_command::Column::Name)
            .all(&self.db)
            .await?;
        debug!("Registering {} enabled command(s)", enabled.len());

        match bounded(
            self.request_timeout,
            self.runtime.register_commands(&session.guild_id, &enabled),
        )
        .await
        {
            Ok(count) => {
                self.log
                    .success(format!("Registered {count} command(s) with Discord"))
                    .await;
                Ok(count)
            }
            Err(e) => {
                self.log
                    .error(format!("Command registration failed: {e}"))
                    .await;
                Err(Error::Registration {
                    message: e.to_string(),
                    retryable: e.is_retryable(),
                })
            }
        }
    }

    /// Inserts the built-in commands when the registry is empty. Returns how many were added.
    pub async fn seed_defaults(&self) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        if SlashCommand::find().count(&self.db).await? > 0 {
            return Ok(0);
        }

        for (name, description, response) in DEFAULT_COMMANDS {
            slash_command::ActiveModel {
                name: Set(name.to_string()),
                description: Set(description.to_string()),
                response: Set(response.to_string()),
                enabled: Set(true),
            }
            .insert(&self.db)
            .await?;
        }
        Ok(DEFAULT_COMMANDS.len())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::bot::RuntimeError;
    use crate::core::{ControlPlane, config_store::ConfigUpdate};
    use crate::entities::LogKind;
    use crate::test_utils::{MockRuntime, setup_control_plane};

    fn new_command(name: &str) -> NewCommand {
        NewCommand {
            name: name.to_string(),
            description: "d".to_string(),
            response: "r".to_string(),
            enabled: true,
        }
    }

    async fn connected_plane(runtime: Arc<MockRuntime>) -> Result<ControlPlane> {
        let plane = setup_control_plane(runtime).await?;
        plane
            .config
            .update(ConfigUpdate {
                token: Some("token".to_string()),
                guild_id: Some("100".to_string()),
                ..Default::default()
            })
            .await?;
        plane.connection.connect().await?;
        Ok(plane)
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Hello World"), "hello-world");
        assert_eq!(normalize_name("  Server   Rules "), "server-rules");
        assert_eq!(normalize_name("ping"), "ping");
    }

    #[test]
    fn test_validate_command_rejects_bad_input() {
        let blank = NewCommand {
            description: "   ".to_string(),
            ..new_command("ok")
        };
        assert!(matches!(
            validate_command(blank),
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            validate_command(new_command("what?")),
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            validate_command(new_command(&"a".repeat(MAX_NAME_LENGTH + 1))),
            Err(Error::Validation { .. })
        ));
        let long_response = NewCommand {
            response: "x".repeat(MAX_RESPONSE_LENGTH + 1),
            ..new_command("ok")
        };
        assert!(matches!(
            validate_command(long_response),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn test_action_deserialization() {
        let add: CommandAction = serde_json::from_str(
            r#"{"action":"add","command":{"name":"Hello World","description":"d","response":"r","enabled":true}}"#,
        )
        .unwrap();
        assert!(matches!(add, CommandAction::Add { .. }));

        let toggle: CommandAction =
            serde_json::from_str(r#"{"action":"toggle","name":"ping","enabled":false}"#).unwrap();
        assert_eq!(
            toggle,
            CommandAction::Toggle {
                name: "ping".to_string(),
                enabled: false
            }
        );

        let register: CommandAction = serde_json::from_str(r#"{"action":"register"}"#).unwrap();
        assert_eq!(register, CommandAction::Register);

        assert!(serde_json::from_str::<CommandAction>(r#"{"action":"delete"}"#).is_err());
    }

    #[tokio::test]
    async fn test_add_normalizes_and_defaults_enabled() -> Result<()> {
        let plane = setup_control_plane(MockRuntime::new()).await?;
        let command: NewCommand = serde_json::from_str(
            r#"{"name":"Hello World","description":"d","response":"r"}"#,
        )
        .unwrap();

        let created = plane.commands.add(command).await?;
        assert_eq!(created.name, "hello-world");
        assert!(created.enabled);

        let latest = &plane.log.list().await?[0];
        assert_eq!(latest.kind, LogKind::Success);
        assert_eq!(latest.message, "Command /hello-world created");
        Ok(())
    }

    #[tokio::test]
    async fn test_add_duplicate_leaves_registry_unchanged() -> Result<()> {
        let plane = setup_control_plane(MockRuntime::new()).await?;
        plane.commands.add(new_command("hello-world")).await?;
        let before = plane.commands.list().await?.len();

        let result = plane.commands.add(new_command("Hello World")).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        assert_eq!(plane.commands.list().await?.len(), before);
        assert_eq!(plane.log.list().await?[0].kind, LogKind::Warning);
        Ok(())
    }

    #[tokio::test]
    async fn test_toggle_unknown_command() -> Result<()> {
        let plane = setup_control_plane(MockRuntime::new()).await?;
        let result = plane.commands.toggle("missing", false).await;
        assert!(matches!(result, Err(Error::NotFound { name }) if name == "missing"));
        Ok(())
    }

    #[tokio::test]
    async fn test_toggle_does_not_contact_discord() -> Result<()> {
        let runtime = MockRuntime::new();
        let plane = connected_plane(Arc::clone(&runtime)).await?;
        plane.commands.add(new_command("hello-world")).await?;

        let toggled = plane.commands.toggle("hello-world", false).await?;
        assert!(!toggled.enabled);
        assert_eq!(runtime.register_calls(), 0);
        assert_eq!(plane.log.list().await?[0].message, "Command /hello-world disabled");
        Ok(())
    }

    #[tokio::test]
    async fn test_register_requires_connection() -> Result<()> {
        let runtime = MockRuntime::new();
        let plane = setup_control_plane(Arc::clone(&runtime)).await?;

        let result = plane.commands.register().await;
        assert!(matches!(result, Err(Error::NotConnected)));
        assert_eq!(runtime.register_calls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_register_pushes_only_enabled_and_is_idempotent() -> Result<()> {
        let runtime = MockRuntime::new();
        let plane = connected_plane(Arc::clone(&runtime)).await?;
        plane.commands.add(new_command("hello-world")).await?;
        plane.commands.add(new_command("rules")).await?;
        plane.commands.toggle("hello-world", false).await?;

        let first = plane.commands.register().await?;
        let second = plane.commands.register().await?;
        assert_eq!(first, 1);
        assert_eq!(first, second);
        assert_eq!(runtime.registered_names(), vec!["rules".to_string()]);
        assert_eq!(runtime.registered_guild().as_deref(), Some("100"));
        Ok(())
    }

    #[tokio::test]
    async fn test_register_failure_surfaces_and_logs() -> Result<()> {
        let runtime = MockRuntime::new();
        let plane = connected_plane(Arc::clone(&runtime)).await?;
        plane.commands.add(new_command("rules")).await?;
        runtime.fail_register_with(RuntimeError::Transport("503".to_string()));

        let result = plane.commands.register().await;
        let err = result.unwrap_err();
        assert!(matches!(err, Error::Registration { .. }));
        assert!(err.is_retryable());

        let latest = &plane.log.list().await?[0];
        assert_eq!(latest.kind, LogKind::Error);
        // Local intent is kept even though the push failed.
        assert!(plane.commands.list().await?[0].enabled);
        Ok(())
    }

    #[tokio::test]
    async fn test_apply_dispatches_each_action() -> Result<()> {
        let runtime = MockRuntime::new();
        let plane = connected_plane(Arc::clone(&runtime)).await?;

        let added = plane
            .commands
            .apply(CommandAction::Add {
                command: new_command("faq"),
            })
            .await?;
        assert!(matches!(added, CommandOutcome::Added(ref c) if c.name == "faq"));

        let toggled = plane
            .commands
            .apply(CommandAction::Toggle {
                name: "faq".to_string(),
                enabled: false,
            })
            .await?;
        assert!(matches!(toggled, CommandOutcome::Toggled(ref c) if !c.enabled));

        let registered = plane.commands.apply(CommandAction::Register).await?;
        assert_eq!(registered, CommandOutcome::Registered { count: 0 });
        Ok(())
    }
}
