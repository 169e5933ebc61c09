//! Entity module - SeaORM definitions for the control plane's three tables.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod bot_config;
pub mod log_entry;
pub mod slash_command;

// Re-export specific types to avoid conflicts
pub use bot_config::{Entity as BotConfig, Model as BotConfigModel};
pub use log_entry::{Entity as LogEntry, LogKind, Model as LogEntryModel};
pub use slash_command::{Entity as SlashCommand, Model as SlashCommandModel};
