//! Database configuration module.
//!
//! Handles the `SQLite` connection and table creation using `SeaORM`. Tables are
//! generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs without hand-written SQL.

use crate::entities::{BotConfig, LogEntry, SlashCommand};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use std::path::Path;
use tracing::{debug, info};

/// File path of a file-backed `SQLite` URL, `None` for in-memory databases.
fn sqlite_file_path(database_url: &str) -> Option<&Path> {
    let rest = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" || path == "memory" || path.starts_with("file::memory:") {
        return None;
    }
    Some(Path::new(path))
}

/// Establishes a connection to the database at `database_url`.
///
/// For file-backed `SQLite` URLs the parent directory is created first, since
/// `mode=rwc` only creates the file itself.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    if let Some(parent) = sqlite_file_path(database_url).and_then(Path::parent) {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating database directory {:?}", parent);
            std::fs::create_dir_all(parent)?;
        }
    }
    info!("Connecting to database...");
    Database::connect(database_url).await.map_err(Into::into)
}

/// Creates the configuration, command and activity log tables if they are missing.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut bot_config_table = schema.create_table_from_entity(BotConfig);
    let mut slash_command_table = schema.create_table_from_entity(SlashCommand);
    let mut log_entry_table = schema.create_table_from_entity(LogEntry);
    bot_config_table.if_not_exists();
    slash_command_table.if_not_exists();
    log_entry_table.if_not_exists();

    db.execute(builder.build(&bot_config_table)).await?;
    db.execute(builder.build(&slash_command_table)).await?;
    db.execute(builder.build(&log_entry_table)).await?;

    Ok(())
}
