//! Slash command entity - locally defined commands and their enabled flag.
//!
//! Whether a command is live on Discord is decided separately by registration;
//! see `core::commands::register`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Slash command database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "slash_commands")]
pub struct Model {
    /// Normalized command name (e.g. "hello-world"), immutable once created
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,
    /// Short description shown in the Discord command picker
    pub description: String,
    /// Text the bot replies with when the command is invoked
    pub response: String,
    /// Local enabled flag; only enabled commands are pushed on registration
    pub enabled: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
