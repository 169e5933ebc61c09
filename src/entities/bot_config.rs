//! Bot configuration entity - the singleton row holding credentials and the draft message.
//!
//! The row is never serialized directly: readers only ever see the redacted
//! `core::config_store::ConfigView`. Connection status is not persisted, since no
//! Discord session survives a restart.

use sea_orm::entity::prelude::*;

/// Primary key of the one and only configuration row.
pub const SINGLETON_ID: i32 = 1;

/// Bot configuration database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "bot_config")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    /// Discord bot token, empty when unset
    pub token: String,
    /// Target guild (server) snowflake, empty when unset
    pub guild_id: String,
    /// Target channel snowflake, empty when unset
    pub channel_id: String,
    /// Last composed draft, independent of anything actually sent
    pub message: String,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
