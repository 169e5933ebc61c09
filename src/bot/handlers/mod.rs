//! Discord gateway handlers
//!
//! The live session only needs to answer slash command invocations; everything
//! else is driven from the REST side.

/// Replies to registered slash commands with their configured response
pub mod interaction;

pub use interaction::{InteractionHandler, SharedResponses};
