//! Activity log - the append-only, operator-facing record of outcomes.
//!
//! Every state-changing operation appends one entry whether it succeeded or not.
//! Appends never fail the caller: storage problems are reported through `tracing`
//! and otherwise swallowed. Reads are newest first, ordered by `id`, so entries
//! sharing a timestamp keep their insertion order.

use crate::{
    config::app::ActivityLogConfig,
    entities::{LogEntry, LogKind, log_entry},
    errors::Result,
};
use chrono::Utc;
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error};

/// Shared handle to the persisted activity log.
#[derive(Clone, Debug)]
pub struct ActivityLog {
    db: DatabaseConnection,
    max_entries: u64,
    list_limit: u64,
    write_lock: Arc<Mutex<()>>,
}

impl ActivityLog {
    #[must_use]
    pub fn new(db: DatabaseConnection, config: &ActivityLogConfig) -> Self {
        Self {
            db,
            max_entries: config.max_entries,
            list_limit: config.list_limit,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Appends an entry. Never fails; storage errors are only traced.
    pub async fn append(&self, kind: LogKind, message: impl Into<String>) {
        let message = message.into();
        debug!(kind = ?kind, "activity: {}", message);
        if let Err(e) = self.try_append(kind, message).await {
            error!("Failed to persist activity log entry: {}", e);
        }
    }

    pub async fn info(&self, message: impl Into<String>) {
        self.append(LogKind::Info, message).await;
    }

    pub async fn success(&self, message: impl Into<String>) {
        self.append(LogKind::Success, message).await;
    }

    pub async fn warning(&self, message: impl Into<String>) {
        self.append(LogKind::Warning, message).await;
    }

    pub async fn error(&self, message: impl Into<String>) {
        self.append(LogKind::Error, message).await;
    }

    async fn try_append(&self, kind: LogKind, message: String) -> Result<log_entry::Model> {
        let _guard = self.write_lock.lock().await;

        let entry = log_entry::ActiveModel {
            timestamp: Set(Utc::now()),
            kind: Set(kind),
            message: Set(message),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        self.prune().await?;
        Ok(entry)
    }

    /// Drops everything older than the newest `max_entries` entries.
    async fn prune(&self) -> Result<()> {
        let first_dropped = LogEntry::find()
            .order_by_desc(log_entry::Column::Id)
            .offset(self.max_entries)
            .one(&self.db)
            .await?;

        if let Some(entry) = first_dropped {
            let removed = LogEntry::delete_many()
                .filter(log_entry::Column::Id.lte(entry.id))
                .exec(&self.db)
                .await?;
            debug!("Pruned {} activity log entries", removed.rows_affected);
        }
        Ok(())
    }

    /// Returns the most recent entries, newest first.
    pub async fn list(&self) -> Result<Vec<log_entry::Model>> {
        LogEntry::find()
            .order_by_desc(log_entry::Column::Id)
            .limit(self.list_limit)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }
}
