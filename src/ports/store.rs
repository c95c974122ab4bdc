//! Reminder store collaborator trait
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::Reminder;

/// Persistence collaborator for reminders.
///
/// The engine never assumes a specific persistence protocol; implementations
/// may be backed by a document database, a local file, or memory. Store
/// reads and writes are the engine's only suspension points.
#[async_trait]
pub trait ReminderStore: Send + Sync {
    /// Fetch one reminder by id. `Ok(None)` when the id is unknown.
    async fn get(&self, id: &str) -> Result<Option<Reminder>>;

    /// Create or replace a reminder.
    async fn save(&self, reminder: &Reminder) -> Result<()>;

    /// Delete a reminder by id. Deleting an unknown id is not an error.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Subscribe to snapshots of one user's reminders. The receiver yields
    /// the current snapshot promptly after subscription and a fresh snapshot
    /// after every mutation; the channel closes when the store shuts the
    /// subscription down.
    async fn stream_by_user(&self, user_id: &str) -> Result<mpsc::Receiver<Vec<Reminder>>>;
}
