//! # In-Memory Reminder Store
//!
//! DashMap-backed `ReminderStore` with live per-user snapshot streams.
//! Used by the demo binary and throughout the test suite; also a reasonable
//! starting point for embedding the engine without a remote store.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.3.0

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

use crate::core::Reminder;
use crate::ports::ReminderStore;

const STREAM_BUFFER: usize = 16;

/// In-process reminder store.
pub struct MemoryStore {
    reminders: DashMap<String, Reminder>,
    subscribers: DashMap<String, Vec<mpsc::Sender<Vec<Reminder>>>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            reminders: DashMap::new(),
            subscribers: DashMap::new(),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// All reminders currently stored for one user, unordered.
    pub fn reminders_for(&self, user_id: &str) -> Vec<Reminder> {
        self.reminders
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Make every subsequent write fail, simulating a store outage.
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::Relaxed);
    }

    /// End a simulated outage.
    pub fn recover_writes(&self) {
        self.fail_writes.store(false, Ordering::Relaxed);
    }

    async fn notify(&self, user_id: &str) {
        let senders = self
            .subscribers
            .get(user_id)
            .map(|subs| subs.clone())
            .unwrap_or_default();
        if senders.is_empty() {
            return;
        }

        let snapshot = self.reminders_for(user_id);
        let mut closed = false;
        for sender in senders {
            if sender.send(snapshot.clone()).await.is_err() {
                closed = true;
            }
        }
        if closed {
            if let Some(mut subs) = self.subscribers.get_mut(user_id) {
                subs.retain(|tx| !tx.is_closed());
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReminderStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<Reminder>> {
        Ok(self.reminders.get(id).map(|r| r.clone()))
    }

    async fn save(&self, reminder: &Reminder) -> Result<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            anyhow::bail!("simulated store outage");
        }
        self.reminders
            .insert(reminder.id.clone(), reminder.clone());
        debug!("saved reminder {} for user {}", reminder.id, reminder.user_id);
        self.notify(&reminder.user_id).await;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            anyhow::bail!("simulated store outage");
        }
        if let Some((_, removed)) = self.reminders.remove(id) {
            debug!("deleted reminder {id}");
            self.notify(&removed.user_id).await;
        }
        Ok(())
    }

    async fn stream_by_user(&self, user_id: &str) -> Result<mpsc::Receiver<Vec<Reminder>>> {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        // Deliver the current snapshot promptly so subscribers start warm
        let _ = tx.send(self.reminders_for(user_id)).await;
        self.subscribers
            .entry(user_id.to_string())
            .or_default()
            .push(tx);
        Ok(rx)
    }
}
