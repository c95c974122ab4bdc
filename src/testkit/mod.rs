//! # Testkit Module
//!
//! Recording doubles for the engine's ports, used by the test suite and the
//! demo binary. Each double records every call so tests can assert on the
//! exact interaction, and each failure toggle simulates one platform
//! misbehavior (denied exact scheduling, rejected registrations, store
//! outages, dead streams).
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.3.0

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

use crate::core::Reminder;
use crate::ports::{AlarmPort, AlertAction, NotificationPort, ReminderStore};
use crate::store::MemoryStore;

/// One registration held by the recording alarm port.
#[derive(Debug, Clone)]
pub struct RecordedAlarm {
    pub trigger_at: DateTime<Utc>,
    pub payload: Vec<u8>,
}

/// Alarm port double that records registrations instead of arming timers.
pub struct RecordingAlarmPort {
    alarms: DashMap<String, RecordedAlarm>,
    failing_keys: DashMap<String, ()>,
    exact_allowed: AtomicBool,
    pub schedule_calls: AtomicUsize,
    pub cancel_calls: AtomicUsize,
}

impl RecordingAlarmPort {
    pub fn new() -> Self {
        RecordingAlarmPort {
            alarms: DashMap::new(),
            failing_keys: DashMap::new(),
            exact_allowed: AtomicBool::new(true),
            schedule_calls: AtomicUsize::new(0),
            cancel_calls: AtomicUsize::new(0),
        }
    }

    /// Simulate the platform denying exact-alarm capability.
    pub fn deny_exact(&self) {
        self.exact_allowed.store(false, Ordering::Relaxed);
    }

    /// Reject any future registration of this key.
    pub fn fail_key(&self, key: &str) {
        self.failing_keys.insert(key.to_string(), ());
    }

    /// Registration keys currently live, sorted for stable assertions.
    pub fn registered_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.alarms.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Trigger instant of one registration, if it is live.
    pub fn alarm_at(&self, key: &str) -> Option<DateTime<Utc>> {
        self.alarms.get(key).map(|a| a.trigger_at)
    }

    /// Payload of one registration, if it is live.
    pub fn payload(&self, key: &str) -> Option<Vec<u8>> {
        self.alarms.get(key).map(|a| a.payload.clone())
    }
}

impl Default for RecordingAlarmPort {
    fn default() -> Self {
        Self::new()
    }
}

impl AlarmPort for RecordingAlarmPort {
    fn schedule_at(&self, key: &str, at: DateTime<Utc>, payload: Vec<u8>) -> Result<()> {
        self.schedule_calls.fetch_add(1, Ordering::Relaxed);
        if self.failing_keys.contains_key(key) {
            anyhow::bail!("registration rejected for {key}");
        }
        self.alarms.insert(
            key.to_string(),
            RecordedAlarm {
                trigger_at: at,
                payload,
            },
        );
        Ok(())
    }

    fn cancel(&self, key: &str) -> Result<()> {
        self.cancel_calls.fetch_add(1, Ordering::Relaxed);
        self.alarms.remove(key);
        Ok(())
    }

    fn can_schedule_exact(&self) -> bool {
        self.exact_allowed.load(Ordering::Relaxed)
    }
}

/// One alert captured by the recording notification port.
#[derive(Debug, Clone)]
pub struct PresentedAlert {
    pub occurrence_key: String,
    pub title: String,
    pub detail: Option<String>,
    pub actions: Vec<AlertAction>,
}

/// Notification port double that records presentations and withdrawals.
pub struct RecordingNotificationPort {
    presented: Mutex<Vec<PresentedAlert>>,
    withdrawn: Mutex<Vec<String>>,
    fail_present: AtomicBool,
}

impl RecordingNotificationPort {
    pub fn new() -> Self {
        RecordingNotificationPort {
            presented: Mutex::new(Vec::new()),
            withdrawn: Mutex::new(Vec::new()),
            fail_present: AtomicBool::new(false),
        }
    }

    /// Make every subsequent presentation fail.
    pub fn fail_presentations(&self) {
        self.fail_present.store(true, Ordering::Relaxed);
    }

    /// Every alert presented so far, in order.
    pub fn presented(&self) -> Vec<PresentedAlert> {
        self.presented.lock().unwrap().clone()
    }

    /// Every occurrence key withdrawn so far, in order.
    pub fn withdrawn(&self) -> Vec<String> {
        self.withdrawn.lock().unwrap().clone()
    }
}

impl Default for RecordingNotificationPort {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationPort for RecordingNotificationPort {
    fn present(
        &self,
        occurrence_key: &str,
        title: &str,
        detail: Option<&str>,
        actions: &[AlertAction],
    ) -> Result<()> {
        if self.fail_present.load(Ordering::Relaxed) {
            anyhow::bail!("presentation channel down");
        }
        self.presented.lock().unwrap().push(PresentedAlert {
            occurrence_key: occurrence_key.to_string(),
            title: title.to_string(),
            detail: detail.map(String::from),
            actions: actions.to_vec(),
        });
        Ok(())
    }

    fn withdraw(&self, occurrence_key: &str) {
        self.withdrawn
            .lock()
            .unwrap()
            .push(occurrence_key.to_string());
    }
}

/// Store double wrapping `MemoryStore` with call counting and failure
/// toggles. `single_shot` streams deliver the current snapshot and close,
/// which lets cache tests observe TTL-driven refetches.
pub struct CountingStore {
    inner: MemoryStore,
    single_shot: AtomicBool,
    streams_failing: AtomicBool,
    pub stream_calls: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        CountingStore {
            inner: MemoryStore::new(),
            single_shot: AtomicBool::new(false),
            streams_failing: AtomicBool::new(false),
            stream_calls: AtomicUsize::new(0),
        }
    }

    /// A store whose streams deliver one snapshot then close.
    pub fn single_shot() -> Self {
        let store = Self::new();
        store.single_shot.store(true, Ordering::Relaxed);
        store
    }

    /// Seed a reminder without going through the engine.
    pub async fn seed(&self, reminder: Reminder) {
        // Direct insert path; seeding never fails
        self.inner
            .save(&reminder)
            .await
            .expect("seeding a healthy memory store");
    }

    /// Make every subsequent stream subscription fail.
    pub fn fail_streams(&self) {
        self.streams_failing.store(true, Ordering::Relaxed);
    }
}

impl Default for CountingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReminderStore for CountingStore {
    async fn get(&self, id: &str) -> Result<Option<Reminder>> {
        self.inner.get(id).await
    }

    async fn save(&self, reminder: &Reminder) -> Result<()> {
        self.inner.save(reminder).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.inner.delete(id).await
    }

    async fn stream_by_user(&self, user_id: &str) -> Result<mpsc::Receiver<Vec<Reminder>>> {
        self.stream_calls.fetch_add(1, Ordering::Relaxed);
        if self.streams_failing.load(Ordering::Relaxed) {
            anyhow::bail!("stream subscription refused");
        }
        if self.single_shot.load(Ordering::Relaxed) {
            let (tx, rx) = mpsc::channel(1);
            let _ = tx.send(self.inner.reminders_for(user_id)).await;
            // tx drops here; the receiver sees one snapshot then the end
            return Ok(rx);
        }
        self.inner.stream_by_user(user_id).await
    }
}
