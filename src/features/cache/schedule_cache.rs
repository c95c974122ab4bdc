//! # Schedule Cache
//!
//! TTL + debounce layer in front of the reminder store. Owns no business
//! logic, only freshness and coalescing: snapshots stay fresh for a TTL
//! (default 30 s), one live subscription per user keeps them pushed, and
//! bursty snapshot deliveries are debounced into a single sorted downstream
//! notification.
//!
//! While the live subscription is attached, freshness is maintained by
//! pushes rather than TTL refetches; the TTL matters when the subscription
//! has ended and a caller comes back later.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.2.0: Bucketed soon/future/previous view
//! - 1.1.0: Debounced snapshot coalescing with single sort per flush
//! - 1.0.0: TTL snapshot cache over the store subscription

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, warn};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::core::{EngineConfig, Reminder};
use crate::ports::ReminderStore;

struct CachedSnapshot {
    reminders: Vec<Reminder>,
    fetched_at: Instant,
}

/// Reminders bucketed the way list views group them.
#[derive(Debug, Clone, Default)]
pub struct ReminderBuckets {
    /// Due within the next 24 hours, soonest first
    pub soon: Vec<Reminder>,
    /// Due beyond 24 hours, soonest first
    pub future: Vec<Reminder>,
    /// Already due, most recent first
    pub previous: Vec<Reminder>,
}

/// TTL + debounce cache over the reminder store.
#[derive(Clone)]
pub struct ScheduleCache {
    store: Arc<dyn ReminderStore>,
    ttl: Duration,
    debounce: Duration,
    snapshots: Arc<DashMap<String, CachedSnapshot>>,
    subscriptions: Arc<DashMap<String, JoinHandle<()>>>,
    pending: Arc<DashMap<String, Vec<Reminder>>>,
    flush_scheduled: Arc<DashMap<String, ()>>,
    watchers: Arc<DashMap<String, watch::Sender<Vec<Reminder>>>>,
}

impl ScheduleCache {
    pub fn new(store: Arc<dyn ReminderStore>, config: &EngineConfig) -> Self {
        ScheduleCache {
            store,
            ttl: config.cache_ttl,
            debounce: config.debounce,
            snapshots: Arc::new(DashMap::new()),
            subscriptions: Arc::new(DashMap::new()),
            pending: Arc::new(DashMap::new()),
            flush_scheduled: Arc::new(DashMap::new()),
            watchers: Arc::new(DashMap::new()),
        }
    }

    /// All reminders for one user, served from cache while fresh. The first
    /// call per user opens the store subscription; later calls attach to it
    /// instead of creating a duplicate. A subscription failure surfaces an
    /// empty result but never clears a still-valid cached snapshot.
    pub async fn get_all(&self, user_id: &str) -> Vec<Reminder> {
        if let Some(snapshot) = self.snapshots.get(user_id) {
            if snapshot.fetched_at.elapsed() < self.ttl {
                debug!(
                    "serving {} cached reminders for user {user_id}",
                    snapshot.reminders.len()
                );
                return snapshot.reminders.clone();
            }
        }

        let attached = self
            .subscriptions
            .get(user_id)
            .map(|handle| !handle.is_finished())
            .unwrap_or(false);
        if attached {
            // Live subscription keeps the snapshot pushed; stale-but-present
            // beats no data
            return self.cached(user_id);
        }
        self.subscriptions.remove(user_id);

        match self.store.stream_by_user(user_id).await {
            Ok(mut rx) => {
                let first = rx.recv().await;
                let cache = self.clone();
                let uid = user_id.to_string();
                let handle = tokio::spawn(async move {
                    while let Some(snapshot) = rx.recv().await {
                        cache.update_debounced(&uid, snapshot).await;
                    }
                    debug!("reminder subscription for {uid} ended");
                });
                self.subscriptions.insert(user_id.to_string(), handle);

                match first {
                    Some(mut snapshot) => {
                        sort_snapshot(&mut snapshot, Utc::now());
                        self.install(user_id, snapshot.clone());
                        snapshot
                    }
                    None => self.cached(user_id),
                }
            }
            Err(e) => {
                warn!("reminder subscription for {user_id} failed: {e}");
                self.cached(user_id)
            }
        }
    }

    /// Reminders bucketed into soon / future / previous, the grouping list
    /// views render.
    pub async fn buckets(&self, user_id: &str) -> ReminderBuckets {
        let mut buckets = ReminderBuckets::default();
        for reminder in self.get_all(user_id).await {
            if reminder.is_previous() {
                buckets.previous.push(reminder);
            } else if reminder.is_soon() {
                buckets.soon.push(reminder);
            } else {
                buckets.future.push(reminder);
            }
        }
        buckets.soon.sort_by_key(|r| r.due_at);
        buckets.future.sort_by_key(|r| r.due_at);
        buckets.previous.sort_by(|a, b| b.due_at.cmp(&a.due_at));
        buckets
    }

    /// Drop the cached snapshot for one user. Called after any write that
    /// goes through the engine.
    pub fn invalidate(&self, user_id: &str) {
        self.snapshots.remove(user_id);
    }

    /// Coalesce a snapshot delivery. Rapid successive deliveries within the
    /// debounce window collapse into one downstream notification; each
    /// flush recomputes the full sort order exactly once. A snapshot
    /// arriving mid-debounce replaces the pending payload rather than
    /// queuing a second flush.
    pub async fn update_debounced(&self, user_id: &str, snapshot: Vec<Reminder>) {
        self.pending.insert(user_id.to_string(), snapshot);

        let newly_scheduled = match self.flush_scheduled.entry(user_id.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(());
                true
            }
        };
        if !newly_scheduled {
            return;
        }

        let cache = self.clone();
        let uid = user_id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(cache.debounce).await;
            cache.flush_scheduled.remove(&uid);
            if let Some((_, mut snapshot)) = cache.pending.remove(&uid) {
                sort_snapshot(&mut snapshot, Utc::now());
                debug!("flushing {} debounced reminders for {uid}", snapshot.len());
                cache.install(&uid, snapshot);
            }
        });
    }

    /// Observe one user's sorted reminder list. The receiver sees the
    /// current snapshot immediately and every debounced flush afterwards.
    pub fn watch(&self, user_id: &str) -> watch::Receiver<Vec<Reminder>> {
        let initial = self.cached(user_id);
        let sender = self
            .watchers
            .entry(user_id.to_string())
            .or_insert_with(|| watch::channel(initial).0);
        sender.subscribe()
    }

    /// Tear down the live subscription for one user. Cached snapshots stay.
    pub fn detach(&self, user_id: &str) {
        if let Some((_, handle)) = self.subscriptions.remove(user_id) {
            handle.abort();
        }
    }

    fn cached(&self, user_id: &str) -> Vec<Reminder> {
        self.snapshots
            .get(user_id)
            .map(|s| s.reminders.clone())
            .unwrap_or_default()
    }

    fn install(&self, user_id: &str, reminders: Vec<Reminder>) {
        if let Some(sender) = self.watchers.get(user_id) {
            sender.send_replace(reminders.clone());
        }
        self.snapshots.insert(
            user_id.to_string(),
            CachedSnapshot {
                reminders,
                fetched_at: Instant::now(),
            },
        );
    }
}

/// Sort a snapshot for display: pending reminders soonest first, then
/// expired reminders most recently expired first.
pub fn sort_snapshot(reminders: &mut [Reminder], now: DateTime<Utc>) {
    reminders.sort_by(|a, b| {
        let left = a.due_at.signed_duration_since(now);
        let right = b.due_at.signed_duration_since(now);
        let zero = chrono::Duration::zero();
        match (left > zero, right > zero) {
            (true, true) => left.cmp(&right),
            (false, false) => right.cmp(&left),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
        }
    });
}
