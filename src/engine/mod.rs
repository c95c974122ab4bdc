//! # Reminder Engine
//!
//! Application wiring for the scheduling and delivery core. Owns the cache,
//! scheduler, delivery state machine and action processor, and exposes the
//! surface the host drives: save/delete/complete, the alarm fire callback,
//! and inbound user actions.
//!
//! - **Version**: 1.3.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.3.0: restore_user re-syncs every pending reminder after a restart
//! - 1.2.0: Fire callback hardened; failures degrade to a dismissed alert
//! - 1.0.0: Initial wiring

use anyhow::Result;
use chrono::{Months, Utc};
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

use crate::core::{EngineConfig, EngineError, Occurrence, Recurrence, Reminder};
use crate::features::actions::{ActionOutcome, ActionProcessor};
use crate::features::cache::{ReminderBuckets, ScheduleCache};
use crate::features::delivery::{DeliveryState, DeliveryStateMachine};
use crate::features::recurrence::expand_until;
use crate::features::scheduling::{AlarmScheduler, FirePayload, SyncReport};
use crate::ports::{
    ActionEvent, AlarmPort, AlertAction, NotificationPort, ReminderStore, UserAction,
};

/// The reminder scheduling and delivery engine.
///
/// Hosts wire the alarm port's fire callback into [`handle_fire`] and
/// translate user taps into [`handle_action`]; everything else flows
/// through the save/delete/complete surface.
///
/// [`handle_fire`]: ReminderEngine::handle_fire
/// [`handle_action`]: ReminderEngine::handle_action
pub struct ReminderEngine {
    config: EngineConfig,
    store: Arc<dyn ReminderStore>,
    notifications: Arc<dyn NotificationPort>,
    cache: ScheduleCache,
    scheduler: Arc<AlarmScheduler>,
    delivery: Arc<DeliveryStateMachine>,
    actions: ActionProcessor,
}

impl ReminderEngine {
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn ReminderStore>,
        alarms: Arc<dyn AlarmPort>,
        notifications: Arc<dyn NotificationPort>,
    ) -> Self {
        let cache = ScheduleCache::new(store.clone(), &config);
        let scheduler = Arc::new(AlarmScheduler::new(alarms));
        let delivery = Arc::new(DeliveryStateMachine::new());
        let actions = ActionProcessor::new(
            store.clone(),
            scheduler.clone(),
            notifications.clone(),
            delivery.clone(),
            cache.clone(),
        );
        ReminderEngine {
            config,
            store,
            notifications,
            cache,
            scheduler,
            delivery,
            actions,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Persist a reminder and bring its alarm registrations in line with
    /// the expanded occurrence set. New reminders get an id here; completed
    /// reminders get their alarms cancelled instead of registered.
    pub async fn save_reminder(&self, mut reminder: Reminder) -> Result<SyncReport> {
        if reminder.id.is_empty() {
            reminder.id = Uuid::new_v4().to_string();
        }
        reminder.normalize_category();

        self.store.save(&reminder).await?;
        self.cache.invalidate(&reminder.user_id);

        if reminder.completed {
            self.scheduler.cancel_all(&reminder.id);
            self.delivery.discard_for(&reminder.id);
            return Ok(SyncReport::default());
        }

        // An edit starts a fresh delivery lifecycle for the reminder
        self.delivery.discard_for(&reminder.id);
        let report = self.sync_alarms(&reminder);
        info!(
            "saved reminder {} ({}, {})",
            reminder.id, reminder.title, reminder.recurrence
        );
        Ok(report)
    }

    /// Delete a reminder and every alarm registered for it.
    pub async fn delete_reminder(&self, reminder_id: &str, user_id: &str) -> Result<()> {
        self.store.delete(reminder_id).await?;
        self.scheduler.cancel_all(reminder_id);
        self.delivery.discard_for(reminder_id);
        self.cache.invalidate(user_id);
        info!("deleted reminder {reminder_id}");
        Ok(())
    }

    /// Mark a reminder done from the list view (outside any fired alert).
    /// Shares Complete semantics: the write persists and every remaining
    /// alarm is cancelled.
    pub async fn complete_reminder(&self, reminder_id: &str) -> Result<()> {
        let mut reminder = self
            .store
            .get(reminder_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("no reminder {reminder_id}"))?;
        reminder.completed = true;
        self.store.save(&reminder).await?;
        self.scheduler.cancel_all(reminder_id);
        self.delivery.discard_for(reminder_id);
        self.cache.invalidate(&reminder.user_id);
        info!("completed reminder {reminder_id}");
        Ok(())
    }

    /// All reminders for one user, via the TTL cache.
    pub async fn reminders(&self, user_id: &str) -> Vec<Reminder> {
        self.cache.get_all(user_id).await
    }

    /// Reminders bucketed into soon / future / previous.
    pub async fn buckets(&self, user_id: &str) -> ReminderBuckets {
        self.cache.buckets(user_id).await
    }

    /// Observe one user's sorted reminder list.
    pub fn watch(&self, user_id: &str) -> watch::Receiver<Vec<Reminder>> {
        self.cache.watch(user_id)
    }

    /// Alarm-fire callback. Never lets an error escape: a failure while
    /// presenting degrades the occurrence to a dismissed alert rather than
    /// crashing the callback path.
    pub async fn handle_fire(&self, key: &str, payload: &[u8]) {
        if let Err(e) = self.dispatch_fire(payload).await {
            error!("fire handling for {key} failed: {e}");
            let occurrence_key = match serde_json::from_slice::<FirePayload>(payload) {
                Ok(decoded) => decoded.occurrence_key,
                Err(_) => key.to_string(),
            };
            self.notifications.withdraw(&occurrence_key);
            self.delivery
                .resolve(&occurrence_key, DeliveryState::Dismissed);
        }
    }

    /// Inbound user action from the presentation layer.
    pub async fn handle_action(&self, event: ActionEvent) -> Result<ActionOutcome, EngineError> {
        let action = match event.action {
            // A zero-minute snooze means "use the configured default"
            UserAction::Snooze { minutes: 0 } => UserAction::Snooze {
                minutes: self.config.default_snooze_minutes,
            },
            other => other,
        };
        self.actions.resolve(&event.occurrence_key, action).await
    }

    /// Re-expand and re-register alarms for every pending reminder of one
    /// user. Called after a restart, when platform registrations may have
    /// been lost. Returns how many reminders were synced.
    pub async fn restore_user(&self, user_id: &str) -> usize {
        let reminders = self.cache.get_all(user_id).await;
        let mut synced = 0;
        for reminder in reminders {
            if reminder.completed {
                continue;
            }
            let report = self.sync_alarms(&reminder);
            if !report.failures.is_empty() {
                warn!(
                    "restore of reminder {} hit {} registration failures",
                    reminder.id,
                    report.failures.len()
                );
            }
            synced += 1;
        }
        info!("restored alarm registrations for {synced} reminders of {user_id}");
        synced
    }

    async fn dispatch_fire(&self, payload: &[u8]) -> Result<()> {
        let payload: FirePayload = serde_json::from_slice(payload)?;
        let occurrence_key = payload.occurrence_key.as_str();

        if !self.delivery.mark_fired(occurrence_key, payload.kind) {
            debug!("{}", EngineError::DuplicateFire(occurrence_key.to_string()));
            return Ok(());
        }

        let actions = if self.config.offer_snooze {
            vec![AlertAction::Snooze, AlertAction::Complete, AlertAction::Dismiss]
        } else {
            vec![AlertAction::Complete, AlertAction::Dismiss]
        };
        self.notifications.present(
            occurrence_key,
            &payload.title,
            payload.detail.as_deref(),
            &actions,
        )?;
        info!(
            "presented {} alert for occurrence {occurrence_key}",
            payload.kind
        );
        Ok(())
    }

    fn sync_alarms(&self, reminder: &Reminder) -> SyncReport {
        let now = Utc::now();
        let horizon = now
            .checked_add_months(Months::new(self.config.horizon_months))
            .unwrap_or(now);

        let mut occurrences = Vec::new();
        // The base firing is scheduled only while it is still ahead; a past
        // due instant on a recurring reminder re-anchors through expansion
        if reminder.due_at >= now || reminder.recurrence == Recurrence::Never {
            occurrences.push(Occurrence::base(reminder));
        }
        occurrences.extend(expand_until(reminder, now, horizon));

        for occurrence in &occurrences {
            self.delivery.mark_pending(&occurrence.key);
        }
        self.scheduler.sync(reminder, &occurrences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::scheduling::{registration_key, AlarmKind};
    use crate::store::MemoryStore;
    use crate::testkit::{RecordingAlarmPort, RecordingNotificationPort};
    use chrono::Duration;

    struct Harness {
        store: Arc<MemoryStore>,
        alarms: Arc<RecordingAlarmPort>,
        notifications: Arc<RecordingNotificationPort>,
        engine: ReminderEngine,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let alarms = Arc::new(RecordingAlarmPort::new());
        let notifications = Arc::new(RecordingNotificationPort::new());
        let engine = ReminderEngine::new(
            EngineConfig::default(),
            store.clone(),
            alarms.clone(),
            notifications.clone(),
        );
        Harness {
            store,
            alarms,
            notifications,
            engine,
        }
    }

    fn sample(user: &str) -> Reminder {
        let mut reminder = Reminder::new(user, "dentist", Utc::now() + Duration::hours(3));
        reminder.description = "bring insurance card".to_string();
        reminder.category = " Health ".to_string();
        reminder
    }

    #[tokio::test]
    async fn test_save_assigns_id_and_registers_alarms() {
        let h = harness();
        let report = h.engine.save_reminder(sample("user-1")).await.unwrap();
        assert_eq!(report.registered, 2);

        let stored = h.store.reminders_for("user-1");
        assert_eq!(stored.len(), 1);
        assert!(!stored[0].id.is_empty());
        assert_eq!(stored[0].category, "health");

        let keys = h.alarms.registered_keys();
        assert_eq!(keys.len(), 2);
        assert!(keys.iter().any(|k| k.ends_with(":main")));
        assert!(keys.iter().any(|k| k.ends_with(":lead")));
    }

    #[tokio::test]
    async fn test_save_recurring_registers_expanded_set() {
        let h = harness();
        let mut reminder = sample("user-1");
        reminder.lead_time_minutes = 0;
        reminder.recurrence = Recurrence::EveryDay;
        h.engine.save_reminder(reminder).await.unwrap();

        // Base firing plus up to 31 expanded dailies
        let count = h.alarms.registered_keys().len();
        assert!(count > 2, "expected expanded registrations, got {count}");
        assert!(count <= 32);
    }

    #[tokio::test]
    async fn test_save_completed_cancels_instead() {
        let h = harness();
        let report = h.engine.save_reminder(sample("user-1")).await.unwrap();
        assert!(report.registered > 0);

        let mut stored = h.store.reminders_for("user-1").remove(0);
        stored.completed = true;
        h.engine.save_reminder(stored).await.unwrap();
        assert!(h.alarms.registered_keys().is_empty());
    }

    #[tokio::test]
    async fn test_delete_cancels_alarms() {
        let h = harness();
        h.engine.save_reminder(sample("user-1")).await.unwrap();
        let id = h.store.reminders_for("user-1")[0].id.clone();

        h.engine.delete_reminder(&id, "user-1").await.unwrap();
        assert!(h.store.get(&id).await.unwrap().is_none());
        assert!(h.alarms.registered_keys().is_empty());
    }

    #[tokio::test]
    async fn test_fire_presents_actionable_alert() {
        let h = harness();
        h.engine.save_reminder(sample("user-1")).await.unwrap();
        let id = h.store.reminders_for("user-1")[0].id.clone();

        let key = registration_key(&id, AlarmKind::Main);
        let payload = h.alarms.payload(&key).unwrap();
        h.engine.handle_fire(&key, &payload).await;

        let presented = h.notifications.presented();
        assert_eq!(presented.len(), 1);
        assert_eq!(presented[0].occurrence_key, id);
        assert_eq!(presented[0].title, "dentist");
        assert_eq!(presented[0].detail.as_deref(), Some("bring insurance card"));
        assert_eq!(
            presented[0].actions,
            vec![AlertAction::Snooze, AlertAction::Complete, AlertAction::Dismiss]
        );
    }

    #[tokio::test]
    async fn test_empty_description_suppresses_detail() {
        let h = harness();
        let mut reminder = sample("user-1");
        reminder.description = String::new();
        h.engine.save_reminder(reminder).await.unwrap();
        let id = h.store.reminders_for("user-1")[0].id.clone();

        let key = registration_key(&id, AlarmKind::Main);
        let payload = h.alarms.payload(&key).unwrap();
        h.engine.handle_fire(&key, &payload).await;

        assert!(h.notifications.presented()[0].detail.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_fire_presents_once() {
        let h = harness();
        h.engine.save_reminder(sample("user-1")).await.unwrap();
        let id = h.store.reminders_for("user-1")[0].id.clone();

        let key = registration_key(&id, AlarmKind::Main);
        let payload = h.alarms.payload(&key).unwrap();
        h.engine.handle_fire(&key, &payload).await;
        h.engine.handle_fire(&key, &payload).await;

        assert_eq!(h.notifications.presented().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_fires_present_once() {
        let h = harness();
        h.engine.save_reminder(sample("user-1")).await.unwrap();
        let id = h.store.reminders_for("user-1")[0].id.clone();
        let key = registration_key(&id, AlarmKind::Main);
        let payload = h.alarms.payload(&key).unwrap();

        let engine = Arc::new(h.engine);
        let mut handles = Vec::new();
        for _ in 0..8 {
            let engine = engine.clone();
            let key = key.clone();
            let payload = payload.clone();
            handles.push(tokio::spawn(async move {
                engine.handle_fire(&key, &payload).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(h.notifications.presented().len(), 1);
    }

    #[tokio::test]
    async fn test_lead_and_main_both_present() {
        let h = harness();
        h.engine.save_reminder(sample("user-1")).await.unwrap();
        let id = h.store.reminders_for("user-1")[0].id.clone();

        let lead_key = registration_key(&id, AlarmKind::LeadTime);
        let lead_payload = h.alarms.payload(&lead_key).unwrap();
        h.engine.handle_fire(&lead_key, &lead_payload).await;

        let main_key = registration_key(&id, AlarmKind::Main);
        let main_payload = h.alarms.payload(&main_key).unwrap();
        h.engine.handle_fire(&main_key, &main_payload).await;

        let presented = h.notifications.presented();
        assert_eq!(presented.len(), 2);
        assert_eq!(
            presented[0].detail.as_deref(),
            Some("bring insurance card (due in 10 minutes)")
        );
        assert_eq!(presented[1].detail.as_deref(), Some("bring insurance card"));
    }

    #[tokio::test]
    async fn test_presentation_failure_degrades_to_dismissed() {
        let h = harness();
        h.engine.save_reminder(sample("user-1")).await.unwrap();
        let id = h.store.reminders_for("user-1")[0].id.clone();
        h.notifications.fail_presentations();

        let key = registration_key(&id, AlarmKind::Main);
        let payload = h.alarms.payload(&key).unwrap();
        // Must not panic and must not leave the occurrence half-fired
        h.engine.handle_fire(&key, &payload).await;

        assert!(h.notifications.presented().is_empty());
        assert_eq!(h.notifications.withdrawn(), vec![id]);
    }

    #[tokio::test]
    async fn test_action_snooze_flows_through() {
        let h = harness();
        h.engine.save_reminder(sample("user-1")).await.unwrap();
        let id = h.store.reminders_for("user-1")[0].id.clone();

        let key = registration_key(&id, AlarmKind::Main);
        let payload = h.alarms.payload(&key).unwrap();
        h.engine.handle_fire(&key, &payload).await;

        let outcome = h
            .engine
            .handle_action(ActionEvent::new(&id, UserAction::Snooze { minutes: 5 }))
            .await
            .unwrap();
        assert_eq!(outcome, ActionOutcome::Applied);
        assert_eq!(h.store.reminders_for("user-1").len(), 2);
    }

    #[tokio::test]
    async fn test_zero_minute_snooze_uses_default() {
        let h = harness();
        h.engine.save_reminder(sample("user-1")).await.unwrap();
        let id = h.store.reminders_for("user-1")[0].id.clone();
        let before = Utc::now();

        h.engine
            .handle_action(ActionEvent::new(&id, UserAction::Snooze { minutes: 0 }))
            .await
            .unwrap();

        let snoozed = h
            .store
            .reminders_for("user-1")
            .into_iter()
            .find(|r| r.id != id)
            .unwrap();
        let expected = before + Duration::minutes(10);
        assert!((snoozed.due_at - expected).num_seconds().abs() <= 2);
    }

    #[tokio::test]
    async fn test_dismiss_keeps_future_recurrence_alive() {
        let h = harness();
        let mut reminder = sample("user-1");
        reminder.lead_time_minutes = 0;
        reminder.recurrence = Recurrence::EveryDay;
        h.engine.save_reminder(reminder).await.unwrap();
        let id = h.store.reminders_for("user-1")[0].id.clone();

        let key = registration_key(&id, AlarmKind::Main);
        let payload = h.alarms.payload(&key).unwrap();
        h.engine.handle_fire(&key, &payload).await;
        h.engine
            .handle_action(ActionEvent::new(&id, UserAction::Dismiss))
            .await
            .unwrap();

        // Synthesized occurrences remain registered; the next one can fire
        let next_key = h
            .alarms
            .registered_keys()
            .into_iter()
            .find(|k| k.contains("_occurrence_"))
            .expect("future occurrence still registered");
        let next_payload = h.alarms.payload(&next_key).unwrap();
        h.engine.handle_fire(&next_key, &next_payload).await;
        assert_eq!(h.notifications.presented().len(), 2);
    }

    #[tokio::test]
    async fn test_restore_user_reregisters_after_restart() {
        let h = harness();
        h.engine.save_reminder(sample("user-1")).await.unwrap();
        let before = h.alarms.registered_keys();

        // Reboot: platform registrations are gone and the process restarts
        // with a fresh engine over the same store
        for key in &before {
            h.alarms.cancel(key).unwrap();
        }
        assert!(h.alarms.registered_keys().is_empty());

        let restarted = ReminderEngine::new(
            EngineConfig::default(),
            h.store.clone(),
            h.alarms.clone(),
            h.notifications.clone(),
        );
        let synced = restarted.restore_user("user-1").await;
        assert_eq!(synced, 1);
        assert_eq!(h.alarms.registered_keys(), before);
    }

    #[tokio::test]
    async fn test_malformed_payload_does_not_crash() {
        let h = harness();
        h.engine.handle_fire("bogus-key", b"not json").await;
        assert!(h.notifications.presented().is_empty());
        assert_eq!(h.notifications.withdrawn(), vec!["bogus-key".to_string()]);
    }
}
