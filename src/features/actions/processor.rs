//! # Action Processor
//!
//! Consumes a resolved user action for a fired occurrence, mutates the
//! reminder through the store, and re-drives the alarm scheduler and
//! notification port. Guarantees at-most-once processing per delivered
//! occurrence via the delivery state machine's single-flight claim.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.3.0
//!
//! ## Changelog
//! - 1.1.0: Presentation cleanup still runs when the store write fails
//! - 1.0.0: Snooze / complete / dismiss resolution

use chrono::{Duration, Utc};
use log::{debug, info, warn};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::{base_reminder_id, EngineError, Occurrence, Recurrence, Reminder};
use crate::features::cache::ScheduleCache;
use crate::features::delivery::{DeliveryState, DeliveryStateMachine};
use crate::features::scheduling::AlarmScheduler;
use crate::ports::{NotificationPort, ReminderStore, UserAction};

/// What a resolution attempt actually did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Store mutation and cleanup both happened
    Applied,
    /// Another resolution already claimed this occurrence; nothing done
    Duplicate,
    /// Presentation was cleaned up but the store write failed; the caller
    /// may retry the action
    NotPersisted,
}

/// Resolves user actions against fired occurrences.
pub struct ActionProcessor {
    store: Arc<dyn ReminderStore>,
    scheduler: Arc<AlarmScheduler>,
    notifications: Arc<dyn NotificationPort>,
    delivery: Arc<DeliveryStateMachine>,
    cache: ScheduleCache,
}

impl ActionProcessor {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        scheduler: Arc<AlarmScheduler>,
        notifications: Arc<dyn NotificationPort>,
        delivery: Arc<DeliveryStateMachine>,
        cache: ScheduleCache,
    ) -> Self {
        ActionProcessor {
            store,
            scheduler,
            notifications,
            delivery,
            cache,
        }
    }

    /// Resolve one occurrence with the user's chosen action. At most one
    /// resolution wins per occurrence; the rest observe `Duplicate`.
    pub async fn resolve(
        &self,
        occurrence_key: &str,
        action: UserAction,
    ) -> Result<ActionOutcome, EngineError> {
        if !self.delivery.try_claim(occurrence_key) {
            debug!("resolution for {occurrence_key} already claimed, ignoring");
            return Ok(ActionOutcome::Duplicate);
        }

        let result = match action {
            UserAction::Snooze { minutes } => self.snooze(occurrence_key, minutes).await,
            UserAction::Complete => self.complete(occurrence_key).await,
            UserAction::Dismiss => Ok(self.dismiss(occurrence_key)),
        };

        match &result {
            Ok(ActionOutcome::NotPersisted) | Err(_) => self.delivery.release(occurrence_key),
            _ => {}
        }
        result
    }

    /// Push the reminder out: a brand-new record with a fresh id carries the
    /// title, description and category; the fired occurrence's alarms are
    /// cancelled and its alert withdrawn. The copy is one-shot: it carries
    /// no recurrence and no lead time, so exactly one fresh Main alarm is
    /// registered for it. The base reminder keeps its own schedule.
    async fn snooze(
        &self,
        occurrence_key: &str,
        minutes: u32,
    ) -> Result<ActionOutcome, EngineError> {
        let base = self.load_base(occurrence_key).await?;

        let snoozed = Reminder {
            id: Uuid::new_v4().to_string(),
            due_at: Utc::now() + Duration::minutes(i64::from(minutes)),
            completed: false,
            recurrence: Recurrence::Never,
            lead_time_minutes: 0,
            ..base
        };

        self.scheduler.cancel_occurrence(occurrence_key);
        self.notifications.withdraw(occurrence_key);

        if let Err(e) = self.store.save(&snoozed).await {
            warn!("snoozed reminder {} not persisted: {e}", snoozed.id);
            return Ok(ActionOutcome::NotPersisted);
        }
        self.cache.invalidate(&snoozed.user_id);

        self.scheduler.sync(&snoozed, &[Occurrence::base(&snoozed)]);
        info!(
            "occurrence {occurrence_key} snoozed for {minutes} minutes as {}",
            snoozed.id
        );
        self.delivery.resolve(
            occurrence_key,
            DeliveryState::Snoozed {
                snoozed_to: snoozed.id.clone(),
            },
        );
        Ok(ActionOutcome::Applied)
    }

    /// Mark the base reminder done and cancel every remaining alarm for it,
    /// including any still-pending lead-time alert and all future
    /// recurrence occurrences.
    async fn complete(&self, occurrence_key: &str) -> Result<ActionOutcome, EngineError> {
        let mut base = self.load_base(occurrence_key).await?;
        let reminder_id = base.id.clone();

        self.scheduler.cancel_all(&reminder_id);
        self.notifications.withdraw(occurrence_key);

        base.completed = true;
        if let Err(e) = self.store.save(&base).await {
            warn!("completion of reminder {reminder_id} not persisted: {e}");
            return Ok(ActionOutcome::NotPersisted);
        }
        self.cache.invalidate(&base.user_id);

        info!("occurrence {occurrence_key} completed reminder {reminder_id}");
        self.delivery.resolve(occurrence_key, DeliveryState::Completed);
        Ok(ActionOutcome::Applied)
    }

    /// Acknowledge the alert only. The reminder is untouched and future
    /// recurrence alarms stay scheduled; dismissing one alert is not the
    /// same as being done with the reminder.
    fn dismiss(&self, occurrence_key: &str) -> ActionOutcome {
        self.notifications.withdraw(occurrence_key);
        info!("occurrence {occurrence_key} dismissed");
        self.delivery.resolve(occurrence_key, DeliveryState::Dismissed);
        ActionOutcome::Applied
    }

    async fn load_base(&self, occurrence_key: &str) -> Result<Reminder, EngineError> {
        let base_id = base_reminder_id(occurrence_key);
        match self.store.get(base_id).await {
            Ok(Some(reminder)) => Ok(reminder),
            Ok(None) => Err(EngineError::UnknownOccurrence(occurrence_key.to_string())),
            Err(e) => Err(EngineError::StoreUnavailable(e.to_string())),
        }
    }
}
