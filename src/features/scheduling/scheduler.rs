//! # Alarm Scheduler
//!
//! Materializes a reminder's expanded occurrence set into exact wake-up
//! registrations against the platform alarm port, diffing against what is
//! already registered so re-syncing is idempotent. Owns all cancellation
//! and dedup bookkeeping.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.2.0: Per-occurrence failure collection in the sync report
//! - 1.1.0: Best-effort degrade when exact scheduling is denied
//! - 1.0.0: Initial diff-based registration

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::{EngineError, Occurrence, Reminder};
use crate::ports::AlarmPort;

/// Which of an occurrence's two possible alerts a registration is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlarmKind {
    /// The alert at the occurrence's due instant
    Main,
    /// The earlier alert `lead_time_minutes` before the due instant
    LeadTime,
}

impl std::fmt::Display for AlarmKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlarmKind::Main => write!(f, "main"),
            AlarmKind::LeadTime => write!(f, "lead"),
        }
    }
}

/// One live registration against the alarm port.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledAlarm {
    pub occurrence_key: String,
    pub reminder_id: String,
    pub trigger_at: DateTime<Utc>,
    pub kind: AlarmKind,
}

/// Payload handed to the alarm port at registration and delivered back
/// verbatim when the alarm fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirePayload {
    pub occurrence_key: String,
    pub reminder_id: String,
    pub title: String,
    /// `None` when the reminder has no description; the alert then shows no
    /// detail line
    pub detail: Option<String>,
    pub kind: AlarmKind,
    pub trigger_at: DateTime<Utc>,
}

/// Outcome of one `sync` call. Failures are per-occurrence; a failed
/// registration never aborts the rest of the sync.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub registered: usize,
    pub cancelled: usize,
    pub unchanged: usize,
    /// Set when the platform denied exact scheduling and registrations were
    /// made best-effort instead
    pub exact_denied: bool,
    pub failures: Vec<EngineError>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.exact_denied
    }

    /// The capability-denied signal as a typed error, when the platform
    /// refused exact scheduling during this sync.
    pub fn capability_error(&self) -> Option<EngineError> {
        self.exact_denied.then_some(EngineError::SchedulingDenied)
    }
}

/// Registration key for one (occurrence, kind) pair. Deterministic so that
/// re-registration always lands on the same platform slot.
pub fn registration_key(occurrence_key: &str, kind: AlarmKind) -> String {
    format!("{occurrence_key}:{kind}")
}

/// Diff-based alarm registration for reminders.
pub struct AlarmScheduler {
    port: Arc<dyn AlarmPort>,
    registered: DashMap<String, ScheduledAlarm>,
    exact_denied_logged: AtomicBool,
}

impl AlarmScheduler {
    pub fn new(port: Arc<dyn AlarmPort>) -> Self {
        AlarmScheduler {
            port,
            registered: DashMap::new(),
            exact_denied_logged: AtomicBool::new(false),
        }
    }

    /// Bring the registered alarm set for one reminder in line with its
    /// expanded occurrences: one Main per occurrence, plus one LeadTime per
    /// occurrence when the reminder carries a positive lead time. Stale
    /// registrations are cancelled, unchanged ones left alone.
    pub fn sync(&self, reminder: &Reminder, occurrences: &[Occurrence]) -> SyncReport {
        let mut report = SyncReport::default();
        let desired = self.desired_alarms(reminder, occurrences);

        // Cancel registrations this reminder no longer wants
        let stale: Vec<String> = self
            .registered
            .iter()
            .filter(|entry| {
                entry.value().reminder_id == reminder.id && !desired.contains_key(entry.key())
            })
            .map(|entry| entry.key().clone())
            .collect();
        for key in stale {
            self.registered.remove(&key);
            if let Err(e) = self.port.cancel(&key) {
                warn!("cancelling stale alarm {key} failed: {e}");
            }
            report.cancelled += 1;
        }

        if !self.port.can_schedule_exact() {
            report.exact_denied = true;
            if !self.exact_denied_logged.swap(true, Ordering::Relaxed) {
                warn!("exact scheduling denied; registering best-effort alarms");
            }
        }

        for (key, alarm) in desired {
            let existing_trigger = self.registered.get(&key).map(|a| a.trigger_at);
            match existing_trigger {
                Some(trigger) if trigger == alarm.trigger_at => {
                    report.unchanged += 1;
                    continue;
                }
                Some(_) => {
                    // Due time moved; replace the prior registration
                    if let Err(e) = self.port.cancel(&key) {
                        warn!("cancelling superseded alarm {key} failed: {e}");
                    }
                }
                None => {}
            }

            let payload = FirePayload {
                occurrence_key: alarm.occurrence_key.clone(),
                reminder_id: alarm.reminder_id.clone(),
                title: reminder.title.clone(),
                detail: alert_detail(reminder, alarm.kind),
                kind: alarm.kind,
                trigger_at: alarm.trigger_at,
            };
            let bytes = match serde_json::to_vec(&payload) {
                Ok(bytes) => bytes,
                Err(e) => {
                    report.failures.push(EngineError::RegistrationFailed {
                        key: key.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            match self.port.schedule_at(&key, alarm.trigger_at, bytes) {
                Ok(()) => {
                    debug!(
                        "registered {} alarm for {} at {}",
                        alarm.kind, alarm.occurrence_key, alarm.trigger_at
                    );
                    self.registered.insert(key, alarm);
                    report.registered += 1;
                }
                Err(e) => {
                    warn!("registering alarm {key} failed: {e}");
                    report.failures.push(EngineError::RegistrationFailed {
                        key,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "alarm sync for {}: {} registered, {} cancelled, {} unchanged, {} failed",
            reminder.id,
            report.registered,
            report.cancelled,
            report.unchanged,
            report.failures.len()
        );
        report
    }

    /// Cancel both alarms for a single occurrence (used when one occurrence
    /// is resolved without touching the rest of the reminder's schedule).
    pub fn cancel_occurrence(&self, occurrence_key: &str) {
        for kind in [AlarmKind::Main, AlarmKind::LeadTime] {
            let key = registration_key(occurrence_key, kind);
            if self.registered.remove(&key).is_some() {
                if let Err(e) = self.port.cancel(&key) {
                    warn!("cancelling alarm {key} failed: {e}");
                }
            }
        }
    }

    /// Remove every registration for a reminder: Main and LeadTime, the base
    /// firing and all synthesized occurrences. By the time this returns the
    /// local registry holds nothing for the reminder; platform-level events
    /// already in flight are an accepted race.
    pub fn cancel_all(&self, reminder_id: &str) -> usize {
        let keys: Vec<String> = self
            .registered
            .iter()
            .filter(|entry| entry.value().reminder_id == reminder_id)
            .map(|entry| entry.key().clone())
            .collect();
        for key in &keys {
            self.registered.remove(key);
            if let Err(e) = self.port.cancel(key) {
                warn!("cancelling alarm {key} failed: {e}");
            }
        }
        if !keys.is_empty() {
            info!("cancelled {} alarms for reminder {reminder_id}", keys.len());
        }
        keys.len()
    }

    /// Currently registered alarms for a reminder, in trigger order.
    pub fn registered_for(&self, reminder_id: &str) -> Vec<ScheduledAlarm> {
        let mut alarms: Vec<ScheduledAlarm> = self
            .registered
            .iter()
            .filter(|entry| entry.value().reminder_id == reminder_id)
            .map(|entry| entry.value().clone())
            .collect();
        alarms.sort_by_key(|a| a.trigger_at);
        alarms
    }

    fn desired_alarms(
        &self,
        reminder: &Reminder,
        occurrences: &[Occurrence],
    ) -> HashMap<String, ScheduledAlarm> {
        let mut desired = HashMap::new();
        for occurrence in occurrences {
            desired.insert(
                registration_key(&occurrence.key, AlarmKind::Main),
                ScheduledAlarm {
                    occurrence_key: occurrence.key.clone(),
                    reminder_id: reminder.id.clone(),
                    trigger_at: occurrence.due_at,
                    kind: AlarmKind::Main,
                },
            );
            if reminder.lead_time_minutes > 0 {
                // dueAt - lead < dueAt, so LeadTime always precedes Main
                let trigger_at =
                    occurrence.due_at - Duration::minutes(i64::from(reminder.lead_time_minutes));
                desired.insert(
                    registration_key(&occurrence.key, AlarmKind::LeadTime),
                    ScheduledAlarm {
                        occurrence_key: occurrence.key.clone(),
                        reminder_id: reminder.id.clone(),
                        trigger_at,
                        kind: AlarmKind::LeadTime,
                    },
                );
            }
        }
        desired
    }
}

fn alert_detail(reminder: &Reminder, kind: AlarmKind) -> Option<String> {
    if reminder.description.is_empty() {
        return None;
    }
    match kind {
        AlarmKind::Main => Some(reminder.description.clone()),
        AlarmKind::LeadTime => Some(format!(
            "{} (due in {} minutes)",
            reminder.description, reminder.lead_time_minutes
        )),
    }
}
