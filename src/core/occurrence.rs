//! # Occurrence
//!
//! One concrete firing instant derived from a reminder. Occurrences are
//! never persisted; recurring reminders synthesize occurrence keys of the
//! form `{reminder_id}_occurrence_{epoch_millis}` and everything else keys
//! off the base reminder id directly.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use chrono::{DateTime, Utc};

use crate::core::reminder::Reminder;

/// Marker separating a base reminder id from a synthesized occurrence
/// timestamp.
pub const OCCURRENCE_MARKER: &str = "_occurrence_";

/// A single firing instant of a reminder.
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    /// Occurrence key: the base reminder id, or a synthesized
    /// `{id}_occurrence_{millis}` id for expanded recurrences
    pub key: String,

    /// Base reminder this occurrence belongs to
    pub reminder_id: String,

    /// Instant this occurrence is due
    pub due_at: DateTime<Utc>,
}

impl Occurrence {
    /// The reminder's own firing at its `due_at`.
    pub fn base(reminder: &Reminder) -> Self {
        Occurrence {
            key: reminder.id.clone(),
            reminder_id: reminder.id.clone(),
            due_at: reminder.due_at,
        }
    }

    /// A synthesized future firing of a recurring reminder.
    pub fn synthesized(reminder_id: &str, due_at: DateTime<Utc>) -> Self {
        Occurrence {
            key: format!("{reminder_id}{OCCURRENCE_MARKER}{}", due_at.timestamp_millis()),
            reminder_id: reminder_id.to_string(),
            due_at,
        }
    }

    /// Whether this occurrence was synthesized by recurrence expansion.
    pub fn is_synthesized(&self) -> bool {
        self.key != self.reminder_id
    }
}

/// Strip any `_occurrence_<ts>` suffix from an occurrence key, yielding the
/// base reminder id. Occurrences are not independently persisted, so store
/// lookups always go through the base id.
pub fn base_reminder_id(occurrence_key: &str) -> &str {
    occurrence_key
        .split(OCCURRENCE_MARKER)
        .next()
        .unwrap_or(occurrence_key)
}
