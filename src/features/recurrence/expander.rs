//! # Recurrence Expansion
//!
//! Pure expansion of a recurring reminder into its concrete future
//! occurrences. No I/O, fully deterministic for a given `now`.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use chrono::{DateTime, Months, Utc};
use log::debug;

use crate::core::{Occurrence, Recurrence, Reminder};

/// Default forward-looking horizon in months.
pub const HORIZON_MONTHS: u32 = 12;

/// Expand a reminder over the default 12-month horizon.
pub fn expand(reminder: &Reminder, now: DateTime<Utc>) -> Vec<Occurrence> {
    let horizon = now
        .checked_add_months(Months::new(HORIZON_MONTHS))
        .unwrap_or(now);
    expand_until(reminder, now, horizon)
}

/// Expand a reminder into occurrences strictly inside `[now, horizon)`,
/// bounded by the rule's occurrence cap.
///
/// A reminder whose `due_at` slipped into the past is re-anchored: the
/// wall-clock time-of-day is kept and the date advances to `now`'s date, so
/// a stale reminder resumes on schedule instead of replaying every missed
/// instant. The original `due_at` (or the re-anchored instant) is never
/// emitted; the caller handles the base firing directly.
pub fn expand_until(
    reminder: &Reminder,
    now: DateTime<Utc>,
    horizon: DateTime<Utc>,
) -> Vec<Occurrence> {
    if reminder.recurrence == Recurrence::Never {
        return Vec::new();
    }

    let mut cursor = reminder.due_at;
    if cursor < now {
        cursor = now.date_naive().and_time(cursor.time()).and_utc();
    }

    // The first advance guarantees the anchor instant itself is not
    // duplicated as an occurrence.
    cursor = match reminder.recurrence.advance(cursor) {
        Some(next) => next,
        None => return Vec::new(),
    };

    // A re-anchored time-of-day may still sit earlier today; roll forward to
    // the first instant that is actually ahead.
    while cursor < now {
        cursor = match reminder.recurrence.advance(cursor) {
            Some(next) => next,
            None => return Vec::new(),
        };
    }

    let cap = reminder.recurrence.occurrence_cap();
    let mut occurrences = Vec::new();

    while cursor < horizon && occurrences.len() < cap {
        occurrences.push(Occurrence::synthesized(&reminder.id, cursor));
        cursor = match reminder.recurrence.advance(cursor) {
            Some(next) => next,
            None => break,
        };
    }

    debug!(
        "expanded {} occurrences for reminder {} ({})",
        occurrences.len(),
        reminder.id,
        reminder.recurrence
    );
    occurrences
}
