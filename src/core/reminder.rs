//! # Reminder Domain Model
//!
//! The persisted reminder record and its recurrence rule.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Added soon/future/previous triage helpers for bucketed views
//! - 1.0.0: Initial model with recurrence rules and lead-time offsets

use chrono::{DateTime, Days, Duration, Months, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::core::error::EngineError;

const SOON_WINDOW_HOURS: i64 = 24;

fn default_lead_time() -> u32 {
    10
}

fn default_emoji() -> String {
    "⏰".to_string()
}

/// A user-owned reminder. `color_tag` and `emoji` are presentation-only and
/// carried opaque; the engine never interprets them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    /// Stable identifier, unique per user, unchanged across edits
    pub id: String,

    /// Owner of the reminder
    pub user_id: String,

    /// Alert headline
    pub title: String,

    /// Alert detail line; an empty description suppresses the detail line
    /// in any presented alert
    #[serde(default)]
    pub description: String,

    /// Free-text tag, normalized to trimmed lowercase on save
    #[serde(default)]
    pub category: String,

    /// Absolute instant the reminder is due
    pub due_at: DateTime<Utc>,

    /// Minutes before `due_at` at which a second, earlier alert fires;
    /// zero disables the lead-time alert
    #[serde(default = "default_lead_time")]
    pub lead_time_minutes: u32,

    /// Recurrence rule
    #[serde(default)]
    pub recurrence: Recurrence,

    /// Whether the reminder has been marked done
    #[serde(default)]
    pub completed: bool,

    /// Presentation-only color tag
    #[serde(default)]
    pub color_tag: i32,

    /// Presentation-only emoji
    #[serde(default = "default_emoji")]
    pub emoji: String,
}

impl Reminder {
    /// Create a reminder with default lead time, no recurrence, and empty
    /// presentation fields.
    pub fn new(user_id: &str, title: &str, due_at: DateTime<Utc>) -> Self {
        Reminder {
            id: String::new(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            description: String::new(),
            category: String::new(),
            due_at,
            lead_time_minutes: default_lead_time(),
            recurrence: Recurrence::Never,
            completed: false,
            color_tag: 0,
            emoji: default_emoji(),
        }
    }

    /// Normalize the category tag to trimmed lowercase.
    pub fn normalize_category(&mut self) {
        self.category = self.category.trim().to_lowercase();
    }

    /// Due within the next 24 hours.
    pub fn is_soon(&self) -> bool {
        let remaining = self.due_at.signed_duration_since(Utc::now());
        remaining > Duration::zero() && remaining <= Duration::hours(SOON_WINDOW_HOURS)
    }

    /// Due more than 24 hours from now.
    pub fn is_future(&self) -> bool {
        self.due_at.signed_duration_since(Utc::now()) > Duration::hours(SOON_WINDOW_HOURS)
    }

    /// Already past due.
    pub fn is_previous(&self) -> bool {
        self.due_at < Utc::now()
    }

    /// The single next instant after `due_at` according to the recurrence
    /// rule, or `due_at` itself for non-recurring reminders.
    pub fn next_occurrence(&self) -> DateTime<Utc> {
        self.recurrence.advance(self.due_at).unwrap_or(self.due_at)
    }
}

/// Recurrence rule for a reminder.
///
/// Day and coarser rules advance by calendar units so that e.g. Jan 31 plus
/// one month lands on the last valid day of February; minute and hour rules
/// use fixed durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Recurrence {
    #[default]
    Never,
    EveryMinute,
    EveryHour,
    EveryDay,
    EveryWeek,
    EveryMonth,
    EveryYear,
}

impl Recurrence {
    /// Advance an instant by one recurrence period. `None` when the rule is
    /// `Never` or the result would overflow the calendar.
    pub fn advance(&self, cursor: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Recurrence::Never => None,
            Recurrence::EveryMinute => cursor.checked_add_signed(Duration::minutes(1)),
            Recurrence::EveryHour => cursor.checked_add_signed(Duration::hours(1)),
            Recurrence::EveryDay => cursor.checked_add_days(Days::new(1)),
            Recurrence::EveryWeek => cursor.checked_add_days(Days::new(7)),
            Recurrence::EveryMonth => cursor.checked_add_months(Months::new(1)),
            Recurrence::EveryYear => cursor.checked_add_months(Months::new(12)),
        }
    }

    /// Upper bound on expanded occurrences per rule. Unbounded expansion of
    /// a minute-level rule would otherwise produce unschedulable volumes of
    /// alarms.
    pub fn occurrence_cap(&self) -> usize {
        match self {
            Recurrence::Never => 0,
            Recurrence::EveryMinute => 60,
            Recurrence::EveryHour => 24,
            Recurrence::EveryDay => 31,
            Recurrence::EveryWeek => 53,
            Recurrence::EveryMonth => 12,
            Recurrence::EveryYear => 2,
        }
    }

    /// Parse a stored rule string, mapping anything unrecognized to `Never`
    /// so malformed stored data never crashes a caller.
    pub fn parse_lenient(value: &str) -> Recurrence {
        match value.parse() {
            Ok(rule) => rule,
            Err(e) => {
                warn!("{e}, treating as Never");
                Recurrence::Never
            }
        }
    }
}

impl std::fmt::Display for Recurrence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recurrence::Never => write!(f, "Never"),
            Recurrence::EveryMinute => write!(f, "Every Minute"),
            Recurrence::EveryHour => write!(f, "Every Hour"),
            Recurrence::EveryDay => write!(f, "Every Day"),
            Recurrence::EveryWeek => write!(f, "Every Week"),
            Recurrence::EveryMonth => write!(f, "Every Month"),
            Recurrence::EveryYear => write!(f, "Every Year"),
        }
    }
}

impl std::str::FromStr for Recurrence {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "never" => Ok(Recurrence::Never),
            "every minute" => Ok(Recurrence::EveryMinute),
            "every hour" => Ok(Recurrence::EveryHour),
            "every day" => Ok(Recurrence::EveryDay),
            "every week" => Ok(Recurrence::EveryWeek),
            "every month" => Ok(Recurrence::EveryMonth),
            "every year" => Ok(Recurrence::EveryYear),
            _ => Err(EngineError::MalformedRecurrence(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_recurrence_display() {
        assert_eq!(Recurrence::Never.to_string(), "Never");
        assert_eq!(Recurrence::EveryMinute.to_string(), "Every Minute");
        assert_eq!(Recurrence::EveryWeek.to_string(), "Every Week");
        assert_eq!(Recurrence::EveryYear.to_string(), "Every Year");
    }

    #[test]
    fn test_recurrence_parse() {
        assert_eq!("Never".parse::<Recurrence>().unwrap(), Recurrence::Never);
        assert_eq!(
            "every minute".parse::<Recurrence>().unwrap(),
            Recurrence::EveryMinute
        );
        assert_eq!(
            "EVERY MONTH".parse::<Recurrence>().unwrap(),
            Recurrence::EveryMonth
        );
        assert!("fortnightly".parse::<Recurrence>().is_err());
    }

    #[test]
    fn test_parse_lenient_maps_unknown_to_never() {
        assert_eq!(Recurrence::parse_lenient("Every Week"), Recurrence::EveryWeek);
        assert_eq!(Recurrence::parse_lenient("garbage"), Recurrence::Never);
        assert_eq!(Recurrence::parse_lenient(""), Recurrence::Never);
    }

    #[test]
    fn test_advance_calendar_aware_month() {
        let jan_31 = Utc.with_ymd_and_hms(2025, 1, 31, 10, 0, 0).unwrap();
        let next = Recurrence::EveryMonth.advance(jan_31).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 2, 28, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_advance_leap_year_month() {
        let jan_31 = Utc.with_ymd_and_hms(2024, 1, 31, 10, 0, 0).unwrap();
        let next = Recurrence::EveryMonth.advance(jan_31).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 2, 29, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_advance_never_is_none() {
        assert!(Recurrence::Never.advance(Utc::now()).is_none());
    }

    #[test]
    fn test_normalize_category() {
        let mut reminder = Reminder::new("user-1", "Pay rent", Utc::now());
        reminder.category = "  Bills  ".to_string();
        reminder.normalize_category();
        assert_eq!(reminder.category, "bills");
    }

    #[test]
    fn test_triage_helpers() {
        let soon = Reminder::new("u", "soon", Utc::now() + Duration::hours(2));
        assert!(soon.is_soon());
        assert!(!soon.is_future());
        assert!(!soon.is_previous());

        let future = Reminder::new("u", "later", Utc::now() + Duration::days(3));
        assert!(future.is_future());
        assert!(!future.is_soon());

        let past = Reminder::new("u", "missed", Utc::now() - Duration::hours(1));
        assert!(past.is_previous());
        assert!(!past.is_soon());
    }
}
