//! Inbound user action events
//!
//! The UI/OS layer translates taps on a presented alert into these events
//! and feeds them to `ReminderEngine::handle_action`.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use serde::{Deserialize, Serialize};

/// What the user chose to do with a fired occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserAction {
    /// Push the reminder out by this many minutes from now
    Snooze { minutes: u32 },
    /// Mark the underlying reminder done
    Complete,
    /// Acknowledge this alert only; future recurrences stay scheduled
    Dismiss,
}

/// One inbound action event from the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEvent {
    pub occurrence_key: String,
    pub action: UserAction,
}

impl ActionEvent {
    pub fn new(occurrence_key: &str, action: UserAction) -> Self {
        ActionEvent {
            occurrence_key: occurrence_key.to_string(),
            action,
        }
    }
}
