//! Notification presentation collaborator trait
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use anyhow::Result;

/// Actions a presented alert may offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertAction {
    Snooze,
    Complete,
    Dismiss,
}

/// Actionable alert presentation collaborator.
pub trait NotificationPort: Send + Sync {
    /// Present an actionable alert for one occurrence. A `None` detail means
    /// the reminder has no description and the detail line is suppressed.
    /// Presenting the same occurrence key again replaces the prior alert.
    fn present(
        &self,
        occurrence_key: &str,
        title: &str,
        detail: Option<&str>,
        actions: &[AlertAction],
    ) -> Result<()>;

    /// Tear down the alert for one occurrence, stopping any in-flight
    /// sound or vibration along with it.
    fn withdraw(&self, occurrence_key: &str);
}
