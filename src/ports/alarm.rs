//! Platform alarm collaborator trait
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use anyhow::Result;
use chrono::{DateTime, Utc};

/// Exact-time wake-up collaborator.
///
/// Registrations are keyed; re-registering a key replaces any prior
/// registration. The platform delivers fires asynchronously to whatever
/// callback path the host wired up (typically straight into
/// `ReminderEngine::handle_fire` with the registration's payload).
///
/// Exact-alarm permission handling is the host's problem; the engine only
/// queries the capability and degrades to best-effort registration when it
/// is denied.
pub trait AlarmPort: Send + Sync {
    /// Register a wake-up at `at`. The opaque payload is handed back
    /// verbatim when the alarm fires.
    fn schedule_at(&self, key: &str, at: DateTime<Utc>, payload: Vec<u8>) -> Result<()>;

    /// Remove a registration. Cancelling an unknown key is not an error.
    fn cancel(&self, key: &str) -> Result<()>;

    /// Whether the platform currently grants exact scheduling.
    fn can_schedule_exact(&self) -> bool;
}
