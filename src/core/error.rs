//! # Engine Error Taxonomy
//!
//! Failure classes the engine distinguishes. Everything transient or
//! per-occurrence is collected rather than propagated; nothing here is ever
//! allowed to escape an alarm-fire callback.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0

use thiserror::Error;

/// Failure classes surfaced by the scheduling and delivery engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The reminder store is unreachable or refused a write. Transient;
    /// callers should retry. Scheduled alarms are never dropped because of
    /// a store outage.
    #[error("reminder store unavailable: {0}")]
    StoreUnavailable(String),

    /// The platform denied exact-scheduling capability. The scheduler
    /// degrades to best-effort registration and surfaces this once per sync.
    #[error("exact alarm scheduling denied by platform")]
    SchedulingDenied,

    /// A stored recurrence rule could not be parsed. Treated as `Never`,
    /// logged, never fatal.
    #[error("malformed recurrence rule: {0}")]
    MalformedRecurrence(String),

    /// A fire callback arrived for an occurrence that already fired.
    /// Swallowed by the reentrancy guard; not a real failure.
    #[error("duplicate fire for occurrence {0}")]
    DuplicateFire(String),

    /// An action referenced an occurrence with no known base reminder.
    /// Reported as a no-op failure, never a crash.
    #[error("unknown occurrence {0}")]
    UnknownOccurrence(String),

    /// An alarm registration was rejected by the platform port.
    #[error("alarm registration failed for {key}: {reason}")]
    RegistrationFailed { key: String, reason: String },
}
