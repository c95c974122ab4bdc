//! # Scheduling Feature
//!
//! Diff-based exact-alarm registration with lead-time alerts and
//! best-effort degrade when exact scheduling is denied.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod scheduler;

pub use scheduler::{
    registration_key, AlarmKind, AlarmScheduler, FirePayload, ScheduledAlarm, SyncReport,
};
