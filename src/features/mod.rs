//! # Features Module
//!
//! All engine feature modules: recurrence expansion, alarm scheduling,
//! delivery state tracking, the schedule cache, and action resolution.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0

pub mod actions;
pub mod cache;
pub mod delivery;
pub mod recurrence;
pub mod scheduling;

// Re-export feature items for convenient access
pub use actions::{ActionOutcome, ActionProcessor};
pub use cache::{ReminderBuckets, ScheduleCache};
pub use delivery::{DeliveryState, DeliveryStateMachine};
pub use scheduling::{AlarmKind, AlarmScheduler, FirePayload, ScheduledAlarm, SyncReport};
