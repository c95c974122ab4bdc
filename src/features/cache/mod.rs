//! # Cache Feature
//!
//! TTL + debounce snapshot cache in front of the reminder store.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false

pub mod schedule_cache;

pub use schedule_cache::{sort_snapshot, ReminderBuckets, ScheduleCache};
