// Core layer - shared types, configuration, and error taxonomy
pub mod core;

// Ports layer - external collaborator interfaces
pub mod ports;

// Features layer - all engine feature modules
pub mod features;

// Infrastructure - in-process reminder store
pub mod store;

// Application layer - engine wiring
pub mod engine;

// Test support - recording port doubles
pub mod testkit;

// Re-export core items for convenient access
pub use crate::core::{
    base_reminder_id, EngineConfig, EngineError, Occurrence, Recurrence, Reminder,
};

// Re-export feature items
pub use crate::features::{
    ActionOutcome, ActionProcessor, AlarmKind, AlarmScheduler, DeliveryState,
    DeliveryStateMachine, FirePayload, ReminderBuckets, ScheduleCache, ScheduledAlarm, SyncReport,
};

// Re-export ports and the engine
pub use crate::engine::ReminderEngine;
pub use crate::ports::{
    ActionEvent, AlarmPort, AlertAction, NotificationPort, ReminderStore, UserAction,
};
