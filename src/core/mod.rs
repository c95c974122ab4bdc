//! # Core Module
//!
//! Core domain types, configuration, and error handling for the reminder
//! engine.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Added the typed engine error taxonomy
//! - 1.0.0: Initial creation with reminder and occurrence models

pub mod config;
pub mod error;
pub mod occurrence;
pub mod reminder;

// Re-export commonly used items
pub use config::EngineConfig;
pub use error::EngineError;
pub use occurrence::{base_reminder_id, Occurrence, OCCURRENCE_MARKER};
pub use reminder::{Recurrence, Reminder};
