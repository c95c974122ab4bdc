//! # Actions Feature
//!
//! At-most-once resolution of user actions against fired occurrences.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.3.0
//! - **Toggleable**: false

pub mod processor;

pub use processor::{ActionOutcome, ActionProcessor};
