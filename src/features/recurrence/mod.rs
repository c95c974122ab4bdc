//! # Recurrence Feature
//!
//! Pure expansion of recurrence rules into concrete future occurrences.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod expander;

pub use expander::{expand, expand_until, HORIZON_MONTHS};
