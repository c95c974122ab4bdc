//! # Delivery Feature
//!
//! Per-occurrence delivery state with reentrancy protection.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false

pub mod state_machine;

pub use state_machine::{DeliveryState, DeliveryStateMachine};
