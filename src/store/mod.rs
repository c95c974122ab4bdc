//! # Store Module
//!
//! In-process reminder store infrastructure.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.3.0

pub mod memory;

pub use memory::MemoryStore;
