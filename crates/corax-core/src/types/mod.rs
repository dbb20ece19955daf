//! # Types
//!
//! Platform-agnostic types used throughout the stack core.
//!
//! These types abstract away target-specific details, allowing the rest of
//! the crate to work with concepts like "memory address" and "thread id"
//! without knowing whether the target is a live agent or a core dump.

pub mod address;
pub mod thread;

// Re-export all public types
pub use address::Address;
pub use thread::ThreadId;
