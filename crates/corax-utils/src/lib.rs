//! # Corax Utilities
//!
//! Shared utilities, logging, and helpers for the Corax workspace.
//!
//! This crate provides common functionality used across the Corax crates,
//! most importantly logging infrastructure built on `tracing`. The stack
//! core (`corax-core`) emits structured events; this crate decides where
//! they go and what they look like.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{init_logging, init_logging_with_level, LogFormat, LogLevel, LoggingError};
pub use tracing::{debug, error, info, trace, warn};
