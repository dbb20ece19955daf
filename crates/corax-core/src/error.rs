//! # Error Types
//!
//! Error handling for the stack core.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! The taxonomy is deliberately small. Programming-contract violations
//! (out-of-range frame indices, inline-depth queries against a stack whose
//! invariants are broken) are bugs in the calling code and panic instead of
//! appearing here. Missing-but-not-wrong data (no base pointer yet, no
//! fingerprint for the outermost frame of a partial unwind) is an empty
//! `Option`, not an error. What remains is the set of failures a correct
//! caller can actually race into.

use thiserror::Error;

/// Main error type for stack and frame-identity operations
///
/// ## Error Categories
///
/// 1. **Stale identity**: `StackChanged` — the logical frame a caller asked
///    about no longer exists after an asynchronous round trip.
/// 2. **Liveness**: `TargetDestroyed` — the stack (or its owning thread) was
///    torn down while a deferred callback was still pending.
/// 3. **Upstream failures**: `FetchFailed` — the agent or core-dump reader
///    failed while producing a full unwind; the message is passed through
///    verbatim.
///
/// The enum is `Clone` because one upstream fetch can complete several
/// coalesced requests, each of which receives its own copy of the result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoraxError
{
    /// The stack was rebuilt across an asynchronous query and the requested
    /// frame no longer matches the snapshot taken when the query was issued.
    ///
    /// This is delivered only to the racing caller, who should drop the stale
    /// request. It does not indicate anything wrong with the stack itself.
    #[error("stack changed across queries")]
    StackChanged,

    /// The stack or its owning thread was destroyed while a deferred callback
    /// was pending. Terminal for that request; there is nothing to retry.
    #[error("target destroyed")]
    TargetDestroyed,

    /// Fetching the full unwind from the agent or core-dump reader failed.
    ///
    /// The message comes verbatim from the transport layer (for example
    /// "agent connection closed" or "core file truncated at 0x..."). It is
    /// delivered to the triggering `sync_frames` call and to every pending
    /// fingerprint request sharing that fetch.
    #[error("frame sync failed: {0}")]
    FetchFailed(String),
}

/// Convenience type alias for `Result<T, CoraxError>`
///
/// ```rust
/// use corax_core::error::CoraxResult;
/// fn foo() -> CoraxResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type CoraxResult<T> = std::result::Result<T, CoraxError>;
