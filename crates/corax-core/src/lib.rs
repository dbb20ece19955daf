//! # corax-core
//!
//! Call-stack reconstruction and frame identity for the Corax
//! remote/postmortem debugger.
//!
//! Given a flat, innermost-first list of raw unwound frames and a symbol
//! provider, this crate produces a logical stack in which compiler-inlined
//! calls appear as first-class frames, and gives every logical frame a
//! small, durable identity (a [`FrameFingerprint`]) that stays valid after
//! the underlying frame objects have been destroyed or rebuilt. Higher-level
//! commands ("finish", "step out", scoped breakpoints, evaluating against
//! "the current frame") rely on that identity to survive asynchronous round
//! trips and stack invalidation.
//!
//! Deliberately *not* here: the wire protocol that fetches raw frames, the
//! unwinder, DWARF parsing, breakpoint state machines, register/memory
//! access, and any command-line surface. The stack reaches all of that
//! through one [`StackDelegate`](delegate::StackDelegate) capability plus
//! opaque symbol objects.
//!
//! ## Threading
//!
//! Everything is single-threaded and cooperative: "asynchronous" means
//! deferred onto a [`TaskQueue`](scheduler::TaskQueue) pumped by the same
//! control thread, never another OS thread. There is no locking anywhere in
//! this crate.

pub mod delegate;
pub mod error;
pub mod fingerprint;
pub mod frame;
pub mod prelude;
pub mod scheduler;
pub mod stack;
pub mod symbols;
pub mod testing;
pub mod types;

// Re-export commonly used types
pub use error::{CoraxError, CoraxResult};
pub use fingerprint::{FrameFingerprint, StackGrowth};
pub use scheduler::TaskQueue;
pub use stack::{FrameView, RawFrame, Stack, StackAmount};
pub use types::{Address, ThreadId};
