//! Common module for library exports

pub use crate::delegate::{StackDelegate, SyncCallback};
pub use crate::error::{CoraxError, CoraxResult};
pub use crate::fingerprint::{FrameFingerprint, StackGrowth};
pub use crate::frame::{FrameEvalContext, InlineFrame, PhysicalFrame, SymbolDataProvider};
pub use crate::scheduler::TaskQueue;
pub use crate::stack::{FingerprintCallback, FrameView, RawFrame, Stack, StackAmount};
pub use crate::symbols::{CodeRange, FileLine, Function, Location};
pub use crate::types::{Address, ThreadId};
