//! Stack delegate contract.
//!
//! The [`Stack`](crate::stack::Stack) has exactly one external dependency:
//! something that can symbolize a raw frame, build a concrete physical frame,
//! and fetch a complete unwind. Whether that something talks to a live agent
//! over a wire or reads a core dump is decided by whoever constructs the
//! delegate; the stack core never inspects which it got.

use std::cell::RefCell;
use std::rc::Weak;

use crate::error::CoraxResult;
use crate::frame::PhysicalFrame;
use crate::stack::{RawFrame, Stack};
use crate::symbols::Location;

/// Completion callback for a full-unwind fetch.
pub type SyncCallback = Box<dyn FnOnce(CoraxResult<()>)>;

/// External capability consumed by [`Stack`].
pub trait StackDelegate
{
    /// Symbolize one raw frame.
    ///
    /// Synchronous and cheap: backed only by already-loaded symbol tables,
    /// never by a round trip. An address with no symbol coverage still
    /// yields a valid (address-only) [`Location`].
    fn symbolize_frame(&self, raw: &RawFrame) -> Location;

    /// Build the concrete physical frame for one raw frame.
    ///
    /// `location` is the location the stack computed for the frame during
    /// inline expansion, which is not always the symbolizer's own (the
    /// physical frame under an inline chain shows the call site, not the
    /// execution line).
    fn make_frame(&self, raw: &RawFrame, location: Location) -> Box<dyn PhysicalFrame>;

    /// Fetch a complete unwind for `stack`.
    ///
    /// Implementations must call [`Stack::set_frames`] with the full frame
    /// list (after upgrading `stack`) *before* invoking `callback`, so the
    /// callback observes the rebuilt stack. If the stack has been destroyed
    /// by the time the fetch completes, the implementation just drops the
    /// callback — the stack notified its own waiters when it was dropped.
    ///
    /// The stack issues at most one of these per stack at a time; concurrent
    /// requests are coalesced before the delegate ever sees them.
    fn sync_frames_for_stack(&self, stack: Weak<RefCell<Stack>>, callback: SyncCallback);
}
