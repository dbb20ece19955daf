//! Frame abstraction.
//!
//! A logical stack entry is either *physical* (a real function call with its
//! own register state) or *inline* (a compiler-inlined call reconstructed
//! purely from symbol data). Physical frames are produced by the
//! [`StackDelegate`](crate::delegate::StackDelegate) factory — that is where
//! live-agent vs core-dump backing is decided, exactly once, at construction.
//! Inline frames are synthesized by the [`Stack`](crate::stack::Stack) itself
//! and have no register state of their own: every register or memory
//! operation delegates to the physical frame they wrap.
//!
//! Consumers see both through [`FrameView`](crate::stack::FrameView), which
//! never fails: data a frame does not have yet (a base pointer pending a
//! register fetch, a file/line the symbolizer could not resolve) is an empty
//! `Option`, not an error.

use std::rc::Rc;

use crate::symbols::Location;
use crate::types::Address;

/// Callback type for the asynchronous base-pointer fetch.
pub type BasePointerCallback = Box<dyn FnOnce(Option<Address>)>;

/// Read access to symbol-level target data for one frame.
///
/// Expression evaluation resolves variables against this capability. For a
/// live target it reads registers and memory over the wire; for a core dump
/// it reads the captured images. The stack core only routes it: inline
/// frames hand out their physical frame's provider unchanged.
pub trait SymbolDataProvider
{
    /// Value of a named register in this frame's context, if known.
    fn register_value(&self, name: &str) -> Option<u64>;

    /// Read `len` bytes of target memory at `address`, if accessible.
    fn read_memory(&self, address: Address, len: usize) -> Option<Vec<u8>>;
}

/// One real (non-inlined) stack frame.
///
/// Implementations are constructed by
/// [`StackDelegate::make_frame`](crate::delegate::StackDelegate::make_frame)
/// and owned exclusively by the [`Stack`](crate::stack::Stack); they are
/// dropped en masse on the next rebuild. None of these operations fail —
/// absent data is an empty `Option`.
pub trait PhysicalFrame
{
    /// Instruction pointer of this frame.
    fn address(&self) -> Address;

    /// Symbolized location, as computed during stack reconstruction.
    fn location(&self) -> &Location;

    /// Stack pointer at the time of the unwind.
    fn stack_pointer(&self) -> Address;

    /// Base pointer, if it was part of the raw unwind or already fetched.
    fn base_pointer(&self) -> Option<Address>;

    /// Fetch the base pointer, completing on the task queue.
    ///
    /// Completes with `None` when the register is genuinely unavailable
    /// (stripped frame, dead agent). Implementations must not invoke the
    /// callback inline.
    fn fetch_base_pointer(&self, callback: BasePointerCallback);

    /// Capability for reading registers and memory in this frame's context.
    fn symbol_data_provider(&self) -> Rc<dyn SymbolDataProvider>;
}

/// A compiler-inlined call, synthesized during stack reconstruction.
///
/// Stores only what distinguishes it from its physical frame: its own
/// [`Location`]. The back-reference to the physical frame is a position
/// index into the owning stack's frame storage, so rebuilding the stack
/// invalidates every inline frame together with everything else — there is
/// no individually dangling pointer to worry about.
#[derive(Debug)]
pub struct InlineFrame
{
    pub(crate) physical_index: usize,
    pub(crate) location: Location,
}

impl InlineFrame
{
    pub(crate) fn new(physical_index: usize, location: Location) -> Self
    {
        Self {
            physical_index,
            location,
        }
    }

    /// Source location of the inlined call.
    pub fn location(&self) -> &Location
    {
        &self.location
    }
}

/// Everything expression evaluation needs from one frame.
///
/// A plain value pair: the frame's location (which differs between an inline
/// frame and its physical frame) and the data provider (which is shared,
/// because an inline frame has no register state of its own).
pub struct FrameEvalContext
{
    location: Location,
    provider: Rc<dyn SymbolDataProvider>,
}

impl FrameEvalContext
{
    pub(crate) fn new(location: Location, provider: Rc<dyn SymbolDataProvider>) -> Self
    {
        Self { location, provider }
    }

    /// Location the evaluation is scoped to.
    pub fn location(&self) -> &Location
    {
        &self.location
    }

    /// Data provider for register and memory reads.
    pub fn data_provider(&self) -> &Rc<dyn SymbolDataProvider>
    {
        &self.provider
    }
}
