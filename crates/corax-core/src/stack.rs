//! Logical stack reconstruction and the frame-identity protocol.
//!
//! The unwinder sees one program counter per physical frame; inlining is a
//! compile-time fiction it cannot observe. [`Stack::set_frames`] rebuilds the
//! fiction: each raw frame is symbolized and expanded into zero or more
//! [`InlineFrame`]s followed by exactly one physical frame, all sharing one
//! address and stack pointer but carrying distinct source locations. The
//! result is an innermost-first sequence where inlined calls are first-class
//! frames that "up"/"down"/"finish" can land on.
//!
//! Because every rebuild destroys every frame object, callers that need to
//! refer to "the frame I started from" across an asynchronous round trip use
//! [`FrameFingerprint`]s instead of frames. The async half of that protocol
//! ([`Stack::frame_fingerprint_async`]) snapshots the target frame before any
//! deferred work, fetches the full unwind if one is needed (coalescing
//! concurrent requests onto a single fetch), and re-validates the snapshot
//! before computing anything — a caller either gets the fingerprint of the
//! frame it asked about or a [`CoraxError::StackChanged`], never the
//! fingerprint of whatever frame now occupies the old index.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, warn};

use crate::delegate::{StackDelegate, SyncCallback};
use crate::error::{CoraxError, CoraxResult};
use crate::fingerprint::FrameFingerprint;
use crate::frame::{BasePointerCallback, FrameEvalContext, InlineFrame, PhysicalFrame, SymbolDataProvider};
use crate::scheduler::TaskQueue;
use crate::symbols::Location;
use crate::types::{Address, ThreadId};

/// One record from the unwinder: register snapshot for one physical frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame
{
    /// Instruction pointer.
    pub ip: Address,
    /// Stack pointer.
    pub sp: Address,
    /// Base pointer, when the unwind captured one.
    pub bp: Option<Address>,
}

impl RawFrame
{
    /// Construct a raw frame record.
    pub const fn new(ip: Address, sp: Address, bp: Option<Address>) -> Self
    {
        Self { ip, sp, bp }
    }
}

/// How much of the stack a raw-frame snapshot covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackAmount
{
    /// Top frames only; the agent sends these with every stop.
    Minimal,
    /// Complete unwind down to the first frame of the thread.
    Full,
}

/// Completion callback for an asynchronous fingerprint query.
pub type FingerprintCallback = Box<dyn FnOnce(CoraxResult<FrameFingerprint>)>;

/// Arena slot: either a real frame or a synthesized inline frame.
enum FrameEntry
{
    Physical(Box<dyn PhysicalFrame>),
    Inline(InlineFrame),
}

/// Snapshot of a frame's identity taken before deferred work.
struct FrameSnapshot
{
    address: Address,
    stack_pointer: Address,
    inline_depth: usize,
}

/// Ordered logical frames for one thread, innermost first.
///
/// Owned by its thread for the thread's lifetime; cleared on resume and
/// rebuilt lazily on the next access. Frame objects are owned exclusively by
/// the stack that built them and invalidated en masse by the next
/// [`set_frames`](Stack::set_frames) / [`clear_frames`](Stack::clear_frames);
/// external holders must re-validate or capture a [`FrameFingerprint`]
/// rather than retain frame references across a rebuild.
///
/// The stack is handled as `Rc<RefCell<Stack>>` on its single control
/// thread. The asynchronous operations are associated functions taking that
/// handle, because their deferred completions need a liveness token
/// (`Weak`) checked before they touch any state.
pub struct Stack
{
    thread: ThreadId,
    delegate: Rc<dyn StackDelegate>,
    queue: TaskQueue,
    entries: Vec<FrameEntry>,
    has_all_frames: bool,
    hide_top_inline_frame_count: usize,
    fetch_in_flight: bool,
    pending_syncs: Vec<SyncCallback>,
}

impl Stack
{
    /// Create an empty stack for `thread`.
    pub fn new(thread: ThreadId, delegate: Rc<dyn StackDelegate>, queue: TaskQueue) -> Self
    {
        Self {
            thread,
            delegate,
            queue,
            entries: Vec::new(),
            has_all_frames: false,
            hide_top_inline_frame_count: 0,
            fetch_in_flight: false,
            pending_syncs: Vec::new(),
        }
    }

    /// Create an empty stack already wrapped for shared single-threaded use.
    pub fn new_shared(thread: ThreadId, delegate: Rc<dyn StackDelegate>, queue: TaskQueue) -> Rc<RefCell<Self>>
    {
        Rc::new(RefCell::new(Self::new(thread, delegate, queue)))
    }

    /// Owning thread of this stack.
    pub fn thread(&self) -> ThreadId
    {
        self.thread
    }

    /// Whether the current frames are a complete unwind.
    pub fn has_all_frames(&self) -> bool
    {
        self.has_all_frames
    }

    /// Number of logical frames visible through the current view.
    pub fn len(&self) -> usize
    {
        self.entries.len() - self.hide_top_inline_frame_count
    }

    /// Whether no frames are visible.
    pub fn is_empty(&self) -> bool
    {
        self.len() == 0
    }

    /// Rebuild the logical frame list from raw unwinder output.
    ///
    /// `raw_frames` is innermost first. Every previously handed-out frame
    /// reference is invalidated, and the hide-top-inline view resets to 0.
    pub fn set_frames(&mut self, amount: StackAmount, raw_frames: &[RawFrame])
    {
        self.entries.clear();
        self.hide_top_inline_frame_count = 0;
        self.has_all_frames = amount == StackAmount::Full;
        for raw in raw_frames {
            self.append_expanded(raw);
        }
        debug!(
            thread = self.thread.raw(),
            raw = raw_frames.len(),
            logical = self.entries.len(),
            complete = self.has_all_frames,
            "rebuilt stack"
        );
    }

    /// Test-only alias of [`set_frames`](Stack::set_frames).
    ///
    /// Exists so tests that drive a stack without a thread behind it read the
    /// same as production call sites, where `set_frames` is only ever called
    /// by the delegate or the stop handler.
    pub fn set_frames_for_test(&mut self, amount: StackAmount, raw_frames: &[RawFrame])
    {
        self.set_frames(amount, raw_frames);
    }

    /// Discard all frames and the completeness flag.
    ///
    /// Returns whether anything was actually discarded.
    pub fn clear_frames(&mut self) -> bool
    {
        let changed = !self.entries.is_empty() || self.has_all_frames;
        self.entries.clear();
        self.has_all_frames = false;
        self.hide_top_inline_frame_count = 0;
        if changed {
            debug!(thread = self.thread.raw(), "cleared stack");
        }
        changed
    }

    /// View of the frame at `virtual_index`.
    ///
    /// ## Panics
    ///
    /// Panics if `virtual_index` is out of range; indices come from this
    /// stack, so a bad one is a caller bug.
    pub fn frame(&self, virtual_index: usize) -> FrameView<'_>
    {
        FrameView {
            stack: self,
            storage_index: self.storage_index(virtual_index),
        }
    }

    /// Iterator over all visible frames, innermost first.
    pub fn frames(&self) -> impl Iterator<Item = FrameView<'_>>
    {
        (0..self.len()).map(move |index| self.frame(index))
    }

    /// Virtual index of `frame`, for callers holding a view.
    ///
    /// Returns `None` when the view belongs to a different stack.
    pub fn index_for_frame(&self, frame: &FrameView<'_>) -> Option<usize>
    {
        if !std::ptr::eq(frame.stack, self) {
            return None;
        }
        frame.storage_index.checked_sub(self.hide_top_inline_frame_count)
    }

    /// Number of inline frames between `virtual_index` and its physical frame.
    ///
    /// Counts from `virtual_index` (inclusive) forward to the next physical
    /// frame (exclusive), so a physical frame reports 0 and the innermost of
    /// k stacked inline frames reports k.
    ///
    /// ## Panics
    ///
    /// Panics if `virtual_index` is out of range, or if the frame list
    /// violates the every-inline-run-ends-in-a-physical-frame invariant.
    pub fn inline_depth_for_index(&self, virtual_index: usize) -> usize
    {
        self.inline_depth_at(self.storage_index(virtual_index))
    }

    /// Number of inline frames at the very top of the stack.
    ///
    /// Independent of the hide view: hidden top inline frames still count.
    pub fn top_inline_frame_count(&self) -> usize
    {
        self.entries
            .iter()
            .take_while(|entry| matches!(entry, FrameEntry::Inline(_)))
            .count()
    }

    /// Current hide-top-inline view parameter.
    pub fn hide_top_inline_frame_count(&self) -> usize
    {
        self.hide_top_inline_frame_count
    }

    /// Hide the top `count` inline frames from the virtual index space.
    ///
    /// When the program counter sits at the first address of an inlined call
    /// the user has not stepped into it yet; hiding the ambiguous inline
    /// frames makes virtual index 0 the frame the user believes they are in.
    /// Re-applying the same `count` is a no-op.
    ///
    /// ## Panics
    ///
    /// Panics if `count` exceeds [`top_inline_frame_count`](Stack::top_inline_frame_count).
    pub fn set_hide_top_inline_frame_count(&mut self, count: usize)
    {
        assert!(
            count <= self.top_inline_frame_count(),
            "cannot hide {count} inline frames; only {} at top of stack",
            self.top_inline_frame_count()
        );
        self.hide_top_inline_frame_count = count;
    }

    /// Fingerprint of the frame at `virtual_index`, if computable now.
    ///
    /// The fingerprint pairs the stack pointer of the physical frame one
    /// step older than the target with the inline depth between them. The
    /// outermost frame has no older physical frame; when the unwind is known
    /// complete it falls back to its own stack pointer, otherwise the answer
    /// is `None` — a partial unwind cannot prove there is no older frame,
    /// and callers should use [`frame_fingerprint_async`](Stack::frame_fingerprint_async).
    ///
    /// ## Panics
    ///
    /// Panics if `virtual_index` is out of range.
    pub fn frame_fingerprint(&self, virtual_index: usize) -> Option<FrameFingerprint>
    {
        let index = self.storage_index(virtual_index);
        let depth = self.inline_depth_at(index);
        let older_physical = index + depth + 1;
        if older_physical < self.entries.len() {
            return Some(FrameFingerprint::new(self.entry_stack_pointer(older_physical), depth));
        }
        if self.has_all_frames {
            return Some(FrameFingerprint::new(self.entry_stack_pointer(index), depth));
        }
        None
    }

    /// Fetch the full unwind (if needed) and deliver a completion.
    ///
    /// Uniform contract: when the stack is already complete no fetch happens
    /// but the callback is still dispatched through the task queue, never
    /// inline. When a fetch is needed, concurrent calls coalesce onto the
    /// single in-flight delegate request and complete together, in call
    /// order, each with its own copy of the result.
    pub fn sync_frames(this: &Rc<RefCell<Stack>>, callback: SyncCallback)
    {
        let mut stack = this.borrow_mut();
        if stack.has_all_frames {
            stack.queue.post(move || callback(Ok(())));
            return;
        }

        stack.pending_syncs.push(callback);
        if stack.fetch_in_flight {
            return;
        }
        stack.fetch_in_flight = true;
        let delegate = Rc::clone(&stack.delegate);
        drop(stack);

        let weak = Rc::downgrade(this);
        let completion_weak = Weak::clone(&weak);
        delegate.sync_frames_for_stack(weak, Box::new(move |result| Stack::finish_sync(&completion_weak, result)));
    }

    /// Fingerprint query that survives the full-unwind round trip.
    ///
    /// Snapshots the target frame's address, stack pointer and inline depth
    /// before anything is deferred, syncs frames (coalescing as in
    /// [`sync_frames`](Stack::sync_frames)), then re-validates the snapshot
    /// against whatever now sits at `virtual_index`. A mismatch or vanished
    /// index fails with [`CoraxError::StackChanged`]; a stack destroyed
    /// mid-flight fails with [`CoraxError::TargetDestroyed`]; an upstream
    /// fetch failure is passed through verbatim.
    ///
    /// ## Panics
    ///
    /// Panics if `virtual_index` is out of range at call time.
    pub fn frame_fingerprint_async(this: &Rc<RefCell<Stack>>, virtual_index: usize, callback: FingerprintCallback)
    {
        let snapshot = {
            let stack = this.borrow();
            let index = stack.storage_index(virtual_index);
            FrameSnapshot {
                address: stack.entry_address(index),
                stack_pointer: stack.entry_stack_pointer(index),
                inline_depth: stack.inline_depth_at(index),
            }
        };

        let weak = Rc::downgrade(this);
        Stack::sync_frames(
            this,
            Box::new(move |result| {
                if let Err(err) = result {
                    callback(Err(err));
                    return;
                }
                let Some(this) = weak.upgrade() else {
                    callback(Err(CoraxError::TargetDestroyed));
                    return;
                };
                let outcome = this.borrow().revalidated_fingerprint(virtual_index, &snapshot);
                callback(outcome);
            }),
        );
    }

    /// Completion for the single in-flight delegate fetch: fan the shared
    /// result out to every coalesced waiter.
    fn finish_sync(weak: &Weak<RefCell<Stack>>, result: CoraxResult<()>)
    {
        // A dead stack already failed its waiters from Drop.
        let Some(this) = weak.upgrade() else {
            return;
        };
        let pending = {
            let mut stack = this.borrow_mut();
            stack.fetch_in_flight = false;
            std::mem::take(&mut stack.pending_syncs)
        };
        for callback in pending {
            callback(result.clone());
        }
    }

    fn revalidated_fingerprint(&self, virtual_index: usize, snapshot: &FrameSnapshot) -> CoraxResult<FrameFingerprint>
    {
        if virtual_index >= self.len() {
            return Err(CoraxError::StackChanged);
        }
        let index = self.storage_index(virtual_index);
        if self.entry_address(index) != snapshot.address
            || self.entry_stack_pointer(index) != snapshot.stack_pointer
            || self.inline_depth_at(index) != snapshot.inline_depth
        {
            debug!(virtual_index, "frame changed across fingerprint fetch");
            return Err(CoraxError::StackChanged);
        }
        // The unwind is complete after a successful sync, so the fingerprint
        // is always computable here.
        self.frame_fingerprint(virtual_index).ok_or(CoraxError::StackChanged)
    }

    /// Expand one raw frame into inline frames plus its physical frame.
    fn append_expanded(&mut self, raw: &RawFrame)
    {
        let location = self.delegate.symbolize_frame(raw);
        let Some(function) = location.function().cloned() else {
            // No function resolved; the address-only location is the frame.
            let frame = self.delegate.make_frame(raw, location);
            self.entries.push(FrameEntry::Physical(frame));
            return;
        };

        let chain = function.inline_chain();
        if chain[chain.len() - 1].is_inline() {
            // The outermost chain entry must be a concrete function. Symbol
            // data saying otherwise is corrupt; a best-effort physical frame
            // beats refusing to show a stack.
            warn!(
                address = %location.address(),
                function = function.name(),
                "inline chain has no concrete outermost function; emitting physical frame only"
            );
            let frame = self.delegate.make_frame(raw, location);
            self.entries.push(FrameEntry::Physical(frame));
            return;
        }

        // Chain entry 0 executes at the symbolizer's file/line. Every
        // enclosing entry displays the call site of the entry it inlines,
        // which is recorded on that inner (inline) entry. A missing call
        // site falls back to the execution line.
        let entry_location = |chain_index: usize| -> Location {
            if chain_index == 0 {
                return Location::new(
                    location.address(),
                    location.file_line().cloned(),
                    location.column(),
                    Some(Rc::clone(&chain[0])),
                );
            }
            let file_line = chain[chain_index - 1]
                .call_site()
                .cloned()
                .or_else(|| location.file_line().cloned());
            Location::new(location.address(), file_line, 0, Some(Rc::clone(&chain[chain_index])))
        };

        let physical_index = self.entries.len() + chain.len() - 1;
        for chain_index in 0..chain.len() - 1 {
            self.entries.push(FrameEntry::Inline(InlineFrame::new(
                physical_index,
                entry_location(chain_index),
            )));
        }
        let frame = self.delegate.make_frame(raw, entry_location(chain.len() - 1));
        self.entries.push(FrameEntry::Physical(frame));
    }

    fn storage_index(&self, virtual_index: usize) -> usize
    {
        assert!(
            virtual_index < self.len(),
            "frame index {virtual_index} out of range ({} visible frames)",
            self.len()
        );
        virtual_index + self.hide_top_inline_frame_count
    }

    fn inline_depth_at(&self, storage_index: usize) -> usize
    {
        let mut depth = 0;
        for entry in &self.entries[storage_index..] {
            if matches!(entry, FrameEntry::Physical(_)) {
                return depth;
            }
            depth += 1;
        }
        panic!("inline frame run with no terminating physical frame");
    }

    fn physical_at(&self, storage_index: usize) -> &dyn PhysicalFrame
    {
        match &self.entries[storage_index] {
            FrameEntry::Physical(frame) => frame.as_ref(),
            FrameEntry::Inline(inline) => match &self.entries[inline.physical_index] {
                FrameEntry::Physical(frame) => frame.as_ref(),
                FrameEntry::Inline(_) => panic!("inline frame's physical back-reference is not physical"),
            },
        }
    }

    fn entry_address(&self, storage_index: usize) -> Address
    {
        self.physical_at(storage_index).address()
    }

    fn entry_stack_pointer(&self, storage_index: usize) -> Address
    {
        self.physical_at(storage_index).stack_pointer()
    }
}

impl Drop for Stack
{
    fn drop(&mut self)
    {
        // Waiters on an in-flight fetch must still hear an answer; post the
        // terminal failure so they complete asynchronously like every other
        // path.
        let pending = std::mem::take(&mut self.pending_syncs);
        if pending.is_empty() {
            return;
        }
        debug!(
            thread = self.thread.raw(),
            waiters = pending.len(),
            "stack destroyed with pending sync requests"
        );
        for callback in pending {
            self.queue.post(move || callback(Err(CoraxError::TargetDestroyed)));
        }
    }
}

/// Uniform read surface over one logical frame, physical or inline.
///
/// Borrowed from the stack, so it cannot outlive a rebuild. None of these
/// operations fail; data the frame does not have is an empty `Option`.
#[derive(Clone, Copy)]
pub struct FrameView<'a>
{
    stack: &'a Stack,
    storage_index: usize,
}

impl<'a> FrameView<'a>
{
    /// Whether this is a synthesized inline frame.
    pub fn is_inline(&self) -> bool
    {
        matches!(self.entry(), FrameEntry::Inline(_))
    }

    /// Instruction pointer. Equal to the physical frame's for inline frames.
    pub fn address(&self) -> Address
    {
        self.stack.entry_address(self.storage_index)
    }

    /// Source location of this logical frame.
    ///
    /// This is where physical and inline frames differ: an inline frame has
    /// its own file/line and function even though it shares the physical
    /// frame's address.
    pub fn location(&self) -> &'a Location
    {
        match self.entry() {
            FrameEntry::Physical(frame) => frame.location(),
            FrameEntry::Inline(inline) => inline.location(),
        }
    }

    /// The physical frame backing this one; itself for physical frames.
    pub fn physical_frame(&self) -> FrameView<'a>
    {
        match self.entry() {
            FrameEntry::Physical(_) => *self,
            FrameEntry::Inline(inline) => FrameView {
                stack: self.stack,
                storage_index: inline.physical_index,
            },
        }
    }

    /// Stack pointer of the backing physical frame.
    pub fn stack_pointer(&self) -> Address
    {
        self.stack.entry_stack_pointer(self.storage_index)
    }

    /// Base pointer, if already known.
    pub fn base_pointer(&self) -> Option<Address>
    {
        self.stack.physical_at(self.storage_index).base_pointer()
    }

    /// Fetch the base pointer via the backing physical frame.
    pub fn fetch_base_pointer(&self, callback: BasePointerCallback)
    {
        self.stack.physical_at(self.storage_index).fetch_base_pointer(callback);
    }

    /// Register/memory access capability of the backing physical frame.
    pub fn symbol_data_provider(&self) -> Rc<dyn SymbolDataProvider>
    {
        self.stack.physical_at(self.storage_index).symbol_data_provider()
    }

    /// Evaluation context: this frame's location plus the shared provider.
    pub fn eval_context(&self) -> FrameEvalContext
    {
        FrameEvalContext::new(self.location().clone(), self.symbol_data_provider())
    }

    /// Thread owning the stack this frame belongs to.
    pub fn thread(&self) -> ThreadId
    {
        self.stack.thread
    }

    /// Virtual index of this frame in its stack's current view.
    pub fn index(&self) -> usize
    {
        self.storage_index - self.stack.hide_top_inline_frame_count
    }

    fn entry(&self) -> &'a FrameEntry
    {
        &self.stack.entries[self.storage_index]
    }
}
