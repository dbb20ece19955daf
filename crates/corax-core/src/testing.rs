//! Test doubles for the delegate contract.
//!
//! [`MockDelegate`] stands in for the live-agent / core-dump plumbing: it
//! symbolizes from a hand-built function table, manufactures [`TestFrame`]s,
//! and holds full-unwind fetches pending until a test resolves or fails them
//! explicitly. That makes the asynchronous identity protocol fully
//! deterministic under test: nothing completes until the test pumps the
//! [`TaskQueue`] or resolves the mock.
//!
//! Lives in the library (not `#[cfg(test)]`) so downstream crates can drive
//! a `Stack` in their own tests without an agent.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::delegate::{StackDelegate, SyncCallback};
use crate::error::CoraxError;
use crate::frame::{BasePointerCallback, PhysicalFrame, SymbolDataProvider};
use crate::scheduler::TaskQueue;
use crate::stack::{RawFrame, Stack, StackAmount};
use crate::symbols::{FileLine, Function, Location};
use crate::types::Address;

/// Data provider that knows nothing.
pub struct NullDataProvider;

impl SymbolDataProvider for NullDataProvider
{
    fn register_value(&self, _name: &str) -> Option<u64>
    {
        None
    }

    fn read_memory(&self, _address: Address, _len: usize) -> Option<Vec<u8>>
    {
        None
    }
}

/// Physical frame backed by nothing but its raw record.
pub struct TestFrame
{
    raw: RawFrame,
    location: Location,
    queue: TaskQueue,
    provider: Rc<NullDataProvider>,
}

impl TestFrame
{
    /// Construct from a raw record and the location the stack computed.
    pub fn new(raw: RawFrame, location: Location, queue: TaskQueue) -> Self
    {
        Self {
            raw,
            location,
            queue,
            provider: Rc::new(NullDataProvider),
        }
    }
}

impl PhysicalFrame for TestFrame
{
    fn address(&self) -> Address
    {
        self.raw.ip
    }

    fn location(&self) -> &Location
    {
        &self.location
    }

    fn stack_pointer(&self) -> Address
    {
        self.raw.sp
    }

    fn base_pointer(&self) -> Option<Address>
    {
        self.raw.bp
    }

    fn fetch_base_pointer(&self, callback: BasePointerCallback)
    {
        // Postmortem-style immediate completion, still deferred for the
        // uniform never-inline contract.
        let bp = self.raw.bp;
        self.queue.post(move || callback(bp));
    }

    fn symbol_data_provider(&self) -> Rc<dyn SymbolDataProvider>
    {
        Rc::clone(&self.provider) as Rc<dyn SymbolDataProvider>
    }
}

struct MockState
{
    functions: Vec<(Rc<Function>, FileLine)>,
    full_frames: Vec<RawFrame>,
    sync_calls: usize,
    pending: Vec<(Weak<RefCell<Stack>>, SyncCallback)>,
}

/// Scriptable [`StackDelegate`] with call counting and manual fetch control.
pub struct MockDelegate
{
    queue: TaskQueue,
    state: RefCell<MockState>,
}

impl MockDelegate
{
    /// Create a delegate that defers frame-level completions onto `queue`.
    pub fn new(queue: TaskQueue) -> Rc<Self>
    {
        Rc::new(Self {
            queue,
            state: RefCell::new(MockState {
                functions: Vec::new(),
                full_frames: Vec::new(),
                sync_calls: 0,
                pending: Vec::new(),
            }),
        })
    }

    /// Register a function and the execution file/line to report for
    /// addresses it covers.
    ///
    /// The most recently added covering function wins, so a test can add an
    /// enclosing function first and layer an inline instance over part of
    /// its range afterwards.
    pub fn add_function(&self, function: Rc<Function>, execution_line: FileLine)
    {
        self.state.borrow_mut().functions.push((function, execution_line));
    }

    /// Set the raw frames a resolved full-unwind fetch will deliver.
    pub fn set_full_frames(&self, frames: Vec<RawFrame>)
    {
        self.state.borrow_mut().full_frames = frames;
    }

    /// How many times `sync_frames_for_stack` has been called.
    pub fn sync_call_count(&self) -> usize
    {
        self.state.borrow().sync_calls
    }

    /// Number of fetches held pending.
    pub fn pending_count(&self) -> usize
    {
        self.state.borrow().pending.len()
    }

    /// Complete every pending fetch successfully.
    ///
    /// Per the delegate contract the stack is rebuilt (with the configured
    /// full frames) before each callback runs.
    pub fn resolve_pending(&self)
    {
        let (pending, frames) = {
            let mut state = self.state.borrow_mut();
            (std::mem::take(&mut state.pending), state.full_frames.clone())
        };
        for (stack, callback) in pending {
            if let Some(stack) = stack.upgrade() {
                stack.borrow_mut().set_frames(StackAmount::Full, &frames);
                callback(Ok(()));
            }
            // A dead stack already failed its waiters when it was dropped.
        }
    }

    /// Fail every pending fetch with an upstream error message.
    pub fn fail_pending(&self, message: &str)
    {
        let pending = std::mem::take(&mut self.state.borrow_mut().pending);
        for (stack, callback) in pending {
            if stack.upgrade().is_some() {
                callback(Err(CoraxError::FetchFailed(message.to_string())));
            }
        }
    }
}

impl StackDelegate for MockDelegate
{
    fn symbolize_frame(&self, raw: &RawFrame) -> Location
    {
        let state = self.state.borrow();
        for (function, line) in state.functions.iter().rev() {
            if function.covers(raw.ip) {
                return Location::new(raw.ip, Some(line.clone()), 0, Some(Rc::clone(function)));
            }
        }
        Location::address_only(raw.ip)
    }

    fn make_frame(&self, raw: &RawFrame, location: Location) -> Box<dyn PhysicalFrame>
    {
        Box::new(TestFrame::new(*raw, location, self.queue.clone()))
    }

    fn sync_frames_for_stack(&self, stack: Weak<RefCell<Stack>>, callback: SyncCallback)
    {
        let mut state = self.state.borrow_mut();
        state.sync_calls += 1;
        state.pending.push((stack, callback));
    }
}
