//! Cooperative task queue.
//!
//! The stack core is single-threaded: "asynchronous" work is deferred onto
//! this queue and run later on the same control thread, never on another OS
//! thread. That keeps every mutation of a [`Stack`](crate::stack::Stack)
//! confined to one thread with no locking, while still giving callers a
//! uniform callback contract — a completion that is already known never runs
//! inline inside the call that requested it.
//!
//! Tests drive the queue explicitly with [`TaskQueue::run_until_idle`]; an
//! embedding debugger pumps it from its main loop.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

type Task = Box<dyn FnOnce()>;

/// Handle to a single-threaded deferred-task queue.
///
/// Cheap to clone; all clones share the same queue.
#[derive(Clone, Default)]
pub struct TaskQueue
{
    tasks: Rc<RefCell<VecDeque<Task>>>,
}

impl TaskQueue
{
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Append a task to run on the next [`run_until_idle`](Self::run_until_idle).
    pub fn post(&self, task: impl FnOnce() + 'static)
    {
        self.tasks.borrow_mut().push_back(Box::new(task));
    }

    /// Run queued tasks in posting order until the queue is empty.
    ///
    /// Tasks may post further tasks; those run within the same call.
    pub fn run_until_idle(&self)
    {
        loop {
            // Release the borrow before running the task so it can post.
            let task = self.tasks.borrow_mut().pop_front();
            match task {
                Some(task) => task(),
                None => break,
            }
        }
    }

    /// Whether nothing is currently queued.
    #[must_use]
    pub fn is_idle(&self) -> bool
    {
        self.tasks.borrow().is_empty()
    }
}
