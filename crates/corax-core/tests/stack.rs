//! Tests for inline expansion, indexing, and the hide-top-inline view.

use std::cell::Cell;
use std::rc::Rc;

use corax_core::symbols::{CodeRange, FileLine, Function};
use corax_core::testing::MockDelegate;
use corax_core::{Address, RawFrame, Stack, StackAmount, TaskQueue, ThreadId};

fn range(begin: u64, end: u64) -> CodeRange
{
    CodeRange::new(Address::new(begin), Address::new(end))
}

/// Stack whose bottom frame sits inside one inlined call:
/// - top raw frame in a plain function at file.cc:30
/// - bottom raw frame inside `inlinee` (call site file.cc:10, executing at file.cc:20)
///   which is inlined into `outer`
fn build_scenario_stack(queue: &TaskQueue) -> (Rc<std::cell::RefCell<Stack>>, Rc<MockDelegate>)
{
    let delegate = MockDelegate::new(queue.clone());

    let top_fn = Function::new_physical("top_call", vec![range(0x1000, 0x1100)]);
    delegate.add_function(top_fn, FileLine::new("file.cc", 30));

    let outer = Function::new_physical("outer", vec![range(0x2000, 0x2100)]);
    delegate.add_function(Rc::clone(&outer), FileLine::new("file.cc", 15));
    let inlinee = Function::new_inline(
        "inlinee",
        vec![range(0x2040, 0x2060)],
        FileLine::new("file.cc", 10),
        outer,
    );
    delegate.add_function(inlinee, FileLine::new("file.cc", 20));

    let stack = Stack::new_shared(ThreadId::from(1), delegate.clone(), queue.clone());
    stack.borrow_mut().set_frames(
        StackAmount::Full,
        &[
            RawFrame::new(Address::new(0x1010), Address::new(0x7000), None),
            RawFrame::new(Address::new(0x2050), Address::new(0x7100), Some(Address::new(0x7180))),
        ],
    );
    (stack, delegate)
}

#[test]
fn test_inline_expansion_scenario()
{
    let queue = TaskQueue::new();
    let (stack, _delegate) = build_scenario_stack(&queue);
    let stack = stack.borrow();

    assert_eq!(stack.len(), 3);

    let top = stack.frame(0);
    assert!(!top.is_inline());
    assert_eq!(top.address(), Address::new(0x1010));
    assert_eq!(top.location().file_line().unwrap(), &FileLine::new("file.cc", 30));

    // The inlined call shows its execution line.
    let middle = stack.frame(1);
    assert!(middle.is_inline());
    assert_eq!(middle.address(), Address::new(0x2050));
    assert_eq!(middle.location().file_line().unwrap(), &FileLine::new("file.cc", 20));
    assert_eq!(middle.location().function().unwrap().name(), "inlinee");

    // The physical frame under it shows the call site, not the execution line.
    let bottom = stack.frame(2);
    assert!(!bottom.is_inline());
    assert_eq!(bottom.address(), Address::new(0x2050));
    assert_eq!(bottom.location().file_line().unwrap(), &FileLine::new("file.cc", 10));
    assert_eq!(bottom.location().function().unwrap().name(), "outer");
}

#[test]
fn test_inline_frame_shares_physical_registers()
{
    let queue = TaskQueue::new();
    let (stack, _delegate) = build_scenario_stack(&queue);
    let stack = stack.borrow();

    let inline = stack.frame(1);
    let physical = inline.physical_frame();
    assert!(!physical.is_inline());
    assert_eq!(stack.index_for_frame(&physical), Some(2));
    assert_eq!(inline.address(), physical.address());
    assert_eq!(inline.stack_pointer(), physical.stack_pointer());
    assert_eq!(inline.base_pointer(), Some(Address::new(0x7180)));

    // A physical frame's physical frame is itself.
    assert_eq!(stack.index_for_frame(&physical.physical_frame()), Some(2));
}

#[test]
fn test_inline_depth_ladder()
{
    let queue = TaskQueue::new();
    let delegate = MockDelegate::new(queue.clone());

    // Three nested inlined calls inside one physical function.
    let physical = Function::new_physical("base", vec![range(0x1000, 0x1100)]);
    let inline2 = Function::new_inline(
        "in2",
        vec![range(0x1040, 0x1080)],
        FileLine::new("a.cc", 1),
        physical,
    );
    let inline1 = Function::new_inline(
        "in1",
        vec![range(0x1050, 0x1070)],
        FileLine::new("a.cc", 2),
        inline2,
    );
    let inline0 = Function::new_inline(
        "in0",
        vec![range(0x1058, 0x1060)],
        FileLine::new("a.cc", 3),
        inline1,
    );
    delegate.add_function(inline0, FileLine::new("a.cc", 4));

    let stack = Stack::new_shared(ThreadId::from(1), delegate, queue);
    stack
        .borrow_mut()
        .set_frames(StackAmount::Full, &[RawFrame::new(
            Address::new(0x1059),
            Address::new(0x7000),
            None,
        )]);

    let stack = stack.borrow();
    assert_eq!(stack.len(), 4);
    assert_eq!(stack.inline_depth_for_index(0), 3);
    assert_eq!(stack.inline_depth_for_index(1), 2);
    assert_eq!(stack.inline_depth_for_index(2), 1);
    assert_eq!(stack.inline_depth_for_index(3), 0);
}

#[test]
fn test_unsymbolized_frame_stays_physical()
{
    let queue = TaskQueue::new();
    let delegate = MockDelegate::new(queue.clone());
    let stack = Stack::new_shared(ThreadId::from(1), delegate, queue);
    stack
        .borrow_mut()
        .set_frames(StackAmount::Full, &[RawFrame::new(
            Address::new(0xdead),
            Address::new(0x7000),
            None,
        )]);

    let stack = stack.borrow();
    assert_eq!(stack.len(), 1);
    let frame = stack.frame(0);
    assert!(!frame.is_inline());
    assert!(frame.location().file_line().is_none());
    assert!(frame.location().function().is_none());
}

#[test]
fn test_corrupt_inline_chain_falls_back_to_physical()
{
    let queue = TaskQueue::new();
    let delegate = MockDelegate::new(queue.clone());
    // Inline instance with no enclosing function: corrupt symbol data.
    let orphan = Function::new_orphan_inline("orphan", vec![range(0x1000, 0x1100)]);
    delegate.add_function(orphan, FileLine::new("bad.cc", 7));

    let stack = Stack::new_shared(ThreadId::from(1), delegate, queue);
    stack
        .borrow_mut()
        .set_frames(StackAmount::Full, &[RawFrame::new(
            Address::new(0x1010),
            Address::new(0x7000),
            None,
        )]);

    let stack = stack.borrow();
    assert_eq!(stack.len(), 1);
    let frame = stack.frame(0);
    assert!(!frame.is_inline());
    assert_eq!(stack.inline_depth_for_index(0), 0);
    // Best effort: the symbolizer's own location is kept.
    assert_eq!(frame.location().file_line().unwrap(), &FileLine::new("bad.cc", 7));
}

#[test]
fn test_hide_top_inline_frames()
{
    let queue = TaskQueue::new();
    let delegate = MockDelegate::new(queue.clone());
    let physical = Function::new_physical("base", vec![range(0x1000, 0x1100)]);
    let inline1 = Function::new_inline(
        "in1",
        vec![range(0x1040, 0x1080)],
        FileLine::new("a.cc", 1),
        physical,
    );
    let inline0 = Function::new_inline(
        "in0",
        vec![range(0x1050, 0x1060)],
        FileLine::new("a.cc", 2),
        inline1,
    );
    delegate.add_function(inline0, FileLine::new("a.cc", 3));

    let stack = Stack::new_shared(ThreadId::from(1), delegate, queue);
    stack.borrow_mut().set_frames(
        StackAmount::Full,
        &[
            RawFrame::new(Address::new(0x1055), Address::new(0x7000), None),
            RawFrame::new(Address::new(0xdead), Address::new(0x7100), None),
        ],
    );

    let mut stack = stack.borrow_mut();
    assert_eq!(stack.len(), 4);
    assert_eq!(stack.top_inline_frame_count(), 2);

    stack.set_hide_top_inline_frame_count(1);
    assert_eq!(stack.len(), 3);
    // The hide view shifts virtual indices but not the top inline count.
    assert_eq!(stack.top_inline_frame_count(), 2);
    assert_eq!(stack.frame(0).location().function().unwrap().name(), "in1");
    assert_eq!(stack.inline_depth_for_index(0), 1);

    // Re-applying the same count is a no-op.
    stack.set_hide_top_inline_frame_count(1);
    assert_eq!(stack.len(), 3);

    stack.set_hide_top_inline_frame_count(2);
    assert_eq!(stack.len(), 2);
    assert_eq!(stack.frame(0).location().function().unwrap().name(), "base");

    // A rebuild resets the view.
    stack.set_frames(StackAmount::Full, &[RawFrame::new(
        Address::new(0x1055),
        Address::new(0x7000),
        None,
    )]);
    assert_eq!(stack.hide_top_inline_frame_count(), 0);
}

#[test]
#[should_panic(expected = "cannot hide")]
fn test_hide_more_than_top_inline_frames_panics()
{
    let queue = TaskQueue::new();
    let delegate = MockDelegate::new(queue.clone());
    let stack = Stack::new_shared(ThreadId::from(1), delegate, queue);
    stack
        .borrow_mut()
        .set_frames(StackAmount::Full, &[RawFrame::new(
            Address::new(0x1000),
            Address::new(0x7000),
            None,
        )]);
    stack.borrow_mut().set_hide_top_inline_frame_count(1);
}

#[test]
#[should_panic(expected = "out of range")]
fn test_out_of_range_index_panics()
{
    let queue = TaskQueue::new();
    let delegate = MockDelegate::new(queue.clone());
    let stack = Stack::new_shared(ThreadId::from(1), delegate, queue);
    let stack = stack.borrow();
    let _ = stack.frame(0);
}

#[test]
fn test_clear_frames_reports_change()
{
    let queue = TaskQueue::new();
    let (stack, _delegate) = build_scenario_stack(&queue);
    let mut stack = stack.borrow_mut();

    assert!(stack.has_all_frames());
    assert!(stack.clear_frames());
    assert_eq!(stack.len(), 0);
    assert!(stack.is_empty());
    assert!(!stack.has_all_frames());
    // Nothing left to clear.
    assert!(!stack.clear_frames());
}

#[test]
fn test_rebuild_round_trip_is_identical()
{
    let queue = TaskQueue::new();
    let (stack, _delegate) = build_scenario_stack(&queue);
    let raw = [
        RawFrame::new(Address::new(0x1010), Address::new(0x7000), None),
        RawFrame::new(Address::new(0x2050), Address::new(0x7100), Some(Address::new(0x7180))),
    ];

    let capture = |stack: &Stack| {
        (0..stack.len())
            .map(|i| {
                (
                    stack.frame(i).address(),
                    stack.frame(i).is_inline(),
                    stack.inline_depth_for_index(i),
                    stack.frame_fingerprint(i),
                )
            })
            .collect::<Vec<_>>()
    };

    let before = capture(&stack.borrow());
    {
        let mut stack = stack.borrow_mut();
        assert!(stack.clear_frames());
        stack.set_frames_for_test(StackAmount::Full, &raw);
    }
    let after = capture(&stack.borrow());
    assert_eq!(before, after);
}

#[test]
fn test_index_for_frame_rejects_foreign_stack()
{
    let queue = TaskQueue::new();
    let (stack_a, _delegate_a) = build_scenario_stack(&queue);
    let (stack_b, _delegate_b) = build_scenario_stack(&queue);

    let stack_a = stack_a.borrow();
    let stack_b = stack_b.borrow();
    let frame = stack_a.frame(1);
    assert_eq!(stack_a.index_for_frame(&frame), Some(1));
    assert_eq!(stack_b.index_for_frame(&frame), None);
}

#[test]
fn test_frames_iterator_order_and_thread()
{
    let queue = TaskQueue::new();
    let (stack, _delegate) = build_scenario_stack(&queue);
    let stack = stack.borrow();

    let indices: Vec<usize> = stack.frames().map(|frame| frame.index()).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert!(stack.frames().all(|frame| frame.thread() == ThreadId::from(1)));
}

#[test]
fn test_base_pointer_fetch_is_deferred()
{
    let queue = TaskQueue::new();
    let (stack, _delegate) = build_scenario_stack(&queue);
    let stack = stack.borrow();

    let fetched = Rc::new(Cell::new(None));
    let fetched_clone = Rc::clone(&fetched);
    stack
        .frame(1)
        .fetch_base_pointer(Box::new(move |bp| fetched_clone.set(bp)));

    // Never inline: nothing is delivered until the queue runs.
    assert_eq!(fetched.get(), None);
    assert!(!queue.is_idle());
    queue.run_until_idle();
    assert!(queue.is_idle());
    assert_eq!(fetched.get(), Some(Address::new(0x7180)));
}

#[test]
fn test_eval_context_tracks_logical_frame()
{
    let queue = TaskQueue::new();
    let (stack, _delegate) = build_scenario_stack(&queue);
    let stack = stack.borrow();

    let inline_ctx = stack.frame(1).eval_context();
    let physical_ctx = stack.frame(2).eval_context();

    // Same physical registers, different source scope.
    assert_eq!(inline_ctx.location().file_line().unwrap(), &FileLine::new("file.cc", 20));
    assert_eq!(
        physical_ctx.location().file_line().unwrap(),
        &FileLine::new("file.cc", 10)
    );
    assert!(inline_ctx.data_provider().register_value("rbp").is_none());
}
