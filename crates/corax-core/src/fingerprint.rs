//! Durable frame identity.
//!
//! Frame objects die whenever their [`Stack`](crate::stack::Stack) is rebuilt,
//! which happens on every resume and on every full-unwind fetch. Commands like
//! "finish" and "step out" need to know, possibly much later, whether the frame
//! they were started from still exists or has been returned past. A
//! [`FrameFingerprint`] captures just enough to answer that without keeping any
//! frame alive: the stack pointer that bounds the frame from the older side,
//! plus how deep inside an inline chain the frame sits.

use std::cmp::Ordering;

use crate::types::Address;

/// Which way the stack grows on the target architecture.
///
/// Fingerprint ordering needs to know which of two stack pointers is *older*.
/// On almost every common target the stack grows down (older frames have
/// larger stack pointers), but the direction is a property of the target, so
/// it is an explicit parameter of every comparison rather than a baked-in
/// assumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StackGrowth
{
    /// Stack grows toward lower addresses; larger stack pointer = older frame.
    #[default]
    Descending,
    /// Stack grows toward higher addresses; smaller stack pointer = older frame.
    Ascending,
}

/// Identity of one logical frame, valid across stack rebuilds.
///
/// The stack pointer recorded here is *not* the frame's own: it is the stack
/// pointer of the physical frame one step older (see
/// [`Stack::frame_fingerprint`](crate::stack::Stack::frame_fingerprint)),
/// which bounds everything the frame and its callees pushed. Two fingerprints
/// captured from different generations of the same logical frame compare
/// equal; a frame that has been returned past compares newer than the
/// fingerprint of the frame that replaced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameFingerprint
{
    stack_pointer: Address,
    inline_depth: usize,
}

impl FrameFingerprint
{
    /// Construct from a bounding stack pointer and inline nesting depth.
    pub const fn new(stack_pointer: Address, inline_depth: usize) -> Self
    {
        Self {
            stack_pointer,
            inline_depth,
        }
    }

    /// Bounding stack pointer component.
    pub const fn stack_pointer(&self) -> Address
    {
        self.stack_pointer
    }

    /// Inline nesting depth component (0 = the physical frame itself).
    pub const fn inline_depth(&self) -> usize
    {
        self.inline_depth
    }

    /// Total age order. `Ordering::Less` means `self` is newer than `other`.
    ///
    /// Stack pointers compare first, in the older direction given by
    /// `growth`. With equal stack pointers the frames belong to the same
    /// physical frame and the deeper inline nesting is the newer call.
    pub fn compare_age(&self, other: &FrameFingerprint, growth: StackGrowth) -> Ordering
    {
        let by_stack_pointer = match growth {
            StackGrowth::Descending => self.stack_pointer.cmp(&other.stack_pointer),
            StackGrowth::Ascending => other.stack_pointer.cmp(&self.stack_pointer),
        };
        by_stack_pointer.then(other.inline_depth.cmp(&self.inline_depth))
    }

    /// Whether `self` identifies a strictly newer frame than `other`.
    pub fn is_newer_than(&self, other: &FrameFingerprint, growth: StackGrowth) -> bool
    {
        self.compare_age(other, growth) == Ordering::Less
    }

    /// Whether `self` identifies a strictly older frame than `other`.
    pub fn is_older_than(&self, other: &FrameFingerprint, growth: StackGrowth) -> bool
    {
        self.compare_age(other, growth) == Ordering::Greater
    }
}
