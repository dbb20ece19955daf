//! Thread identity.

/// Identifier for a thread in the debugged target
///
/// A `Stack` is owned by exactly one target thread; frames carry this id as a
/// non-owning back-reference so consumers can tell which thread a frame came
/// from without holding the thread object itself. The raw value is whatever
/// the agent or core-dump reader reports (Zircon koid, Linux TID, etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadId(pub u64);

impl ThreadId
{
    /// Get the raw `u64` representation of the thread identifier
    pub fn raw(&self) -> u64
    {
        self.0
    }
}

impl From<u64> for ThreadId
{
    fn from(value: u64) -> Self
    {
        Self(value)
    }
}
