//! Symbol model consumed by stack reconstruction.
//!
//! These are value types produced by the symbolizer (behind
//! [`StackDelegate`](crate::delegate::StackDelegate)) and treated as opaque
//! once constructed. The stack core never parses DWARF itself; it only walks
//! the inline chain a [`Function`] already carries.

use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::types::Address;

/// A file name plus 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileLine
{
    file: String,
    line: u32,
}

impl FileLine
{
    /// Construct from a file path and 1-based line number.
    pub fn new(file: impl Into<String>, line: u32) -> Self
    {
        Self {
            file: file.into(),
            line,
        }
    }

    /// File path as recorded by the symbolizer.
    pub fn file(&self) -> &str
    {
        &self.file
    }

    /// 1-based line number.
    pub fn line(&self) -> u32
    {
        self.line
    }
}

impl fmt::Display for FileLine
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Half-open `[begin, end)` range of code addresses covered by a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeRange
{
    /// First covered address.
    pub begin: Address,
    /// One past the last covered address.
    pub end: Address,
}

impl CodeRange
{
    /// Construct a half-open range.
    pub const fn new(begin: Address, end: Address) -> Self
    {
        Self { begin, end }
    }

    /// Whether `address` falls inside this range.
    pub fn contains(&self, address: Address) -> bool
    {
        self.begin <= address && address < self.end
    }
}

/// A function (concrete or inlined instance) known to the symbolizer.
///
/// Inlined instances additionally record the file/line in the *enclosing*
/// function from which they were called, and link to that enclosing function
/// via [`parent`](Function::parent). Non-inline functions have no call site.
#[derive(Debug)]
pub struct Function
{
    name: String,
    is_inline: bool,
    code_ranges: Vec<CodeRange>,
    call_site: Option<FileLine>,
    parent: Option<Rc<Function>>,
}

impl Function
{
    /// Construct a concrete (non-inline) function.
    pub fn new_physical(name: impl Into<String>, code_ranges: Vec<CodeRange>) -> Rc<Self>
    {
        Rc::new(Self {
            name: name.into(),
            is_inline: false,
            code_ranges,
            call_site: None,
            parent: None,
        })
    }

    /// Construct an inlined instance called from `call_site` inside `parent`.
    pub fn new_inline(
        name: impl Into<String>,
        code_ranges: Vec<CodeRange>,
        call_site: FileLine,
        parent: Rc<Function>,
    ) -> Rc<Self>
    {
        Rc::new(Self {
            name: name.into(),
            is_inline: true,
            code_ranges,
            call_site: Some(call_site),
            parent: Some(parent),
        })
    }

    /// Construct an inlined instance whose enclosing function is unknown.
    ///
    /// Symbol data like this is corrupt (an inline instance must live inside
    /// something), but real symbol files do produce it and the stack core has
    /// to cope. See [`Stack::set_frames`](crate::stack::Stack::set_frames).
    pub fn new_orphan_inline(name: impl Into<String>, code_ranges: Vec<CodeRange>) -> Rc<Self>
    {
        Rc::new(Self {
            name: name.into(),
            is_inline: true,
            code_ranges,
            call_site: None,
            parent: None,
        })
    }

    /// Function name as reported by the symbolizer (already demangled).
    pub fn name(&self) -> &str
    {
        &self.name
    }

    /// Whether this is an inlined instance rather than a concrete function.
    pub fn is_inline(&self) -> bool
    {
        self.is_inline
    }

    /// Code address ranges covered by this function.
    pub fn code_ranges(&self) -> &[CodeRange]
    {
        &self.code_ranges
    }

    /// Whether any code range covers `address`.
    pub fn covers(&self, address: Address) -> bool
    {
        self.code_ranges.iter().any(|range| range.contains(address))
    }

    /// File/line of the call in the enclosing function (inline instances only).
    pub fn call_site(&self) -> Option<&FileLine>
    {
        self.call_site.as_ref()
    }

    /// Enclosing function, if known.
    pub fn parent(&self) -> Option<&Rc<Function>>
    {
        self.parent.as_ref()
    }

    /// Inline chain for this function, innermost first.
    ///
    /// Walks parent links until the first non-inline function, which becomes
    /// the last chain entry. For a non-inline function the chain is just the
    /// function itself. If an inline instance has no parent, the chain ends
    /// with it still flagged inline; callers must treat that as corrupt data.
    pub fn inline_chain(self: &Rc<Self>) -> SmallVec<[Rc<Function>; 4]>
    {
        let mut chain: SmallVec<[Rc<Function>; 4]> = SmallVec::new();
        chain.push(Rc::clone(self));
        while chain[chain.len() - 1].is_inline {
            match chain[chain.len() - 1].parent.clone() {
                Some(parent) => chain.push(parent),
                None => break,
            }
        }
        chain
    }
}

/// Symbolized source location for one code address.
///
/// Bundles what the symbolizer knows about an address: the address itself,
/// the best file/line, a column when the line table has one, and the
/// innermost [`Function`] covering the address. Any of the symbolic parts
/// may be absent; an address-only location is still valid and displayable.
#[derive(Debug, Clone)]
pub struct Location
{
    address: Address,
    file_line: Option<FileLine>,
    column: u32,
    function: Option<Rc<Function>>,
}

impl Location
{
    /// Construct a fully symbolized location.
    pub fn new(address: Address, file_line: Option<FileLine>, column: u32, function: Option<Rc<Function>>) -> Self
    {
        Self {
            address,
            file_line,
            column,
            function,
        }
    }

    /// Construct a location with no symbol information at all.
    pub fn address_only(address: Address) -> Self
    {
        Self {
            address,
            file_line: None,
            column: 0,
            function: None,
        }
    }

    /// Code address this location describes.
    pub fn address(&self) -> Address
    {
        self.address
    }

    /// Best known file/line, if the line table resolved one.
    pub fn file_line(&self) -> Option<&FileLine>
    {
        self.file_line.as_ref()
    }

    /// Column within the line, 0 when unknown.
    pub fn column(&self) -> u32
    {
        self.column
    }

    /// Innermost function covering the address, if any.
    pub fn function(&self) -> Option<&Rc<Function>>
    {
        self.function.as_ref()
    }
}

impl fmt::Display for Location
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match (&self.function, &self.file_line) {
            (Some(function), Some(file_line)) => {
                write!(f, "{} at {} ({})", function.name(), file_line, self.address)
            }
            (Some(function), None) => write!(f, "{} ({})", function.name(), self.address),
            (None, Some(file_line)) => write!(f, "{} ({})", file_line, self.address),
            (None, None) => write!(f, "{}", self.address),
        }
    }
}
