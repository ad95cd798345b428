//! The foreign call boundary.
//!
//! A byte source lives on the other side of a call boundary that is reached
//! through resolved method handles. Resolution goes through a
//! [`TypeResolver`], and calls go through a [`ForeignSource`] handle. Every
//! call can fault independently of the logical stream state.

use std::fmt;

use crate::error::BoundaryFault;

/// Declared type name the adapter binds against unless configured otherwise.
pub const DEFAULT_SOURCE_TYPE: &str = "java/io/InputStream";

/// Operations an input source type may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Read,
    Skip,
    Reset,
    Mark,
    MarkSupported,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Read,
        Operation::Skip,
        Operation::Reset,
        Operation::Mark,
        Operation::MarkSupported,
    ];

    /// Method name on the foreign side.
    pub fn name(self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Skip => "skip",
            Operation::Reset => "reset",
            Operation::Mark => "mark",
            Operation::MarkSupported => "markSupported",
        }
    }

    /// Method signature on the foreign side.
    pub fn signature(self) -> &'static str {
        match self {
            Operation::Read => "([BII)I",
            Operation::Skip => "(J)J",
            Operation::Reset => "()V",
            Operation::Mark => "(I)V",
            Operation::MarkSupported => "()Z",
        }
    }

    pub fn is_required(self) -> bool {
        self == Operation::Read
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name(), self.signature())
    }
}

/// A resolved foreign type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    name: String,
    slot: u32,
}

impl TypeRef {
    pub fn new(name: impl Into<String>, slot: u32) -> Self {
        Self {
            name: name.into(),
            slot,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolver-defined identity of the type.
    pub fn slot(&self) -> u32 {
        self.slot
    }
}

/// A resolved foreign method.
///
/// Holding one proves that `operation` was bound on the declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId {
    operation: Operation,
    slot: u32,
}

impl MethodId {
    pub fn new(operation: Operation, slot: u32) -> Self {
        Self { operation, slot }
    }

    pub fn operation(self) -> Operation {
        self.operation
    }

    pub fn slot(self) -> u32 {
        self.slot
    }
}

/// Looks up foreign types and their methods.
pub trait TypeResolver {
    fn resolve_type(&self, name: &str) -> Option<TypeRef>;

    fn resolve_method(&self, ty: &TypeRef, name: &str, signature: &str) -> Option<MethodId>;
}

impl<T: TypeResolver + ?Sized> TypeResolver for &T {
    fn resolve_type(&self, name: &str) -> Option<TypeRef> {
        (**self).resolve_type(name)
    }

    fn resolve_method(&self, ty: &TypeRef, name: &str, signature: &str) -> Option<MethodId> {
        (**self).resolve_method(ty, name, signature)
    }
}

/// Handle to a byte source on the far side of the boundary.
///
/// The raw contract mirrors the source's own:
/// - `call_read` fills `dest[offset..offset + count]` and returns the number
///   of bytes written (at least 1), or a negative value at end of data. A
///   successful call never returns 0.
/// - `call_skip` returns how many bytes were skipped. 0 does not mean end of
///   data.
/// - `call_reset` returns to the last mark, or to the origin if unmarked.
///
/// A faulted call leaves the fault pending until [`clear_fault`] is called.
///
/// [`clear_fault`]: ForeignSource::clear_fault
pub trait ForeignSource {
    fn call_read(
        &mut self,
        method: MethodId,
        dest: &mut [u8],
        offset: usize,
        count: usize,
    ) -> Result<i32, BoundaryFault>;

    fn call_skip(&mut self, method: MethodId, count: i64) -> Result<i64, BoundaryFault>;

    fn call_reset(&mut self, method: MethodId) -> Result<(), BoundaryFault>;

    fn call_mark(&mut self, method: MethodId, read_limit: i32) -> Result<(), BoundaryFault>;

    fn call_mark_supported(&mut self, method: MethodId) -> Result<bool, BoundaryFault>;

    /// Acknowledges the pending fault so later calls start clean.
    fn clear_fault(&mut self) {}
}

impl<S: ForeignSource + ?Sized> ForeignSource for &mut S {
    fn call_read(
        &mut self,
        method: MethodId,
        dest: &mut [u8],
        offset: usize,
        count: usize,
    ) -> Result<i32, BoundaryFault> {
        (**self).call_read(method, dest, offset, count)
    }

    fn call_skip(&mut self, method: MethodId, count: i64) -> Result<i64, BoundaryFault> {
        (**self).call_skip(method, count)
    }

    fn call_reset(&mut self, method: MethodId) -> Result<(), BoundaryFault> {
        (**self).call_reset(method)
    }

    fn call_mark(&mut self, method: MethodId, read_limit: i32) -> Result<(), BoundaryFault> {
        (**self).call_mark(method, read_limit)
    }

    fn call_mark_supported(&mut self, method: MethodId) -> Result<bool, BoundaryFault> {
        (**self).call_mark_supported(method)
    }

    fn clear_fault(&mut self) {
        (**self).clear_fault()
    }
}

impl<S: ForeignSource + ?Sized> ForeignSource for Box<S> {
    fn call_read(
        &mut self,
        method: MethodId,
        dest: &mut [u8],
        offset: usize,
        count: usize,
    ) -> Result<i32, BoundaryFault> {
        (**self).call_read(method, dest, offset, count)
    }

    fn call_skip(&mut self, method: MethodId, count: i64) -> Result<i64, BoundaryFault> {
        (**self).call_skip(method, count)
    }

    fn call_reset(&mut self, method: MethodId) -> Result<(), BoundaryFault> {
        (**self).call_reset(method)
    }

    fn call_mark(&mut self, method: MethodId, read_limit: i32) -> Result<(), BoundaryFault> {
        (**self).call_mark(method, read_limit)
    }

    fn call_mark_supported(&mut self, method: MethodId) -> Result<bool, BoundaryFault> {
        (**self).call_mark_supported(method)
    }

    fn clear_fault(&mut self) {
        (**self).clear_fault()
    }
}
