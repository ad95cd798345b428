//! In-process foreign runtime.
//!
//! [`HostRuntime`] plays the resolver role with a table of declared types,
//! and the sources in this module play the source handles. They follow the
//! foreign contract exactly: reads return -1 at end of data, skips may stall,
//! and a fault stays pending until it is cleared. While a fault is pending
//! every further call fails with it.

mod range;
mod sequential;

pub use range::RangeSource;
pub use sequential::SequentialSource;

use crate::boundary::{DEFAULT_SOURCE_TYPE, MethodId, Operation, TypeRef, TypeResolver};
use crate::error::BoundaryFault;

/// Declared types and the operations each one provides.
#[derive(Debug, Clone)]
pub struct HostRuntime {
    types: Vec<(String, Vec<Operation>)>,
}

impl HostRuntime {
    /// The default source type with every operation declared.
    pub fn new() -> Self {
        Self::empty().declare(DEFAULT_SOURCE_TYPE, &Operation::ALL)
    }

    /// The default source type with only `read` declared.
    pub fn read_only() -> Self {
        Self::empty().declare(DEFAULT_SOURCE_TYPE, &[Operation::Read])
    }

    pub fn empty() -> Self {
        Self { types: Vec::new() }
    }

    /// Declares `name` with `operations`, replacing any earlier declaration.
    pub fn declare(mut self, name: &str, operations: &[Operation]) -> Self {
        self.types.retain(|(declared, _)| declared != name);
        self.types.push((name.to_string(), operations.to_vec()));
        self
    }
}

impl Default for HostRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeResolver for HostRuntime {
    fn resolve_type(&self, name: &str) -> Option<TypeRef> {
        self.types
            .iter()
            .position(|(declared, _)| declared == name)
            .map(|slot| TypeRef::new(name, slot as u32))
    }

    fn resolve_method(&self, ty: &TypeRef, name: &str, signature: &str) -> Option<MethodId> {
        let (_, operations) = self.types.get(ty.slot() as usize)?;
        operations
            .iter()
            .find(|op| op.name() == name && op.signature() == signature)
            .map(|op| MethodId::new(*op, ty.slot()))
    }
}

/// The fault a host source is holding until it is acknowledged.
#[derive(Debug, Default)]
struct PendingFault(Option<BoundaryFault>);

impl PendingFault {
    /// Fails with the pending fault, if there is one.
    fn check(&self) -> Result<(), BoundaryFault> {
        match &self.0 {
            Some(fault) => Err(fault.clone()),
            None => Ok(()),
        }
    }

    fn raise(&mut self, operation: &'static str, message: impl Into<String>) -> BoundaryFault {
        let fault = BoundaryFault::new(operation, message);
        self.0 = Some(fault.clone());
        fault
    }

    fn get(&self) -> Option<&BoundaryFault> {
        self.0.as_ref()
    }

    fn clear(&mut self) {
        self.0 = None;
    }
}

/// Validates a foreign read window against the destination.
fn read_window(
    faults: &mut PendingFault,
    len: usize,
    offset: usize,
    count: usize,
) -> Result<std::ops::Range<usize>, BoundaryFault> {
    match offset.checked_add(count) {
        Some(end) if end <= len && count <= i32::MAX as usize => Ok(offset..end),
        _ => Err(faults.raise(
            "read",
            format!("window {}+{} out of bounds for length {}", offset, count, len),
        )),
    }
}
