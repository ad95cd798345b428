//! Error types shared across the crate.
//!
//! Only construction-time problems and explicit rewind/mark requests are
//! reported as errors. Faults raised by the foreign boundary while reading or
//! skipping are absorbed by the adapter and show up as short counts.

use thiserror::Error;

/// Failure to resolve the operations of the declared source type.
///
/// Binding happens once per factory; a failure is cached and returned to
/// every later construction attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    #[error("source type not found: {0}")]
    TypeNotFound(String),
    #[error("required method not found: {type_name}.{method}{signature}")]
    MethodNotFound {
        type_name: String,
        method: &'static str,
        signature: &'static str,
    },
}

/// A fault raised by a call across the foreign boundary.
///
/// This is distinct from the negative count a source returns at end of data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{operation} faulted across the foreign boundary: {message}")]
pub struct BoundaryFault {
    operation: &'static str,
    message: String,
}

impl BoundaryFault {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }

    /// Name of the foreign operation that faulted.
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors reported when constructing an adapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("capability binding failed: {0}")]
    Bind(#[from] BindError),
    #[error("relay capacity must be between 1 and 2147483647, got {0}")]
    InvalidCapacity(usize),
    #[error("source type does not bind a reset operation")]
    RewindUnsupported,
}

/// Errors reported by [`RewindableStream::mark`](crate::RewindableStream::mark).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarkError {
    #[error("source type does not bind a mark operation")]
    Unbound,
    #[error(transparent)]
    Fault(#[from] BoundaryFault),
}
