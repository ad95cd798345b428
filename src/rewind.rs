//! Restartable view of a [`StreamAdapter`].
//!
//! Rewinding is only available when the declared source type binds a reset
//! operation. The [`RewindableStream`] can only be built in that case, so
//! callers holding a plain adapter have no way to request a rewind:
//!
//! ```compile_fail
//! use std::io::Cursor;
//! use relaystream::{AdapterFactory, HostRuntime, SequentialSource};
//!
//! let factory = AdapterFactory::new(HostRuntime::new());
//! let source = SequentialSource::new(Cursor::new(Vec::new()));
//! let mut adapter = factory.create(source).unwrap();
//! adapter.rewind();
//! ```

use log::{debug, warn};

use crate::adapter::{ByteStream, StreamAdapter};
use crate::boundary::{ForeignSource, MethodId};
use crate::error::{BoundaryFault, MarkError};

/// A [`StreamAdapter`] that can be rewound to the source's mark or origin.
pub struct RewindableStream<'c, S> {
    inner: StreamAdapter<'c, S>,
    reset: MethodId,
}

impl<'c, S: ForeignSource> RewindableStream<'c, S> {
    /// Wraps `adapter` if its capabilities include reset.
    ///
    /// Hands the adapter back unchanged when they don't.
    pub fn new(adapter: StreamAdapter<'c, S>) -> Result<Self, StreamAdapter<'c, S>> {
        match adapter.capabilities().reset() {
            Some(reset) => Ok(Self {
                inner: adapter,
                reset,
            }),
            None => Err(adapter),
        }
    }

    /// Rewinds the source and clears the consumed count and end flag.
    ///
    /// On a fault the adapter state is left exactly as it was.
    pub fn rewind(&mut self) -> Result<(), BoundaryFault> {
        let consumed = self.inner.bytes_consumed();
        match self.inner.source_mut().call_reset(self.reset) {
            Ok(()) => {
                debug!("rewound after {} bytes", consumed);
                self.inner.restart();
                Ok(())
            }
            Err(fault) => {
                warn!("rewind failed: {}", fault);
                self.inner.source_mut().clear_fault();
                Err(fault)
            }
        }
    }

    /// Bytes consumed since construction or the last successful rewind.
    pub fn bytes_consumed(&self) -> u64 {
        self.inner.bytes_consumed()
    }

    /// Asks the source whether it honours marks.
    ///
    /// False when the query is unbound or faults.
    pub fn mark_supported(&mut self) -> bool {
        let Some(method) = self.inner.capabilities().mark_supported() else {
            return false;
        };
        match self.inner.source_mut().call_mark_supported(method) {
            Ok(supported) => supported,
            Err(fault) => {
                self.inner.absorb(fault);
                false
            }
        }
    }

    /// Sets the position a later [`rewind`](Self::rewind) returns to.
    pub fn mark(&mut self, read_limit: u32) -> Result<(), MarkError> {
        let method = self.inner.capabilities().mark().ok_or(MarkError::Unbound)?;
        let limit = read_limit.min(i32::MAX as u32) as i32;
        match self.inner.source_mut().call_mark(method, limit) {
            Ok(()) => Ok(()),
            Err(fault) => {
                self.inner.source_mut().clear_fault();
                Err(MarkError::Fault(fault))
            }
        }
    }

    pub fn adapter(&self) -> &StreamAdapter<'c, S> {
        &self.inner
    }

    /// Gives up the rewind capability and returns the plain adapter.
    pub fn into_inner(self) -> StreamAdapter<'c, S> {
        self.inner
    }
}

impl<S: ForeignSource> ByteStream for RewindableStream<'_, S> {
    fn read(&mut self, dest: &mut [u8]) -> usize {
        self.inner.read(dest)
    }

    fn skip(&mut self, count: u64) -> u64 {
        self.inner.skip(count)
    }

    fn is_at_end(&self) -> bool {
        self.inner.is_at_end()
    }

    fn is_buffer_based(&self) -> bool {
        self.inner.is_buffer_based()
    }

    fn is_seekable(&self) -> bool {
        self.inner.is_seekable()
    }
}

impl<S: ForeignSource> std::io::Read for RewindableStream<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        std::io::Read::read(&mut self.inner, buf)
    }
}
