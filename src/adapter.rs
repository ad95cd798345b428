//! Pull-based byte stream over a foreign source.
//!
//! [`StreamAdapter`] copies bytes through a fixed relay buffer that it owns
//! and reuses for every call. The foreign side only ever sees the relay
//! buffer; callers only ever see their own destination slices.

use std::io;

use log::{trace, warn};

use crate::boundary::ForeignSource;
use crate::capability::CapabilitySet;
use crate::error::{AdapterError, BoundaryFault};

/// Native consumer view of a byte stream.
pub trait ByteStream {
    /// Fills as much of `dest` as possible and returns the count placed.
    fn read(&mut self, dest: &mut [u8]) -> usize;

    /// Moves forward by up to `count` bytes and returns the count skipped.
    fn skip(&mut self, count: u64) -> u64;

    fn is_at_end(&self) -> bool;

    /// Whether the stream exposes an underlying memory buffer directly.
    fn is_buffer_based(&self) -> bool;

    /// Whether [`seek`](ByteStream::seek) can move to arbitrary offsets.
    fn is_seekable(&self) -> bool;

    /// Moves to `offset`; returns the new position, or `None` if unsupported.
    fn seek(&mut self, _offset: u64) -> Option<u64> {
        None
    }
}

/// Why a pass over the relay buffer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Filled,
    Exhausted,
    Faulted,
}

/// Adapts a [`ForeignSource`] into a forward-only byte stream.
///
/// The adapter releases the source when dropped but never closes it.
pub struct StreamAdapter<'c, S> {
    source: S,
    caps: &'c CapabilitySet,
    relay: Box<[u8]>,
    bytes_consumed: u64,
    at_end: bool,
    last_fault: Option<BoundaryFault>,
}

impl<'c, S: ForeignSource> StreamAdapter<'c, S> {
    /// Wraps `source` with a relay buffer of `capacity` bytes.
    ///
    /// `capacity` must be in `1..=i32::MAX` so every request fits the
    /// foreign read signature.
    pub fn new(source: S, caps: &'c CapabilitySet, capacity: usize) -> Result<Self, AdapterError> {
        if capacity == 0 || capacity > i32::MAX as usize {
            return Err(AdapterError::InvalidCapacity(capacity));
        }
        Ok(Self {
            source,
            caps,
            relay: vec![0u8; capacity].into_boxed_slice(),
            bytes_consumed: 0,
            at_end: false,
            last_fault: None,
        })
    }

    /// Fills `dest` from the source and returns how many bytes were placed.
    ///
    /// Stops early at end of data or when a boundary fault is absorbed. An
    /// empty `dest` returns 0 without touching the source.
    pub fn read(&mut self, dest: &mut [u8]) -> usize {
        self.last_fault = None;
        if dest.is_empty() {
            return 0;
        }
        self.pull(dest).0
    }

    /// Skips up to `count` bytes and returns how many were skipped.
    ///
    /// The native skip is advisory: a 0 result is followed by a one-byte read,
    /// which either makes progress or confirms end of data. Without a bound
    /// skip operation every byte is read and discarded that way.
    pub fn skip(&mut self, count: u64) -> u64 {
        self.last_fault = None;
        if count == 0 {
            return 0;
        }

        let mut skipped = 0u64;
        while skipped < count {
            let remaining = count - skipped;
            let mut amount = self.native_skip(remaining);
            if amount == 0 {
                let mut single = [0u8; 1];
                match self.pull(&mut single) {
                    (1, _) => amount = 1,
                    (_, Stop::Exhausted) => {
                        trace!("single-byte skip read hit end of data after {} bytes", skipped);
                        break;
                    }
                    _ => break,
                }
            }
            skipped += amount;
        }
        skipped
    }

    /// True once the source has reported end of data.
    pub fn is_at_end(&self) -> bool {
        self.at_end
    }

    /// The adapter always copies through its relay buffer.
    pub fn is_buffer_based(&self) -> bool {
        false
    }

    /// The adapter never seeks; only a bound reset can return to the start.
    pub fn is_seekable(&self) -> bool {
        false
    }

    /// Bytes pulled through the relay buffer since construction or the last
    /// successful rewind.
    pub fn bytes_consumed(&self) -> u64 {
        self.bytes_consumed
    }

    pub fn capacity(&self) -> usize {
        self.relay.len()
    }

    pub fn capabilities(&self) -> &'c CapabilitySet {
        self.caps
    }

    /// The fault absorbed by the most recent `read` or `skip`, if any.
    ///
    /// A short count with no fault and [`is_at_end`](Self::is_at_end) unset
    /// cannot happen for `read`; a short count with a fault means the call
    /// stopped at the boundary and nothing has been retried.
    pub fn last_fault(&self) -> Option<&BoundaryFault> {
        self.last_fault.as_ref()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub(crate) fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Releases the source without closing it.
    pub fn into_source(self) -> S {
        self.source
    }

    pub(crate) fn restart(&mut self) {
        self.bytes_consumed = 0;
        self.at_end = false;
        self.last_fault = None;
    }

    /// Acknowledges a fault on the source and records it.
    pub(crate) fn absorb(&mut self, fault: BoundaryFault) {
        warn!("{}", fault);
        self.source.clear_fault();
        self.last_fault = Some(fault);
    }

    fn pull(&mut self, dest: &mut [u8]) -> (usize, Stop) {
        let method = self.caps.read();
        let mut filled = 0;

        while filled < dest.len() {
            let requested = (dest.len() - filled).min(self.relay.len());
            let raw = match self.source.call_read(method, &mut self.relay, 0, requested) {
                Ok(raw) => raw,
                Err(fault) => {
                    self.absorb(fault);
                    return (filled, Stop::Faulted);
                }
            };

            if raw < 0 {
                self.at_end = true;
                return (filled, Stop::Exhausted);
            }
            if raw == 0 {
                // Dead path: a successful foreign read never returns 0.
                self.absorb(BoundaryFault::new("read", "read returned 0 bytes"));
                return (filled, Stop::Faulted);
            }

            let n = raw as usize;
            if n > requested {
                self.absorb(BoundaryFault::new(
                    "read",
                    format!("read returned {} bytes for a request of {}", n, requested),
                ));
                return (filled, Stop::Faulted);
            }

            dest[filled..filled + n].copy_from_slice(&self.relay[..n]);
            filled += n;
            self.bytes_consumed += n as u64;
        }

        (filled, Stop::Filled)
    }

    /// Returns 0 when skip is unbound, stalls, or faults.
    fn native_skip(&mut self, remaining: u64) -> u64 {
        let Some(method) = self.caps.skip() else {
            return 0;
        };
        let request = remaining.min(i64::MAX as u64) as i64;
        match self.source.call_skip(method, request) {
            Ok(skipped) if skipped > 0 => (skipped as u64).min(remaining),
            Ok(_) => 0,
            Err(fault) => {
                self.absorb(fault);
                0
            }
        }
    }
}

impl<S: ForeignSource> ByteStream for StreamAdapter<'_, S> {
    fn read(&mut self, dest: &mut [u8]) -> usize {
        StreamAdapter::read(self, dest)
    }

    fn skip(&mut self, count: u64) -> u64 {
        StreamAdapter::skip(self, count)
    }

    fn is_at_end(&self) -> bool {
        StreamAdapter::is_at_end(self)
    }

    fn is_buffer_based(&self) -> bool {
        StreamAdapter::is_buffer_based(self)
    }

    fn is_seekable(&self) -> bool {
        StreamAdapter::is_seekable(self)
    }
}

/// Empty reads caused by an absorbed fault become errors, so io consumers
/// do not take them for end of file.
impl<S: ForeignSource> io::Read for StreamAdapter<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = StreamAdapter::read(self, buf);
        match &self.last_fault {
            Some(fault) if n == 0 => Err(io::Error::other(fault.clone())),
            _ => Ok(n),
        }
    }
}
