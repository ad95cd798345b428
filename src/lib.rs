//! # relaystream
//!
//! Pull-based byte streams over foreign input sources.
//!
//! A foreign source is reachable only through a call boundary: bounded
//! reads, an advisory skip, and optionally mark/reset. Every call can fault
//! on its own, independently of the stream's logical state. This crate
//! adapts such a source into a plain forward-only stream that native code
//! can read without knowing where the bytes come from.
//!
//! ## Features
//!
//! - One-time capability binding per [`AdapterFactory`], cached on success
//!   and on failure
//! - [`StreamAdapter`] copies through a fixed, reused relay buffer and turns
//!   boundary faults into short reads instead of errors
//! - Skips fall back to one-byte reads when the native skip stalls
//! - [`RewindableStream`] exists only when the source type binds reset
//! - An in-process host runtime with file, stdin and HTTP Range sources
//!
//! ## Example
//!
//! ```
//! use std::io::Cursor;
//! use relaystream::{AdapterFactory, HostRuntime, SequentialSource};
//!
//! let factory = AdapterFactory::new(HostRuntime::new());
//! let source = SequentialSource::new(Cursor::new(b"0123456789".to_vec()));
//! let mut adapter = factory.create(source)?;
//!
//! let mut buf = [0u8; 1024];
//! assert_eq!(adapter.read(&mut buf), 10);
//! assert_eq!(adapter.read(&mut buf), 0);
//! assert!(adapter.is_at_end());
//! # Ok::<(), relaystream::AdapterError>(())
//! ```

pub mod adapter;
pub mod boundary;
pub mod capability;
pub mod cli;
pub mod error;
pub mod host;
pub mod io;
pub mod relay;
pub mod rewind;

pub use adapter::{ByteStream, StreamAdapter};
pub use boundary::{DEFAULT_SOURCE_TYPE, ForeignSource, MethodId, Operation, TypeRef, TypeResolver};
pub use capability::{
    AdapterConfig, AdapterFactory, CapabilitySet, DEFAULT_RELAY_CAPACITY, bind_capabilities,
};
pub use cli::Cli;
pub use error::{AdapterError, BindError, BoundaryFault, MarkError};
pub use host::{HostRuntime, RangeSource, SequentialSource};
pub use io::{HttpRangeReader, LocalFileReader, MemoryReader, ReadAt};
pub use relay::{RelayOptions, RelaySummary, relay};
pub use rewind::RewindableStream;
