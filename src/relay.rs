//! Copying a foreign source to a writer through an adapter.
//!
//! This is what `relaycat` runs on its blocking thread. It is kept in the
//! library so it can be driven against in-memory writers.

use std::io::{self, Read, Write};

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use log::{info, warn};

use crate::adapter::ByteStream;
use crate::boundary::{ForeignSource, TypeResolver};
use crate::capability::AdapterFactory;

/// What a relay run should do with the stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayOptions {
    /// Bytes to skip before copying.
    pub skip: u64,
    /// Maximum bytes to write per pass.
    pub limit: Option<u64>,
    /// Rewind once after the first pass and copy again.
    pub replay: bool,
    /// Decode the stream as gzip before writing.
    pub gunzip: bool,
}

/// Counters from a finished relay run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelaySummary {
    pub passes: u32,
    pub skipped: u64,
    pub written: u64,
    /// Adapter count after the final pass.
    pub bytes_consumed: u64,
    pub at_end: bool,
}

/// Copies `source` to `out` according to `options`.
pub fn relay<R, S, W>(
    factory: &AdapterFactory<R>,
    source: S,
    options: &RelayOptions,
    out: &mut W,
) -> Result<RelaySummary>
where
    R: TypeResolver,
    S: ForeignSource,
    W: Write,
{
    let mut summary = RelaySummary::default();

    if options.replay {
        let mut stream = factory.create_rewindable(source)?;
        copy_pass(&mut stream, options, out, &mut summary)?;
        stream.rewind().context("cannot replay source")?;
        copy_pass(&mut stream, options, out, &mut summary)?;
        summary.bytes_consumed = stream.bytes_consumed();
        summary.at_end = stream.is_at_end();
    } else {
        let mut adapter = factory.create(source)?;
        copy_pass(&mut adapter, options, out, &mut summary)?;
        summary.bytes_consumed = adapter.bytes_consumed();
        summary.at_end = adapter.is_at_end();
    }

    out.flush()?;
    Ok(summary)
}

fn copy_pass<B, W>(
    stream: &mut B,
    options: &RelayOptions,
    out: &mut W,
    summary: &mut RelaySummary,
) -> Result<()>
where
    B: ByteStream + Read,
    W: Write,
{
    summary.passes += 1;

    let skipped = stream.skip(options.skip);
    if skipped < options.skip {
        if stream.is_at_end() {
            warn!(
                "source ended after skipping {} of {} bytes",
                skipped, options.skip
            );
        } else {
            warn!(
                "skip stopped by a source fault after {} of {} bytes",
                skipped, options.skip
            );
        }
    }
    summary.skipped += skipped;

    let limit = options.limit.unwrap_or(u64::MAX);
    let written = if options.gunzip {
        let mut decoder = GzDecoder::new(&mut *stream).take(limit);
        io::copy(&mut decoder, out).context("gzip decoding failed")?
    } else {
        let mut limited = Read::take(&mut *stream, limit);
        io::copy(&mut limited, out).context("relay interrupted by a source fault")?
    };
    summary.written += written;

    info!("pass {}: skipped {}, wrote {}", summary.passes, skipped, written);
    Ok(())
}
