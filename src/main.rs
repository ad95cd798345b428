//! Main entry point for the relaycat CLI application.
//!
//! Opens the requested source, wraps it in a stream adapter and copies it to
//! stdout. The adapter is synchronous, so the copy runs on a blocking thread
//! while remote reads are driven by the tokio runtime.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Handle;

use relaystream::{
    AdapterFactory, Cli, ForeignSource, HttpRangeReader, LocalFileReader, RangeSource,
    RelaySummary, SequentialSource, relay,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .init();

    let summary = if cli.is_http_url() {
        let reader = Arc::new(HttpRangeReader::new(cli.source.clone()).await?);
        let source = RangeSource::new(reader.clone(), Handle::current());
        let summary = run_blocking(source, &cli).await?;

        if !cli.is_quiet() {
            eprintln!(
                "Total bytes transferred: {}",
                format_size(reader.transferred_bytes())
            );
        }
        summary
    } else if cli.is_stdin() {
        run_blocking(SequentialSource::new(std::io::stdin()), &cli).await?
    } else {
        let reader = Arc::new(LocalFileReader::new(Path::new(&cli.source))?);
        run_blocking(RangeSource::new(reader, Handle::current()), &cli).await?
    };

    if cli.stats {
        eprintln!(
            "passes: {}  skipped: {}  written: {}  consumed: {}  at end: {}",
            summary.passes,
            summary.skipped,
            format_size(summary.written),
            summary.bytes_consumed,
            summary.at_end
        );
    }

    Ok(())
}

/// Relay `source` to stdout on the blocking pool.
async fn run_blocking<S>(source: S, cli: &Cli) -> Result<RelaySummary>
where
    S: ForeignSource + Send + 'static,
{
    let cli = cli.clone();
    tokio::task::spawn_blocking(move || {
        let factory = AdapterFactory::with_config(cli.host_runtime(), cli.adapter_config());
        let mut stdout = std::io::stdout().lock();
        relay(&factory, source, &cli.relay_options(), &mut stdout)
    })
    .await
    .context("relay task panicked")?
}

/// Format a byte size into a human-readable string.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
