use clap::Parser;
use log::LevelFilter;

use crate::boundary::DEFAULT_SOURCE_TYPE;
use crate::capability::{AdapterConfig, DEFAULT_RELAY_CAPACITY};
use crate::host::HostRuntime;
use crate::relay::RelayOptions;

/// Relay capacity for HTTP sources when `-b` is not given.
///
/// Every relay fill is one ranged GET, so small buffers mean many requests.
pub const REMOTE_RELAY_CAPACITY: usize = 64 * 1024;

#[derive(Parser, Debug, Clone)]
#[command(name = "relaycat")]
#[command(version)]
#[command(about = "Copy a byte source to stdout through a relay-buffered stream adapter", long_about = None)]
#[command(after_help = "Examples:\n  \
  relaycat -s 512 -n 64 data.bin          print 64 bytes starting at offset 512\n  \
  cat log.gz | relaycat -z -              decode gzip from stdin\n  \
  relaycat --replay https://example.com/a.txt   print a remote file twice")]
pub struct Cli {
    /// File path, `-` for stdin, or HTTP(S) URL
    #[arg(value_name = "SOURCE")]
    pub source: String,

    /// Relay buffer capacity in bytes (default 1024, or 65536 for HTTP(S)
    /// sources, where each relay fill is one ranged request)
    #[arg(short = 'b', long = "buffer-size", value_name = "BYTES")]
    pub buffer_size: Option<usize>,

    /// Skip this many bytes before copying
    #[arg(short = 's', long, value_name = "BYTES", default_value_t = 0)]
    pub skip: u64,

    /// Copy at most this many bytes per pass
    #[arg(short = 'n', long, value_name = "BYTES")]
    pub limit: Option<u64>,

    /// Rewind after the first pass and copy again (needs a resettable source)
    #[arg(long)]
    pub replay: bool,

    /// Bind against a source type that only declares `read`
    #[arg(long)]
    pub no_native_skip: bool,

    /// Decode the stream as gzip
    #[arg(short = 'z', long)]
    pub gunzip: bool,

    /// Print adapter counters to stderr when done
    #[arg(long)]
    pub stats: bool,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,

    /// Verbose logging (-vv => debug, -vvv => trace)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.source.starts_with("http://") || self.source.starts_with("https://")
    }

    pub fn is_stdin(&self) -> bool {
        self.source == "-"
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0
    }

    /// Log level before any `RUST_LOG` override.
    pub fn log_level(&self) -> LevelFilter {
        match (self.quiet, self.verbose) {
            (0, 0) => LevelFilter::Warn,
            (0, 1) => LevelFilter::Info,
            (0, 2) => LevelFilter::Debug,
            (0, _) => LevelFilter::Trace,
            (1, _) => LevelFilter::Error,
            _ => LevelFilter::Off,
        }
    }

    pub fn host_runtime(&self) -> HostRuntime {
        if self.no_native_skip {
            HostRuntime::read_only()
        } else {
            HostRuntime::new()
        }
    }

    /// Relay capacity from `-b`, or a default suited to the source kind.
    pub fn relay_capacity(&self) -> usize {
        match self.buffer_size {
            Some(size) => size,
            None if self.is_http_url() => REMOTE_RELAY_CAPACITY,
            None => DEFAULT_RELAY_CAPACITY,
        }
    }

    pub fn adapter_config(&self) -> AdapterConfig {
        AdapterConfig {
            relay_capacity: self.relay_capacity(),
            source_type: DEFAULT_SOURCE_TYPE.to_string(),
        }
    }

    pub fn relay_options(&self) -> RelayOptions {
        RelayOptions {
            skip: self.skip,
            limit: self.limit,
            replay: self.replay,
            gunzip: self.gunzip,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::boundary::Operation;
    use crate::capability::bind_capabilities;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("relaycat").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults() {
        let cli = parse(&["data.bin"]);
        assert_eq!(cli.buffer_size, None);
        assert_eq!(cli.adapter_config().relay_capacity, DEFAULT_RELAY_CAPACITY);
        assert_eq!(cli.relay_options(), RelayOptions::default());
        assert!(!cli.is_http_url());
        assert!(!cli.is_stdin());
    }

    #[test]
    fn parses_relay_options() {
        let cli = parse(&["-s", "10", "-n", "5", "--replay", "-z", "-b", "64", "-"]);
        assert!(cli.is_stdin());
        assert_eq!(cli.adapter_config().relay_capacity, 64);
        assert_eq!(
            cli.relay_options(),
            RelayOptions {
                skip: 10,
                limit: Some(5),
                replay: true,
                gunzip: true,
            }
        );
    }

    #[rstest]
    #[case(&["https://example.com/a"], REMOTE_RELAY_CAPACITY)]
    #[case(&["-b", "4096", "http://example.com/a"], 4096)]
    #[case(&["-"], DEFAULT_RELAY_CAPACITY)]
    #[case(&["-b", "16", "data.bin"], 16)]
    fn relay_capacity_follows_source_kind(#[case] args: &[&str], #[case] expected: usize) {
        assert_eq!(parse(args).relay_capacity(), expected);
    }

    #[rstest]
    #[case(&["x"], LevelFilter::Warn)]
    #[case(&["-v", "x"], LevelFilter::Info)]
    #[case(&["-vv", "x"], LevelFilter::Debug)]
    #[case(&["-vvvv", "x"], LevelFilter::Trace)]
    #[case(&["-q", "x"], LevelFilter::Error)]
    #[case(&["-qq", "-v", "x"], LevelFilter::Off)]
    fn log_level_from_flags(#[case] args: &[&str], #[case] expected: LevelFilter) {
        assert_eq!(parse(args).log_level(), expected);
    }

    #[test]
    fn no_native_skip_drops_skip_binding() {
        let cli = parse(&["--no-native-skip", "https://example.com/a"]);
        assert!(cli.is_http_url());
        let caps = bind_capabilities(&cli.host_runtime(), DEFAULT_SOURCE_TYPE).unwrap();
        assert!(!caps.supports(Operation::Skip));
    }
}
