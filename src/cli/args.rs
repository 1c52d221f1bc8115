//! Command-line argument definitions.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use pcapstream_core::{DispatchConfig, UnknownLayerPolicy};

use super::OutputFormat;

/// Replay a packet capture through TCP stream and UDP flow reassembly.
#[derive(Parser, Debug)]
#[command(name = "pcapstream")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Capture file to replay (pcap or pcapng, optionally gzip-compressed)
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Capture live from a network interface instead of a file
    #[cfg(feature = "libpcap")]
    #[arg(short = 'i', long = "interface", value_name = "DEVICE", conflicts_with = "file")]
    pub interface: Option<String>,

    /// Stop a live capture after this many frames
    #[cfg(feature = "libpcap")]
    #[arg(short = 'c', long = "count", value_name = "FRAMES")]
    pub count: Option<usize>,

    /// BPF filter expression
    #[arg(short = 'F', long = "filter", value_name = "EXPR")]
    pub filter: Option<String>,

    /// Pass TCP packets through instead of reassembling streams
    #[arg(long = "no-stream")]
    pub no_stream: bool,

    /// Pass UDP packets through instead of grouping them by flow
    #[arg(long = "no-datagram")]
    pub no_datagram: bool,

    /// Report packets with undecoded layers as errors instead of dropping them
    #[arg(long = "report-unknown")]
    pub report_unknown: bool,

    /// Seconds of inactivity before a TCP connection is evicted
    #[arg(long = "stream-idle-timeout", value_name = "SECS", default_value = "300")]
    pub stream_idle_timeout: u64,

    /// Seconds of inactivity before a UDP flow is evicted
    #[arg(long = "datagram-idle-timeout", value_name = "SECS", default_value = "30")]
    pub datagram_idle_timeout: u64,

    /// Datagrams per released UDP group
    #[arg(long = "max-group-len", value_name = "N", default_value = "32")]
    pub max_group_len: usize,

    /// Also print every packet that is not reassembled
    #[arg(short = 'p', long = "packets")]
    pub show_packets: bool,

    /// Output format for stdout
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Build the dispatcher configuration from the flags.
    pub fn dispatch_config(&self) -> DispatchConfig {
        let mut config = DispatchConfig {
            stream_reassembly: !self.no_stream,
            datagram_reassembly: !self.no_datagram,
            unknown_layer: if self.report_unknown {
                UnknownLayerPolicy::Report
            } else {
                UnknownLayerPolicy::Discard
            },
            ..DispatchConfig::default()
        };

        let stream_idle = Duration::from_secs(self.stream_idle_timeout);
        config.stream.idle_timeout = stream_idle;
        config.stream.sweep_interval = Some(stream_idle);

        let datagram_idle = Duration::from_secs(self.datagram_idle_timeout);
        config.datagram.idle_timeout = datagram_idle;
        config.datagram.sweep_interval = Some(datagram_idle);
        config.datagram.max_group_len = self.max_group_len.max(1);
        config
    }

    /// Default log level for the number of `-v` flags.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
