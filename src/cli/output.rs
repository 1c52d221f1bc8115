//! Output formatting for replay results.
//!
//! [`SummaryListener`] writes one record per closed TCP connection and per
//! released datagram group, optionally one per passed-through packet, and
//! a totals block at the end.

use std::io::{self, Write};

use clap::ValueEnum;
use tracing::{debug, info};

use pcapstream_core::stream::ReassemblyStats;
use pcapstream_core::{
    CaptureInfo, DatagramGroup, DispatchStats, Listener, Packet, ParseError, StreamData,
    StreamSummary,
};

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines (default)
    Text,
    /// Comma-separated values
    Csv,
}

const CSV_HEADER: &str = "kind,first_frame,last_frame,flow,reason,packets,bytes,discarded";

/// Counters kept by the listener itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub packets: u64,
    pub errors: u64,
    pub chunks: u64,
    pub streams: u64,
    pub stream_bytes: u64,
    pub groups: u64,
    pub grouped_datagrams: u64,
}

/// Listener that reports what the dispatcher produced.
pub struct SummaryListener<W: Write> {
    writer: W,
    format: OutputFormat,
    show_packets: bool,
    header_written: bool,
    totals: Totals,
    /// First write error; later records are skipped.
    error: Option<io::Error>,
}

impl<W: Write> SummaryListener<W> {
    pub fn new(writer: W, format: OutputFormat, show_packets: bool) -> Self {
        Self {
            writer,
            format,
            show_packets,
            header_written: false,
            totals: Totals::default(),
            error: None,
        }
    }

    pub fn totals(&self) -> Totals {
        self.totals
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    fn record(&mut self, record: Record<'_>) {
        if self.error.is_some() {
            return;
        }
        let result = match self.format {
            OutputFormat::Text => writeln!(self.writer, "{}", record.text()),
            OutputFormat::Csv => {
                let header = if self.header_written {
                    Ok(())
                } else {
                    self.header_written = true;
                    writeln!(self.writer, "{}", CSV_HEADER)
                };
                header.and_then(|()| writeln!(self.writer, "{}", record.csv()))
            }
        };
        if let Err(e) = result {
            self.error = Some(e);
        }
    }

    /// Write the totals block and flush. Returns the first write error.
    pub fn finish(
        &mut self,
        dispatch: &DispatchStats,
        streams: Option<&ReassemblyStats>,
    ) -> io::Result<()> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        if self.format == OutputFormat::Text {
            let w = &mut self.writer;
            writeln!(w)?;
            writeln!(w, "Frames:              {}", dispatch.packets)?;
            writeln!(w, "  passed through:    {}", dispatch.passed_through)?;
            writeln!(w, "  reassembled (tcp): {}", dispatch.streamed)?;
            writeln!(w, "  grouped (udp):     {}", dispatch.datagrams)?;
            writeln!(w, "  unknown dropped:   {}", dispatch.unknown_discarded)?;
            writeln!(w, "  unknown reported:  {}", dispatch.unknown_reported)?;
            writeln!(w, "  malformed:         {}", dispatch.malformed)?;
            writeln!(w, "Connections:         {}", self.totals.streams)?;
            writeln!(w, "  bytes delivered:   {}", self.totals.stream_bytes)?;
            if let Some(stats) = streams {
                let s = &stats.streams;
                writeln!(w, "  duplicates:        {}", s.duplicates)?;
                writeln!(w, "  overlaps trimmed:  {}", s.overlaps_trimmed)?;
                writeln!(w, "  out of order:      {}", s.out_of_order)?;
                writeln!(w, "  bytes discarded:   {}", s.bytes_discarded)?;
                writeln!(w, "  after close:       {}", stats.late_segments)?;
            }
            writeln!(w, "Datagram groups:     {}", self.totals.groups)?;
            writeln!(w, "Pool high water:     {}", dispatch.pool_high_water)?;
        }
        self.writer.flush()
    }
}

/// One output line, before formatting.
struct Record<'a> {
    kind: &'static str,
    first_frame: u64,
    last_frame: u64,
    flow: String,
    reason: &'a str,
    packets: u64,
    bytes: u64,
    discarded: u64,
}

impl Record<'_> {
    fn text(&self) -> String {
        match self.kind {
            "packet" => format!(
                "packet   #{:<6} {} ({} bytes)",
                self.first_frame, self.flow, self.bytes
            ),
            "error" => format!("error    #{:<6} {}: {}", self.first_frame, self.flow, self.reason),
            _ => format!(
                "{:<8} #{}-{} {} [{}] {} packets, {} bytes, {} discarded",
                self.kind,
                self.first_frame,
                self.last_frame,
                self.flow,
                self.reason,
                self.packets,
                self.bytes,
                self.discarded
            ),
        }
    }

    fn csv(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{}",
            self.kind,
            self.first_frame,
            self.last_frame,
            csv_escape(&self.flow),
            csv_escape(self.reason),
            self.packets,
            self.bytes,
            self.discarded
        )
    }
}

fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Layer names joined outermost first, e.g. `ethernet/ipv4/arp`.
fn layer_path(packet: &Packet<'_>) -> String {
    packet
        .layers()
        .iter()
        .map(|layer| layer.kind.as_str())
        .collect::<Vec<_>>()
        .join("/")
}

impl<W: Write> Listener for SummaryListener<W> {
    fn begin_capture(&mut self, info: &CaptureInfo) {
        info!(
            source = %info.source_name,
            link_type = %info.link_type,
            snaplen = info.snaplen,
            "replaying capture"
        );
    }

    fn accept(&mut self, packet: &Packet<'_>) {
        self.totals.packets += 1;
        if self.show_packets {
            self.record(Record {
                kind: "packet",
                first_frame: packet.frame_number(),
                last_frame: packet.frame_number(),
                flow: layer_path(packet),
                reason: "",
                packets: 1,
                bytes: packet.captured_len() as u64,
                discarded: 0,
            });
        }
    }

    fn accept_error(&mut self, packet: &Packet<'_>, error: &ParseError) {
        self.totals.errors += 1;
        let reason = error.to_string();
        self.record(Record {
            kind: "error",
            first_frame: packet.frame_number(),
            last_frame: packet.frame_number(),
            flow: layer_path(packet),
            reason: &reason,
            packets: 1,
            bytes: packet.captured_len() as u64,
            discarded: 0,
        });
    }

    fn accept_stream(&mut self, data: &StreamData<'_>) {
        self.totals.chunks += 1;
        debug!(
            connection = data.connection.id,
            direction = %data.direction,
            offset = data.offset,
            len = data.data.len(),
            "stream data"
        );
    }

    fn stream_closed(&mut self, summary: &StreamSummary<'_>) {
        let conn = summary.connection;
        self.totals.streams += 1;
        self.totals.stream_bytes += summary.bytes_delivered;
        self.record(Record {
            kind: "stream",
            first_frame: conn.first_frame,
            last_frame: conn.last_frame,
            flow: format!("{} -> {}", conn.client, conn.server),
            reason: summary.reason.as_str(),
            packets: conn.packets_to_server + conn.packets_to_client,
            bytes: summary.bytes_delivered,
            discarded: summary.bytes_discarded,
        });
    }

    fn accept_datagrams(&mut self, group: &DatagramGroup<'_>) {
        let (Some(first), Some(last)) = (group.packets.first(), group.packets.last()) else {
            return;
        };
        self.totals.groups += 1;
        self.totals.grouped_datagrams += group.packets.len() as u64;
        let bytes = group.packets.iter().map(|p| p.payload().len() as u64).sum();
        self.record(Record {
            kind: "datagram",
            first_frame: first.frame_number(),
            last_frame: last.frame_number(),
            flow: group.flow.to_string(),
            reason: group.reason.as_str(),
            packets: group.packets.len() as u64,
            bytes,
            discarded: 0,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use etherparse::PacketBuilder;
    use pcapstream_core::{DispatchConfig, Dispatcher, RawFrame, SharedListener, Timestamp};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn tcp(from_client: bool, seq: u32, fin: bool, payload: &[u8]) -> Vec<u8> {
        let (src, dst, sport, dport) = if from_client {
            ([10, 0, 0, 1], [10, 0, 0, 2], 40000, 80)
        } else {
            ([10, 0, 0, 2], [10, 0, 0, 1], 80, 40000)
        };
        let mut builder = PacketBuilder::ethernet2([1; 6], [2; 6])
            .ipv4(src, dst, 64)
            .tcp(sport, dport, seq, 1024)
            .ack(1);
        if fin {
            builder = builder.fin();
        }
        let mut out = Vec::new();
        builder.write(&mut out, payload).unwrap();
        out
    }

    fn udp(payload: &[u8]) -> Vec<u8> {
        let builder = PacketBuilder::ethernet2([1; 6], [2; 6])
            .ipv4([10, 0, 0, 1], [10, 0, 0, 53], 64)
            .udp(5353, 53);
        let mut out = Vec::new();
        builder.write(&mut out, payload).unwrap();
        out
    }

    fn replay(
        format: OutputFormat,
        frames: &[Vec<u8>],
    ) -> (Rc<RefCell<SummaryListener<Vec<u8>>>>, Dispatcher) {
        let summary = Rc::new(RefCell::new(SummaryListener::new(Vec::new(), format, true)));
        let listener: SharedListener = summary.clone();
        let mut dispatcher = Dispatcher::new(DispatchConfig::default(), listener);
        for (i, data) in frames.iter().enumerate() {
            dispatcher.handle_packet(RawFrame {
                frame_number: i as u64 + 1,
                timestamp: Timestamp::new(i as i64, 0),
                captured_len: data.len() as u32,
                original_len: data.len() as u32,
                data,
            });
        }
        dispatcher.flush();
        (summary, dispatcher)
    }

    // Test 1: text output lists streams and datagram groups
    #[test]
    fn test_text_records() {
        let frames = vec![
            tcp(true, 1, false, b"hello"),
            tcp(false, 1, false, b"world!"),
            tcp(true, 6, true, b""),
            tcp(false, 7, true, b""),
            udp(b"query"),
        ];
        let (summary, dispatcher) = replay(OutputFormat::Text, &frames);
        summary
            .borrow_mut()
            .finish(&dispatcher.stats(), dispatcher.stream_stats().as_ref())
            .unwrap();

        let summary = summary.borrow();
        let text = String::from_utf8(summary.writer().clone()).unwrap();
        assert!(text.contains("stream   #1-4 10.0.0.1:40000 -> 10.0.0.2:80 [finished] 4 packets, 11 bytes"));
        assert!(text.contains("datagram #5-5 udp 10.0.0.1:5353 <-> 10.0.0.53:53 [flushed] 1 packets, 5 bytes"));
        assert!(text.contains("Frames:              5"));
        assert_eq!(summary.totals().streams, 1);
        assert_eq!(summary.totals().stream_bytes, 11);
    }

    // Test 2: CSV output starts with a header and escapes fields
    #[test]
    fn test_csv_records() {
        let mut lone = vec![0xff; 12];
        lone.extend_from_slice(&[0x08, 0x00]);
        let (summary, _dispatcher) = replay(OutputFormat::Csv, &[lone]);

        let summary = summary.borrow();
        let text = String::from_utf8(summary.writer().clone()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER));
        assert_eq!(lines.next(), Some("packet,1,1,ethernet,,1,14,0"));
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
    }

    // Test 3: errors are always recorded
    #[test]
    fn test_error_record() {
        let mut truncated = udp(b"x");
        truncated.truncate(20);
        let (summary, _dispatcher) = replay(OutputFormat::Text, &[truncated]);
        let summary = summary.borrow();
        let text = String::from_utf8(summary.writer().clone()).unwrap();
        assert!(text.starts_with("error    #1"));
        assert!(text.contains("Malformed ipv4 layer"));
        assert_eq!(summary.totals().errors, 1);
    }
}
