use std::path::{Path, PathBuf};
#[cfg(feature = "libpcap")]
use std::time::Duration;

use tracing::{debug, info, trace};

use super::{DispatchConfig, UnknownLayerPolicy};
use crate::datagram::{DatagramReassembler, DatagramStats};
use crate::error::{Error, Result};
use crate::io::{CaptureSource, RawFrame};
use crate::listener::{CaptureInfo, SharedListener};
use crate::packet::{LayerKind, LinkType, Packet, PacketPool};
use crate::pcap::PcapSource;
use crate::protocol::{default_registry, ProtocolRegistry};
use crate::stream::{FlushScope, ReassemblyStats, StreamReassembler};

/// Where to capture from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// A PCAP or PCAPNG file, optionally compressed
    File(PathBuf),
    /// A network interface
    #[cfg(feature = "libpcap")]
    Live {
        device: String,
        promiscuous: bool,
        /// Read timeout; `read_all` returns after it expires with no traffic
        timeout: Duration,
    },
}

impl SourceSpec {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        SourceSpec::File(path.into())
    }

    #[cfg(feature = "libpcap")]
    pub fn live(device: impl Into<String>) -> Self {
        SourceSpec::Live {
            device: device.into(),
            promiscuous: true,
            timeout: Duration::from_millis(1000),
        }
    }

    fn open(&self) -> Result<Box<dyn CaptureSource>> {
        match self {
            SourceSpec::File(path) => Ok(Box::new(PcapSource::open(path)?)),
            #[cfg(feature = "libpcap")]
            SourceSpec::Live {
                device,
                promiscuous,
                timeout,
            } => Ok(Box::new(crate::io::LiveSource::open(
                device,
                *promiscuous,
                *timeout,
            )?)),
        }
    }
}

/// Where a parsed packet goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Straight to the listener
    PassThrough,
    /// TCP header on top, or payload directly above one
    Stream,
    /// UDP header on top, or payload directly above one
    Datagram,
}

/// Pick a route from the two innermost layers.
///
/// Packets with fewer than two layers always pass through.
pub fn classify(packet: &Packet<'_>) -> Route {
    let (Some(top), Some(second)) = (packet.top(), packet.second()) else {
        return Route::PassThrough;
    };
    match (top.kind, second.kind) {
        (LayerKind::Tcp, _) | (LayerKind::Data, LayerKind::Tcp) => Route::Stream,
        (LayerKind::Udp, _) | (LayerKind::Data, LayerKind::Udp) => Route::Datagram,
        _ => Route::PassThrough,
    }
}

/// Dispatcher counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Frames handed to `handle_packet`
    pub packets: u64,
    pub passed_through: u64,
    /// Packets consumed by the stream reassembler
    pub streamed: u64,
    /// Packets buffered by the datagram reassembler
    pub datagrams: u64,
    pub unknown_discarded: u64,
    pub unknown_reported: u64,
    pub malformed: u64,
    /// Most packets claimed from the pool at once
    pub pool_high_water: usize,
}

/// Everything `handle_packet` touches. Kept apart from the source so the
/// source can call back into it while dispatching.
struct Pipeline {
    registry: ProtocolRegistry,
    pool: PacketPool,
    listener: SharedListener,
    link_type: LinkType,
    config: DispatchConfig,
    stream: Option<StreamReassembler>,
    datagram: Option<DatagramReassembler>,
    stats: DispatchStats,
}

impl Pipeline {
    fn handle_packet(&mut self, frame: RawFrame<'_>) {
        self.stats.packets += 1;
        let mut packet: Packet<'_> = self.pool.claim();

        match packet.init(self.link_type, &frame, &self.registry) {
            Ok(()) => self.route(packet),
            Err(error) if error.is_unrecognized() => match self.config.unknown_layer {
                UnknownLayerPolicy::Discard => {
                    trace!(frame = frame.frame_number, %error, "discarding packet");
                    self.stats.unknown_discarded += 1;
                    self.pool.release(packet);
                }
                UnknownLayerPolicy::Report => {
                    self.stats.unknown_reported += 1;
                    self.listener.borrow_mut().accept_error(&packet, &error);
                    self.pool.release(packet);
                }
            },
            Err(error) => {
                debug!(frame = frame.frame_number, %error, "malformed packet");
                self.stats.malformed += 1;
                self.listener.borrow_mut().accept_error(&packet, &error);
                self.pool.release(packet);
            }
        }
    }

    fn route(&mut self, packet: Packet<'_>) {
        let now = packet.ts();
        if let Some(engine) = &mut self.stream {
            engine.set_now(now);
        }
        if let Some(engine) = &mut self.datagram {
            engine.set_now(now, &mut self.pool);
        }

        match classify(&packet) {
            Route::Stream => {
                if let Some(engine) = &mut self.stream {
                    if engine.process(&packet) {
                        self.stats.streamed += 1;
                        self.pool.release(packet);
                        return;
                    }
                }
                self.pass_through(packet);
            }
            Route::Datagram => match &mut self.datagram {
                Some(engine) => match engine.process(packet, &mut self.pool) {
                    None => self.stats.datagrams += 1,
                    Some(packet) => self.pass_through(packet),
                },
                None => self.pass_through(packet),
            },
            Route::PassThrough => self.pass_through(packet),
        }
    }

    fn pass_through(&mut self, packet: Packet<'_>) {
        self.stats.passed_through += 1;
        self.listener.borrow_mut().accept(&packet);
        self.pool.release(packet);
    }

    fn flush(&mut self) {
        if let Some(engine) = &mut self.stream {
            engine.flush(FlushScope::All);
        }
        if let Some(engine) = &mut self.datagram {
            engine.flush(FlushScope::All, &mut self.pool);
        }
    }
}

/// Reads packets from a capture source, dissects them and routes them to
/// the reassemblers or straight to a [`Listener`](crate::Listener).
///
/// # Example
///
/// ```no_run
/// use pcapstream_core::dispatch::{DispatchConfig, Dispatcher};
/// use pcapstream_core::listener::{shared, NullListener};
///
/// let mut dispatcher = Dispatcher::new(DispatchConfig::default(), shared(NullListener));
/// let frames = dispatcher.read_file("capture.pcap", Some("tcp port 443")).unwrap();
/// println!("{} frames", frames);
/// ```
pub struct Dispatcher {
    source: Option<Box<dyn CaptureSource>>,
    pipeline: Pipeline,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig, listener: SharedListener) -> Self {
        Self::with_registry(config, listener, default_registry())
    }

    /// Dispatcher that dissects with a custom protocol registry.
    pub fn with_registry(
        config: DispatchConfig,
        listener: SharedListener,
        registry: ProtocolRegistry,
    ) -> Self {
        let mut dispatcher = Self {
            source: None,
            pipeline: Pipeline {
                registry,
                pool: PacketPool::with_capacity(config.pool_capacity),
                listener,
                link_type: LinkType::ETHERNET,
                config,
                stream: None,
                datagram: None,
                stats: DispatchStats::default(),
            },
        };
        let (stream, datagram) = (
            dispatcher.pipeline.config.stream_reassembly,
            dispatcher.pipeline.config.datagram_reassembly,
        );
        dispatcher.enable_stream_reassembly(stream);
        dispatcher.enable_datagram_reassembly(datagram);
        dispatcher
    }

    /// Open a capture source and optionally activate a filter.
    ///
    /// An empty filter expression means no filter. On failure nothing is
    /// retained.
    pub fn open(&mut self, spec: &SourceSpec, filter: Option<&str>) -> Result<()> {
        self.ensure_closed()?;
        let source = spec.open()?;
        self.attach(source, filter)
    }

    /// Like [`open`](Self::open), for a source built by the caller.
    pub fn attach(&mut self, mut source: Box<dyn CaptureSource>, filter: Option<&str>) -> Result<()> {
        self.ensure_closed()?;
        if let Some(expression) = filter.map(str::trim).filter(|e| !e.is_empty()) {
            source.apply_filter(expression)?;
            debug!(source = source.name(), expression, "filter activated");
        }

        let info = CaptureInfo {
            source_name: source.name().to_string(),
            link_type: source.link_type(),
            snaplen: source.snaplen(),
        };
        info!(
            source = %info.source_name,
            link_type = %info.link_type,
            snaplen = info.snaplen,
            "capture opened"
        );
        self.pipeline.link_type = info.link_type;
        self.pipeline.listener.borrow_mut().begin_capture(&info);
        self.source = Some(source);
        Ok(())
    }

    fn ensure_closed(&self) -> Result<()> {
        match &self.source {
            Some(source) => Err(Error::AlreadyOpen {
                source_name: source.name().to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Release the open source.
    pub fn close(&mut self) -> Result<()> {
        let source = self.source.take().ok_or(Error::NotOpen)?;
        debug!(source = source.name(), "capture closed");
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.source.is_some()
    }

    /// Name of the open source.
    pub fn source_name(&self) -> Option<&str> {
        self.source.as_deref().map(|source| source.name())
    }

    /// Pull every available frame from the open source through
    /// [`handle_packet`](Self::handle_packet).
    ///
    /// Per-packet problems go to the listener; only a failure of the read
    /// loop itself is returned.
    pub fn read_all(&mut self) -> Result<usize> {
        let source = self.source.as_mut().ok_or(Error::NotOpen)?;
        let pipeline = &mut self.pipeline;
        let frames = source.dispatch(&mut |frame| pipeline.handle_packet(frame))?;
        debug!(source = source.name(), frames, "read complete");
        Ok(frames)
    }

    /// Open `path`, read it to the end, flush both reassemblers and close.
    ///
    /// The source is closed even when reading fails.
    pub fn read_file(&mut self, path: impl AsRef<Path>, filter: Option<&str>) -> Result<usize> {
        self.open(&SourceSpec::file(path.as_ref()), filter)?;
        let result = self.read_all();
        self.flush();
        let closed = self.close();
        let frames = result?;
        closed?;
        Ok(frames)
    }

    /// Process one frame from a caller-driven capture loop.
    ///
    /// Frames are dissected against the link type of the last opened
    /// source (Ethernet until then, or whatever [`set_link_type`](Self::set_link_type) set).
    pub fn handle_packet(&mut self, frame: RawFrame<'_>) {
        self.pipeline.handle_packet(frame);
    }

    pub fn set_link_type(&mut self, link_type: LinkType) {
        self.pipeline.link_type = link_type;
    }

    pub fn link_type(&self) -> LinkType {
        self.pipeline.link_type
    }

    /// Route future output to `listener`, including completions from both
    /// reassemblers.
    pub fn set_consumer(&mut self, listener: SharedListener) {
        if let Some(engine) = &mut self.pipeline.stream {
            engine.set_listener(listener.clone());
        }
        if let Some(engine) = &mut self.pipeline.datagram {
            engine.set_listener(listener.clone());
        }
        self.pipeline.listener = listener;
    }

    /// Drain both reassemblers. Logical time does not advance.
    pub fn flush(&mut self) {
        self.pipeline.flush();
    }

    /// Create or destroy the stream reassembler. Destroying flushes it
    /// first, so open connections are reported as flushed.
    pub fn enable_stream_reassembly(&mut self, enable: bool) {
        let pipeline = &mut self.pipeline;
        pipeline.config.stream_reassembly = enable;
        match (enable, pipeline.stream.take()) {
            (true, Some(engine)) => pipeline.stream = Some(engine),
            (true, None) => {
                pipeline.stream = Some(StreamReassembler::new(
                    pipeline.config.stream.clone(),
                    pipeline.listener.clone(),
                ));
            }
            (false, Some(mut engine)) => {
                engine.flush(FlushScope::All);
                debug!("stream reassembly disabled");
            }
            (false, None) => {}
        }
    }

    /// Create or destroy the datagram reassembler. Destroying releases any
    /// buffered groups first.
    pub fn enable_datagram_reassembly(&mut self, enable: bool) {
        let pipeline = &mut self.pipeline;
        pipeline.config.datagram_reassembly = enable;
        match (enable, pipeline.datagram.take()) {
            (true, Some(engine)) => pipeline.datagram = Some(engine),
            (true, None) => {
                pipeline.datagram = Some(DatagramReassembler::new(
                    pipeline.config.datagram.clone(),
                    pipeline.listener.clone(),
                ));
            }
            (false, Some(mut engine)) => {
                engine.flush(FlushScope::All, &mut pipeline.pool);
                debug!("datagram reassembly disabled");
            }
            (false, None) => {}
        }
    }

    pub fn stream_reassembly_enabled(&self) -> bool {
        self.pipeline.stream.is_some()
    }

    pub fn datagram_reassembly_enabled(&self) -> bool {
        self.pipeline.datagram.is_some()
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            pool_high_water: self.pipeline.pool.high_water(),
            ..self.pipeline.stats
        }
    }

    pub fn stream_stats(&self) -> Option<ReassemblyStats> {
        self.pipeline.stream.as_ref().map(StreamReassembler::stats)
    }

    pub fn datagram_stats(&self) -> Option<DatagramStats> {
        self.pipeline.datagram.as_ref().map(DatagramReassembler::stats)
    }

    pub fn pool(&self) -> &PacketPool {
        &self.pipeline.pool
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.pipeline.config
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.pipeline.flush();
    }
}
