//! Live interface capture through libpcap.

use std::time::Duration;

use tracing::{debug, info};

use super::{CaptureSource, RawFrame};
use crate::error::CaptureError;
use crate::packet::{LinkType, Timestamp};

/// Live captures always ask for full frames.
pub const LIVE_SNAPLEN: i32 = 65536;

/// A capture on a network interface.
pub struct LiveSource {
    device: String,
    capture: pcap::Capture<pcap::Active>,
    link_type: LinkType,
    frame_number: u64,
}

impl LiveSource {
    /// Open `device` for capture.
    ///
    /// `timeout` bounds how long one [`dispatch`](CaptureSource::dispatch)
    /// call waits for more packets.
    pub fn open(device: &str, promiscuous: bool, timeout: Duration) -> Result<Self, CaptureError> {
        let open_error = |e: pcap::Error| CaptureError::Open {
            source_name: device.to_string(),
            reason: e.to_string(),
        };
        let capture = pcap::Capture::from_device(device)
            .map_err(open_error)?
            .promisc(promiscuous)
            .snaplen(LIVE_SNAPLEN)
            .timeout(timeout.as_millis().min(i32::MAX as u128) as i32)
            .open()
            .map_err(open_error)?;

        let link_type = LinkType(capture.get_datalink().0 as u16);
        info!(device, %link_type, promiscuous, "live capture opened");

        Ok(LiveSource {
            device: device.to_string(),
            capture,
            link_type,
            frame_number: 0,
        })
    }
}

impl CaptureSource for LiveSource {
    fn name(&self) -> &str {
        &self.device
    }

    fn link_type(&self) -> LinkType {
        self.link_type
    }

    fn snaplen(&self) -> u32 {
        LIVE_SNAPLEN as u32
    }

    fn apply_filter(&mut self, expression: &str) -> Result<(), CaptureError> {
        self.capture
            .filter(expression, true)
            .map_err(|e| CaptureError::FilterCompile {
                expression: expression.to_string(),
                reason: e.to_string(),
            })?;
        debug!(device = %self.device, expression, "kernel filter installed");
        Ok(())
    }

    fn dispatch(&mut self, handler: &mut dyn FnMut(RawFrame<'_>)) -> Result<usize, CaptureError> {
        let mut count = 0;
        loop {
            match self.capture.next_packet() {
                Ok(packet) => {
                    self.frame_number += 1;
                    let ts = packet.header.ts;
                    handler(RawFrame {
                        frame_number: self.frame_number,
                        timestamp: Timestamp::new(ts.tv_sec as i64, ts.tv_usec as u32),
                        captured_len: packet.header.caplen,
                        original_len: packet.header.len,
                        data: packet.data,
                    });
                    count += 1;
                }
                Err(pcap::Error::TimeoutExpired) | Err(pcap::Error::NoMorePackets) => break,
                Err(e) => {
                    return Err(CaptureError::Read {
                        source_name: self.device.clone(),
                        reason: e.to_string(),
                    })
                }
            }
        }
        Ok(count)
    }
}
