//! pcap-backed frame sources

use optap_core::{CaptureConfig, Error, RawFrame, Result};
use optap_packet::LinkType;
use pcap::{Activated, Active, Capture, Device, Linktype, Offline};
use std::path::Path;
use tracing::{debug, info, trace};

use crate::filters::validate_filter;
use crate::interface::get_interface;
use crate::source::{FrameSource, SourceEvent};
use crate::stats::CaptureStats;

/// Frame source reading from a pcap handle
///
/// A live handle reports a closed device as [`Error::CaptureClosed`]; an
/// offline handle reports the end of its file as [`SourceEvent::End`].
pub struct PcapSource<T: Activated> {
    capture: Capture<T>,
    link: LinkType,
    filter: String,
    live: bool,
}

impl PcapSource<Active> {
    /// Open a live capture on the configured interface with the port filter installed
    pub fn open_live(config: &CaptureConfig) -> Result<Self> {
        validate_filter(&config.filter_expression(), Linktype::ETHERNET)?;
        let interface = get_interface(&config.interface)?;
        if !interface.is_up {
            return Err(Error::setup(format!(
                "Interface '{}' is not up",
                interface.name
            )));
        }

        debug!(
            interface = %interface.name,
            snaplen = config.snaplen,
            timeout_ms = config.read_timeout_ms(),
            "Opening live capture"
        );

        let device = Device::from(interface.name.as_str());
        let mut capture = Capture::from_device(device)
            .map_err(|e| Error::setup(format!("Failed to create capture: {}", e)))?
            .promisc(config.promiscuous)
            .snaplen(config.snaplen)
            .timeout(config.read_timeout_ms())
            .immediate_mode(config.immediate_mode);

        if config.buffer_size > 0 {
            capture = capture.buffer_size(config.buffer_size);
        }

        let capture = capture
            .open()
            .map_err(|e| Error::setup(format!("Failed to open capture: {}", e)))?;

        let source = Self::with_filter(capture, config, true)?;
        info!(
            interface = %interface.name,
            filter = %source.filter,
            link = %source.link,
            "Capture opened"
        );
        Ok(source)
    }
}

impl PcapSource<Offline> {
    /// Replay a pcap file through the configured port filter
    pub fn from_file<P: AsRef<Path>>(path: P, config: &CaptureConfig) -> Result<Self> {
        let path = path.as_ref();
        validate_filter(&config.filter_expression(), Linktype::ETHERNET)?;
        let capture = Capture::from_file(path).map_err(|e| {
            Error::setup(format!("Failed to open capture file {}: {}", path.display(), e))
        })?;

        let source = Self::with_filter(capture, config, false)?;
        info!(
            file = %path.display(),
            filter = %source.filter,
            link = %source.link,
            "Capture file opened"
        );
        Ok(source)
    }
}

impl<T: Activated> PcapSource<T> {
    fn with_filter(mut capture: Capture<T>, config: &CaptureConfig, live: bool) -> Result<Self> {
        let datalink = capture.get_datalink();
        let link = LinkType::from_dlt(datalink.0).ok_or_else(|| {
            Error::setup(format!("Unsupported datalink type {}", datalink.0))
        })?;

        let filter = config.filter_expression();
        capture
            .filter(&filter, true)
            .map_err(|e| Error::setup(format!("Invalid BPF filter '{}': {}", filter, e)))?;
        debug!(filter = %filter, "Applied filter");

        Ok(Self {
            capture,
            link,
            filter,
            live,
        })
    }

    /// The installed filter expression
    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn is_live(&self) -> bool {
        self.live
    }
}

impl<T: Activated> FrameSource for PcapSource<T> {
    fn next_frame(&mut self) -> Result<SourceEvent> {
        match self.capture.next_packet() {
            Ok(packet) => {
                let header = packet.header;
                trace!(caplen = header.caplen, len = header.len, "Frame captured");
                let frame = RawFrame::new(packet.data.to_vec())
                    .with_wire_len(header.len)
                    .with_timeval(header.ts.tv_sec as i64, header.ts.tv_usec as i64);
                Ok(SourceEvent::Frame(frame))
            }
            Err(e) => read_outcome(e, self.live),
        }
    }

    fn link_type(&self) -> LinkType {
        self.link
    }

    fn stats(&mut self) -> Option<CaptureStats> {
        // Offline handles have no kernel counters
        if !self.live {
            return None;
        }
        match self.capture.stats() {
            Ok(stats) => Some(CaptureStats::from_pcap_stats(stats)),
            Err(e) => {
                debug!(error = %e, "Capture statistics unavailable");
                None
            }
        }
    }
}

/// Map a failed pcap read to what the session loop sees
fn read_outcome(err: pcap::Error, live: bool) -> Result<SourceEvent> {
    match err {
        pcap::Error::TimeoutExpired => Ok(SourceEvent::Idle),
        pcap::Error::NoMorePackets if !live => Ok(SourceEvent::End),
        pcap::Error::NoMorePackets => Err(Error::CaptureClosed("no more packets".to_string())),
        e => Err(Error::capture(format!("Failed to read packet: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::loopback_interface;

    #[test]
    fn test_read_outcome_live() {
        assert!(matches!(
            read_outcome(pcap::Error::TimeoutExpired, true),
            Ok(SourceEvent::Idle)
        ));

        let closed = read_outcome(pcap::Error::NoMorePackets, true).unwrap_err();
        assert!(matches!(closed, Error::CaptureClosed(_)));
        assert!(!closed.is_cancelled());
        assert!(!closed.is_fatal_decode());

        let failed = read_outcome(pcap::Error::PcapError("device gone".to_string()), true).unwrap_err();
        assert!(matches!(failed, Error::Capture(ref msg) if msg.contains("device gone")));
    }

    #[test]
    fn test_read_outcome_offline() {
        assert!(matches!(
            read_outcome(pcap::Error::NoMorePackets, false),
            Ok(SourceEvent::End)
        ));
        assert!(matches!(
            read_outcome(pcap::Error::PcapError("truncated".to_string()), false),
            Err(Error::Capture(_))
        ));
    }

    fn loopback_config() -> Option<CaptureConfig> {
        loopback_interface()
            .ok()
            .map(|iface| CaptureConfig::new(iface.name, 27017))
    }

    #[test]
    fn test_open_unknown_interface() {
        let config = CaptureConfig::new("optap-no-such-if0", 27017);
        match PcapSource::open_live(&config) {
            Err(Error::InterfaceNotFound(name)) => assert_eq!(name, "optap-no-such-if0"),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("opened a nonexistent interface"),
        }
    }

    #[test]
    fn test_open_missing_file() {
        let result = PcapSource::from_file("/nonexistent/optap.pcap", &CaptureConfig::default());
        assert!(matches!(result, Err(Error::Setup(_))));
    }

    #[test]
    fn test_open_loopback() {
        let Some(config) = loopback_config() else {
            return;
        };

        // This might fail if not running with permissions
        match PcapSource::open_live(&config) {
            Ok(mut source) => {
                assert_eq!(source.filter(), "tcp port 27017");
                assert!(source.is_live());
                assert!(matches!(
                    source.link_type(),
                    LinkType::Ethernet | LinkType::Null | LinkType::Loop
                ));
            }
            Err(e) => {
                assert!(e.is_setup());
                println!("Could not open capture (may need privileges): {}", e);
            }
        }
    }

    #[test]
    fn test_open_loopback_with_timeout_idles() {
        let Some(config) = loopback_config() else {
            return;
        };
        // A port nothing listens on
        let config = CaptureConfig {
            port: 9,
            ..config
        }
        .with_read_timeout(std::time::Duration::from_millis(50));

        if let Ok(mut source) = PcapSource::open_live(&config) {
            // A live source never reports end of stream
            assert!(!matches!(source.next_frame(), Ok(SourceEvent::End)));
        }
    }
}
