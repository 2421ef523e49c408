//! TCP payload extraction
//!
//! Turns one captured frame into the bytes its TCP segment carries, or a
//! reason the frame was passed over. No reassembly happens here: each
//! segment's payload is handed on exactly as captured.

use crate::ip::{IpProtocol, Ipv4Packet, Ipv6Packet};
use crate::link::{LinkType, NetworkProtocol};
use crate::tcp::{TcpFlags, TcpSegment};
use optap_core::{ExtractorConfig, RawFrame};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use tracing::trace;

/// Connection endpoints of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowKey {
    pub source: SocketAddr,
    pub destination: SocketAddr,
}

impl FlowKey {
    pub fn new(source: SocketAddr, destination: SocketAddr) -> Self {
        Self {
            source,
            destination,
        }
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.destination)
    }
}

/// TCP payload of one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub flow: FlowKey,
    pub sequence: u32,
    pub flags: TcpFlags,
    pub payload: &'a [u8],
}

/// Outcome of extracting one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extracted<'a> {
    /// The frame carried a TCP segment (its payload may be empty)
    Segment(Segment<'a>),
    /// On-wire length matched the bare-ACK threshold; nothing was parsed
    SkippedAckLength,
    /// No TCP layer could be located
    SkippedNoTcp,
}

/// Per-frame TCP payload extractor for one datalink type
#[derive(Debug, Clone, Copy)]
pub struct PayloadExtractor {
    link: LinkType,
    ack_frame_len: u32,
}

impl PayloadExtractor {
    pub fn new(link: LinkType, config: &ExtractorConfig) -> Self {
        Self {
            link,
            ack_frame_len: config.ack_frame_len,
        }
    }

    pub fn link_type(&self) -> LinkType {
        self.link
    }

    pub fn extract<'a>(&self, frame: &'a RawFrame) -> Extracted<'a> {
        self.extract_bytes(frame.data(), frame.wire_len)
    }

    /// Extract from raw frame bytes and their on-wire length
    pub fn extract_bytes<'a>(&self, data: &'a [u8], wire_len: u32) -> Extracted<'a> {
        if wire_len == self.ack_frame_len {
            return Extracted::SkippedAckLength;
        }

        match self.tcp_segment(data) {
            Some(segment) => Extracted::Segment(segment),
            None => Extracted::SkippedNoTcp,
        }
    }

    fn tcp_segment<'a>(&self, data: &'a [u8]) -> Option<Segment<'a>> {
        let (protocol, network) = self.link.network_layer(data)?;

        let (source, destination, transport) = match protocol {
            NetworkProtocol::Ipv4 => {
                let packet = Ipv4Packet::parse(network)?;
                if packet.protocol != IpProtocol::TCP || packet.is_later_fragment() {
                    trace!(protocol = ?packet.protocol, "IPv4 packet without TCP header");
                    return None;
                }
                (
                    IpAddr::V4(packet.source),
                    IpAddr::V4(packet.destination),
                    packet.payload,
                )
            }
            NetworkProtocol::Ipv6 => {
                let packet = Ipv6Packet::parse(network)?;
                if packet.next_header != IpProtocol::TCP {
                    trace!(next_header = ?packet.next_header, "IPv6 packet without TCP header");
                    return None;
                }
                (
                    IpAddr::V6(packet.source),
                    IpAddr::V6(packet.destination),
                    packet.payload,
                )
            }
            NetworkProtocol::Other => return None,
        };

        let tcp = TcpSegment::parse(transport)?;

        Some(Segment {
            flow: FlowKey::new(
                SocketAddr::new(source, tcp.source_port),
                SocketAddr::new(destination, tcp.destination_port),
            ),
            sequence: tcp.sequence_number,
            flags: tcp.flags,
            payload: tcp.payload,
        })
    }
}
