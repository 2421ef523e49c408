//! Packet builder for synthesising captured frames
//!
//! Produces frames in any of the supported link framings so the capture
//! pipeline can be driven without a live interface.

use crate::ethernet::{EtherType, EthernetFrame, MacAddress};
use crate::ip::{IpProtocol, Ipv4Packet, Ipv6Packet};
use crate::link::LinkType;
use crate::tcp::{TcpFlags, TcpHeader};
use bytes::{BufMut, BytesMut};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use thiserror::Error;

/// Packet construction error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("Packet construction error: {0} layer is required")]
    MissingLayer(&'static str),

    #[error("Packet construction error: {len} byte payload exceeds the IP length field")]
    PayloadTooLarge { len: usize },
}

/// Layer 3 packet type
#[derive(Debug, Clone)]
enum Layer3 {
    Ipv4 {
        src: Ipv4Addr,
        dst: Ipv4Addr,
        ttl: u8,
        identification: u16,
    },
    Ipv6 {
        src: Ipv6Addr,
        dst: Ipv6Addr,
        hop_limit: u8,
    },
}

impl Layer3 {
    fn addresses(&self) -> (IpAddr, IpAddr) {
        match *self {
            Layer3::Ipv4 { src, dst, .. } => (IpAddr::V4(src), IpAddr::V4(dst)),
            Layer3::Ipv6 { src, dst, .. } => (IpAddr::V6(src), IpAddr::V6(dst)),
        }
    }
}

/// Packet builder with fluent API
///
/// # Examples
///
/// ```
/// use optap_packet::PacketBuilder;
/// use optap_packet::tcp::TcpFlags;
///
/// let frame = PacketBuilder::loopback_v4(40000, 27017)
///     .tcp_flags(TcpFlags::PSH_ACK)
///     .payload(b"hello".to_vec())
///     .build()
///     .unwrap();
/// assert_eq!(frame.len(), 14 + 20 + 20 + 5);
/// ```
#[derive(Debug, Clone)]
pub struct PacketBuilder {
    link: LinkType,
    src_mac: MacAddress,
    dst_mac: MacAddress,
    layer3: Option<Layer3>,
    protocol: IpProtocol,
    tcp: Option<TcpHeader>,
    payload: Vec<u8>,
}

impl PacketBuilder {
    pub fn new() -> Self {
        PacketBuilder {
            link: LinkType::Ethernet,
            src_mac: MacAddress::ZERO,
            dst_mac: MacAddress::ZERO,
            layer3: None,
            protocol: IpProtocol::TCP,
            tcp: None,
            payload: Vec::new(),
        }
    }

    /// Ethernet/IPv4/TCP between two loopback ports, as seen on Linux `lo`
    pub fn loopback_v4(src_port: u16, dst_port: u16) -> Self {
        Self::new()
            .ipv4(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST)
            .tcp(src_port, dst_port)
    }

    /// Ethernet/IPv6/TCP between two `::1` ports
    pub fn loopback_v6(src_port: u16, dst_port: u16) -> Self {
        Self::new()
            .ipv6(Ipv6Addr::LOCALHOST, Ipv6Addr::LOCALHOST)
            .tcp(src_port, dst_port)
    }

    /// Select the link framing (Ethernet by default)
    pub fn link(mut self, link: LinkType) -> Self {
        self.link = link;
        self
    }

    /// Set the Ethernet addresses
    pub fn ethernet(mut self, src: MacAddress, dst: MacAddress) -> Self {
        self.src_mac = src;
        self.dst_mac = dst;
        self
    }

    pub fn ipv4(mut self, src: Ipv4Addr, dst: Ipv4Addr) -> Self {
        self.layer3 = Some(Layer3::Ipv4 {
            src,
            dst,
            ttl: 64,
            identification: 0,
        });
        self
    }

    pub fn ipv6(mut self, src: Ipv6Addr, dst: Ipv6Addr) -> Self {
        self.layer3 = Some(Layer3::Ipv6 {
            src,
            dst,
            hop_limit: 64,
        });
        self
    }

    /// Set the TTL or hop limit
    ///
    /// Must be called after `ipv4()` or `ipv6()`.
    pub fn ttl(mut self, new_ttl: u8) -> Self {
        match self.layer3 {
            Some(Layer3::Ipv4 { ref mut ttl, .. }) => *ttl = new_ttl,
            Some(Layer3::Ipv6 {
                ref mut hop_limit, ..
            }) => *hop_limit = new_ttl,
            None => {}
        }
        self
    }

    /// Set the IPv4 identification
    pub fn identification(mut self, id: u16) -> Self {
        if let Some(Layer3::Ipv4 {
            ref mut identification,
            ..
        }) = self.layer3
        {
            *identification = id;
        }
        self
    }

    /// Carry the payload directly under IP as `protocol` instead of TCP
    pub fn ip_protocol(mut self, protocol: IpProtocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Add a TCP layer (PSH+ACK by default)
    pub fn tcp(mut self, src_port: u16, dst_port: u16) -> Self {
        self.protocol = IpProtocol::TCP;
        self.tcp = Some(TcpHeader::new(src_port, dst_port, TcpFlags::PSH_ACK));
        self
    }

    /// Must be called after `tcp()`.
    pub fn tcp_flags(mut self, flags: TcpFlags) -> Self {
        if let Some(ref mut tcp) = self.tcp {
            tcp.flags = flags;
        }
        self
    }

    /// Must be called after `tcp()`.
    pub fn sequence(mut self, seq: u32, ack: u32) -> Self {
        if let Some(ref mut tcp) = self.tcp {
            tcp.sequence_number = seq;
            tcp.acknowledgment_number = ack;
        }
        self
    }

    /// Must be called after `tcp()`.
    pub fn tcp_options(mut self, options: Vec<u8>) -> Self {
        if let Some(ref mut tcp) = self.tcp {
            tcp.options = options;
        }
        self
    }

    pub fn payload(mut self, data: Vec<u8>) -> Self {
        self.payload = data;
        self
    }

    /// Build the complete frame
    ///
    /// # Errors
    ///
    /// Returns an error if no IP layer was configured, if TCP was selected
    /// without a TCP header, or if the payload cannot fit the IP length field.
    pub fn build(self) -> Result<Vec<u8>, BuildError> {
        let layer3 = self.layer3.as_ref().ok_or(BuildError::MissingLayer("IP"))?;
        let (src, dst) = layer3.addresses();

        let mut transport = BytesMut::new();
        if self.protocol == IpProtocol::TCP {
            let tcp = self.tcp.as_ref().ok_or(BuildError::MissingLayer("TCP"))?;
            tcp.write(&mut transport, src, dst, &self.payload);
        } else {
            transport.put_slice(&self.payload);
        }

        let limit = match layer3 {
            Layer3::Ipv4 { .. } => usize::from(u16::MAX) - Ipv4Packet::MIN_HEADER_SIZE,
            Layer3::Ipv6 { .. } => usize::from(u16::MAX),
        };
        if transport.len() > limit {
            return Err(BuildError::PayloadTooLarge {
                len: self.payload.len(),
            });
        }

        let mut network = BytesMut::new();
        let ethertype = match *layer3 {
            Layer3::Ipv4 {
                src,
                dst,
                ttl,
                identification,
            } => {
                Ipv4Packet::write(
                    &mut network,
                    src,
                    dst,
                    self.protocol,
                    identification,
                    ttl,
                    &transport,
                );
                EtherType::IPv4
            }
            Layer3::Ipv6 {
                src,
                dst,
                hop_limit,
            } => {
                Ipv6Packet::write(&mut network, src, dst, self.protocol, hop_limit, &transport);
                EtherType::IPv6
            }
        };

        let mut frame = BytesMut::new();
        let is_v6 = ethertype == EtherType::IPv6;
        match self.link {
            LinkType::Ethernet => {
                EthernetFrame::write(&mut frame, self.dst_mac, self.src_mac, ethertype, &network);
            }
            LinkType::Null => {
                frame.put_u32_le(if is_v6 { 30 } else { 2 });
                frame.put_slice(&network);
            }
            LinkType::Loop => {
                frame.put_u32(if is_v6 { 30 } else { 2 });
                frame.put_slice(&network);
            }
            LinkType::LinuxSll => {
                // Packet type "to us", ARPHRD_LOOPBACK, 6-byte address
                frame.put_u16(0);
                frame.put_u16(772);
                frame.put_u16(6);
                frame.put_slice(self.src_mac.as_bytes());
                frame.put_u16(0);
                frame.put_u16(ethertype.to_u16());
                frame.put_slice(&network);
            }
        }

        Ok(frame.to_vec())
    }
}

impl Default for PacketBuilder {
    fn default() -> Self {
        Self::new()
    }
}
