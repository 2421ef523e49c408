//! Link-layer framings
//!
//! The loopback device is exposed with a different framing on each platform:
//! Ethernet with zeroed MACs on Linux, a 4-byte address-family header on the
//! BSDs and macOS, and the cooked SLL header when capturing on "any".

use crate::ethernet::{EtherType, EthernetFrame};
use std::fmt;

/// Datalink types understood by the extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    /// DLT_EN10MB (1)
    Ethernet,
    /// DLT_NULL (0): address family in host byte order
    Null,
    /// DLT_LOOP (108): address family in network byte order
    Loop,
    /// DLT_LINUX_SLL (113)
    LinuxSll,
}

/// Network-layer protocol carried by a link frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkProtocol {
    Ipv4,
    Ipv6,
    Other,
}

impl LinkType {
    /// Linux cooked capture header size
    pub const SLL_HEADER_SIZE: usize = 16;

    /// BSD loopback header size
    pub const NULL_HEADER_SIZE: usize = 4;

    pub fn from_dlt(dlt: i32) -> Option<Self> {
        match dlt {
            0 => Some(LinkType::Null),
            1 => Some(LinkType::Ethernet),
            108 => Some(LinkType::Loop),
            113 => Some(LinkType::LinuxSll),
            _ => None,
        }
    }

    pub fn to_dlt(self) -> i32 {
        match self {
            LinkType::Null => 0,
            LinkType::Ethernet => 1,
            LinkType::Loop => 108,
            LinkType::LinuxSll => 113,
        }
    }

    /// Strip the link header, returning the network protocol and its bytes
    ///
    /// `None` means the frame is too short for its own link header.
    pub fn network_layer(self, data: &[u8]) -> Option<(NetworkProtocol, &[u8])> {
        match self {
            LinkType::Ethernet => {
                let frame = EthernetFrame::parse(data)?;
                Some((from_ethertype(frame.ethertype), frame.payload))
            }
            LinkType::Null | LinkType::Loop => {
                let header = data.get(..Self::NULL_HEADER_SIZE)?;
                let header = [header[0], header[1], header[2], header[3]];
                let family = if self == LinkType::Loop {
                    u32::from_be_bytes(header)
                } else {
                    // Host byte order of the capturing machine, which may not be ours
                    let le = u32::from_le_bytes(header);
                    if le > 0xFFFF {
                        u32::from_be_bytes(header)
                    } else {
                        le
                    }
                };
                Some((from_family(family), &data[Self::NULL_HEADER_SIZE..]))
            }
            LinkType::LinuxSll => {
                let header = data.get(..Self::SLL_HEADER_SIZE)?;
                let protocol = u16::from_be_bytes([header[14], header[15]]);
                Some((
                    from_ethertype(EtherType::from_u16(protocol)),
                    &data[Self::SLL_HEADER_SIZE..],
                ))
            }
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkType::Ethernet => write!(f, "EN10MB"),
            LinkType::Null => write!(f, "NULL"),
            LinkType::Loop => write!(f, "LOOP"),
            LinkType::LinuxSll => write!(f, "LINUX_SLL"),
        }
    }
}

fn from_ethertype(ethertype: EtherType) -> NetworkProtocol {
    match ethertype {
        EtherType::IPv4 => NetworkProtocol::Ipv4,
        EtherType::IPv6 => NetworkProtocol::Ipv6,
        _ => NetworkProtocol::Other,
    }
}

fn from_family(family: u32) -> NetworkProtocol {
    match family {
        2 => NetworkProtocol::Ipv4,
        // AF_INET6 differs per OS: Linux, NetBSD/OpenBSD, FreeBSD, Darwin
        10 | 24 | 28 | 30 => NetworkProtocol::Ipv6,
        _ => NetworkProtocol::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dlt_mapping() {
        for link in [
            LinkType::Ethernet,
            LinkType::Null,
            LinkType::Loop,
            LinkType::LinuxSll,
        ] {
            assert_eq!(LinkType::from_dlt(link.to_dlt()), Some(link));
        }
        assert_eq!(LinkType::from_dlt(105), None);
    }

    #[test]
    fn test_null_either_byte_order() {
        let le = [2, 0, 0, 0, 0x45];
        let be = [0, 0, 0, 2, 0x45];

        assert_eq!(
            LinkType::Null.network_layer(&le),
            Some((NetworkProtocol::Ipv4, &[0x45][..]))
        );
        assert_eq!(
            LinkType::Null.network_layer(&be),
            Some((NetworkProtocol::Ipv4, &[0x45][..]))
        );
    }

    #[test]
    fn test_loop_ipv6() {
        let data = [0, 0, 0, 30, 0x60];
        assert_eq!(
            LinkType::Loop.network_layer(&data).map(|(p, _)| p),
            Some(NetworkProtocol::Ipv6)
        );
    }

    #[test]
    fn test_linux_sll() {
        let mut data = vec![0u8; 16];
        data[14..16].copy_from_slice(&0x0800u16.to_be_bytes());
        data.push(0x45);

        assert_eq!(
            LinkType::LinuxSll.network_layer(&data),
            Some((NetworkProtocol::Ipv4, &[0x45][..]))
        );
        assert_eq!(LinkType::LinuxSll.network_layer(&data[..10]), None);
    }

    #[test]
    fn test_ethernet_arp_is_other() {
        let mut data = vec![0u8; 20];
        data[12..14].copy_from_slice(&0x0806u16.to_be_bytes());
        assert_eq!(
            LinkType::Ethernet.network_layer(&data).map(|(p, _)| p),
            Some(NetworkProtocol::Other)
        );
    }
}
