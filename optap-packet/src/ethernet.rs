//! Ethernet II frame parsing and construction

use bytes::{BufMut, BytesMut};
use std::fmt;

/// EtherType values the extractor distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtherType {
    /// IPv4 (0x0800)
    IPv4,
    /// ARP (0x0806)
    ARP,
    /// VLAN-tagged frame (0x8100)
    VLAN,
    /// IPv6 (0x86DD)
    IPv6,
    /// Anything else
    Custom(u16),
}

impl EtherType {
    pub fn to_u16(self) -> u16 {
        match self {
            EtherType::IPv4 => 0x0800,
            EtherType::ARP => 0x0806,
            EtherType::VLAN => 0x8100,
            EtherType::IPv6 => 0x86DD,
            EtherType::Custom(val) => val,
        }
    }

    pub fn from_u16(value: u16) -> Self {
        match value {
            0x0800 => EtherType::IPv4,
            0x0806 => EtherType::ARP,
            0x8100 => EtherType::VLAN,
            0x86DD => EtherType::IPv6,
            val => EtherType::Custom(val),
        }
    }
}

impl fmt::Display for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EtherType::IPv4 => write!(f, "IPv4"),
            EtherType::ARP => write!(f, "ARP"),
            EtherType::VLAN => write!(f, "VLAN"),
            EtherType::IPv6 => write!(f, "IPv6"),
            EtherType::Custom(val) => write!(f, "0x{:04X}", val),
        }
    }
}

/// MAC address (6 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    /// Zero MAC address, as seen on the loopback device
    pub const ZERO: MacAddress = MacAddress([0; 6]);

    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        let bytes: [u8; 6] = slice.try_into().ok()?;
        Some(MacAddress(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a, b, c, d, e, g
        )
    }
}

/// Borrowed view of an Ethernet II frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetFrame<'a> {
    pub destination: MacAddress,
    pub source: MacAddress,
    /// EtherType of the payload, after any VLAN tag
    pub ethertype: EtherType,
    /// 802.1Q tag control information, if the frame was tagged
    pub vlan_tci: Option<u16>,
    pub payload: &'a [u8],
}

impl<'a> EthernetFrame<'a> {
    /// Minimum Ethernet frame size (without FCS)
    pub const MIN_FRAME_SIZE: usize = 60;

    /// Ethernet header size (dst + src + type)
    pub const HEADER_SIZE: usize = 14;

    /// 802.1Q tag size
    pub const VLAN_TAG_SIZE: usize = 4;

    /// Parse a frame, following a single 802.1Q tag
    ///
    /// Length-field (802.3/LLC) frames are rejected.
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        if data.len() < Self::HEADER_SIZE {
            return None;
        }

        let destination = MacAddress::from_slice(&data[0..6])?;
        let source = MacAddress::from_slice(&data[6..12])?;
        let mut ethertype = u16::from_be_bytes([data[12], data[13]]);
        let mut offset = Self::HEADER_SIZE;
        let mut vlan_tci = None;

        // Values <= 1500 are an 802.3 length, not an EtherType
        if ethertype <= 1500 {
            return None;
        }

        if EtherType::from_u16(ethertype) == EtherType::VLAN {
            let tag = data.get(offset..offset + Self::VLAN_TAG_SIZE)?;
            vlan_tci = Some(u16::from_be_bytes([tag[0], tag[1]]));
            ethertype = u16::from_be_bytes([tag[2], tag[3]]);
            offset += Self::VLAN_TAG_SIZE;
        }

        Some(EthernetFrame {
            destination,
            source,
            ethertype: EtherType::from_u16(ethertype),
            vlan_tci,
            payload: &data[offset..],
        })
    }

    /// Write a frame, padding to the minimum frame size
    pub fn write(
        buf: &mut BytesMut,
        destination: MacAddress,
        source: MacAddress,
        ethertype: EtherType,
        payload: &[u8],
    ) {
        let start = buf.len();
        buf.put_slice(destination.as_bytes());
        buf.put_slice(source.as_bytes());
        buf.put_u16(ethertype.to_u16());
        buf.put_slice(payload);

        let written = buf.len() - start;
        if written < Self::MIN_FRAME_SIZE {
            buf.put_bytes(0, Self::MIN_FRAME_SIZE - written);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ethertype_conversion() {
        assert_eq!(EtherType::IPv4.to_u16(), 0x0800);
        assert_eq!(EtherType::from_u16(0x86DD), EtherType::IPv6);
        assert_eq!(EtherType::from_u16(0x1234), EtherType::Custom(0x1234));
    }

    #[test]
    fn test_mac_address_display() {
        let mac = MacAddress([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        assert_eq!(format!("{}", mac), "00:11:22:33:44:55");
    }

    #[test]
    fn test_parse_frame() {
        let data = [
            0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, // dst
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, // src
            0x08, 0x00, // IPv4
            0x01, 0x02, 0x03, 0x04, // payload
        ];

        let frame = EthernetFrame::parse(&data).unwrap();
        assert_eq!(frame.destination.0, [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        assert_eq!(frame.source.0, [0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        assert_eq!(frame.ethertype, EtherType::IPv4);
        assert_eq!(frame.vlan_tci, None);
        assert_eq!(frame.payload, &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_parse_vlan_tagged() {
        let data = [
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // macs
            0x81, 0x00, 0x00, 0x2A, 0x86, 0xDD, // 802.1Q vid 42, IPv6
            0x60,
        ];

        let frame = EthernetFrame::parse(&data).unwrap();
        assert_eq!(frame.vlan_tci, Some(42));
        assert_eq!(frame.ethertype, EtherType::IPv6);
        assert_eq!(frame.payload, &[0x60]);
    }

    #[test]
    fn test_parse_rejects_short_and_llc() {
        assert!(EthernetFrame::parse(&[0u8; 13]).is_none());

        let mut llc = [0u8; 20];
        llc[13] = 6;
        assert!(EthernetFrame::parse(&llc).is_none());
    }

    #[test]
    fn test_write_pads() {
        let mut buf = BytesMut::new();
        EthernetFrame::write(
            &mut buf,
            MacAddress::ZERO,
            MacAddress::ZERO,
            EtherType::IPv4,
            &[1, 2, 3],
        );

        assert_eq!(buf.len(), EthernetFrame::MIN_FRAME_SIZE);
        assert_eq!(&buf[12..14], &[0x08, 0x00]);
        assert_eq!(&buf[14..17], &[1, 2, 3]);
    }
}
