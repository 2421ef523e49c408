//! IPv4 and IPv6 packet parsing and construction
//!
//! Parsing honours the length fields in the IP header, so Ethernet padding
//! and trailing capture garbage never reach the transport layer.

use crate::checksum::internet_checksum;
use bytes::{BufMut, BytesMut};
use std::net::{Ipv4Addr, Ipv6Addr};

/// IP protocol / IPv6 next-header numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpProtocol {
    /// ICMP (1)
    ICMP,
    /// TCP (6)
    TCP,
    /// UDP (17)
    UDP,
    /// ICMPv6 (58)
    ICMPv6,
    /// Custom protocol number
    Custom(u8),
}

impl IpProtocol {
    pub fn to_u8(self) -> u8 {
        match self {
            IpProtocol::ICMP => 1,
            IpProtocol::TCP => 6,
            IpProtocol::UDP => 17,
            IpProtocol::ICMPv6 => 58,
            IpProtocol::Custom(val) => val,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => IpProtocol::ICMP,
            6 => IpProtocol::TCP,
            17 => IpProtocol::UDP,
            58 => IpProtocol::ICMPv6,
            val => IpProtocol::Custom(val),
        }
    }
}

/// Borrowed view of an IPv4 packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Packet<'a> {
    /// Header length in bytes
    pub header_len: usize,
    /// Total length (header + data) in bytes
    pub total_length: u16,
    pub identification: u16,
    pub more_fragments: bool,
    /// Fragment offset (in 8-byte blocks)
    pub fragment_offset: u16,
    pub ttl: u8,
    pub protocol: IpProtocol,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    /// Data bounded by `total_length`
    pub payload: &'a [u8],
}

impl<'a> Ipv4Packet<'a> {
    /// Minimum IPv4 header size (without options)
    pub const MIN_HEADER_SIZE: usize = 20;

    pub fn parse(data: &'a [u8]) -> Option<Self> {
        if data.len() < Self::MIN_HEADER_SIZE || data[0] >> 4 != 4 {
            return None;
        }

        let header_len = usize::from(data[0] & 0x0F) * 4;
        let total_length = u16::from_be_bytes([data[2], data[3]]);
        if header_len < Self::MIN_HEADER_SIZE || usize::from(total_length) < header_len {
            return None;
        }

        // A snaplen-truncated capture may hold less than total_length
        let end = usize::from(total_length).min(data.len());
        let payload = data.get(header_len..end)?;

        let flags_fragment = u16::from_be_bytes([data[6], data[7]]);

        Some(Ipv4Packet {
            header_len,
            total_length,
            identification: u16::from_be_bytes([data[4], data[5]]),
            more_fragments: flags_fragment & 0x2000 != 0,
            fragment_offset: flags_fragment & 0x1FFF,
            ttl: data[8],
            protocol: IpProtocol::from_u8(data[9]),
            source: Ipv4Addr::new(data[12], data[13], data[14], data[15]),
            destination: Ipv4Addr::new(data[16], data[17], data[18], data[19]),
            payload,
        })
    }

    /// Whether this packet is a non-initial fragment
    ///
    /// Such packets carry no transport header.
    pub fn is_later_fragment(&self) -> bool {
        self.fragment_offset != 0
    }

    /// Write a 20-byte header followed by `payload`, with the header checksum filled in
    pub fn write(
        buf: &mut BytesMut,
        source: Ipv4Addr,
        destination: Ipv4Addr,
        protocol: IpProtocol,
        identification: u16,
        ttl: u8,
        payload: &[u8],
    ) {
        let total_length = (Self::MIN_HEADER_SIZE + payload.len()) as u16;

        let mut header = BytesMut::with_capacity(Self::MIN_HEADER_SIZE);
        header.put_u8(0x45);
        header.put_u8(0);
        header.put_u16(total_length);
        header.put_u16(identification);
        // Don't Fragment
        header.put_u16(0x4000);
        header.put_u8(ttl);
        header.put_u8(protocol.to_u8());
        header.put_u16(0);
        header.put_slice(&source.octets());
        header.put_slice(&destination.octets());

        let checksum = internet_checksum(&header);
        header[10..12].copy_from_slice(&checksum.to_be_bytes());

        buf.put_slice(&header);
        buf.put_slice(payload);
    }
}

/// Borrowed view of an IPv6 packet
///
/// Only the fixed header is decoded; `next_header` names whatever follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv6Packet<'a> {
    pub payload_length: u16,
    pub next_header: IpProtocol,
    pub hop_limit: u8,
    pub source: Ipv6Addr,
    pub destination: Ipv6Addr,
    /// Data bounded by `payload_length`
    pub payload: &'a [u8],
}

impl<'a> Ipv6Packet<'a> {
    pub const HEADER_SIZE: usize = 40;

    pub fn parse(data: &'a [u8]) -> Option<Self> {
        if data.len() < Self::HEADER_SIZE || data[0] >> 4 != 6 {
            return None;
        }

        let payload_length = u16::from_be_bytes([data[4], data[5]]);
        let end = (Self::HEADER_SIZE + usize::from(payload_length)).min(data.len());

        let source: [u8; 16] = data[8..24].try_into().ok()?;
        let destination: [u8; 16] = data[24..40].try_into().ok()?;

        Some(Ipv6Packet {
            payload_length,
            next_header: IpProtocol::from_u8(data[6]),
            hop_limit: data[7],
            source: Ipv6Addr::from(source),
            destination: Ipv6Addr::from(destination),
            payload: &data[Self::HEADER_SIZE..end],
        })
    }

    pub fn write(
        buf: &mut BytesMut,
        source: Ipv6Addr,
        destination: Ipv6Addr,
        next_header: IpProtocol,
        hop_limit: u8,
        payload: &[u8],
    ) {
        buf.put_u32(6 << 28);
        buf.put_u16(payload.len() as u16);
        buf.put_u8(next_header.to_u8());
        buf.put_u8(hop_limit);
        buf.put_slice(&source.octets());
        buf.put_slice(&destination.octets());
        buf.put_slice(payload);
    }
}
