//! TCP segment parsing and construction

use crate::checksum::transport_checksum;
use crate::ip::IpProtocol;
use bytes::{BufMut, BytesMut};
use std::net::IpAddr;

/// TCP flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TcpFlags {
    pub fin: bool,
    pub syn: bool,
    pub rst: bool,
    pub psh: bool,
    pub ack: bool,
    pub urg: bool,
    pub ece: bool,
    pub cwr: bool,
}

impl TcpFlags {
    /// No flags set
    pub const NONE: TcpFlags = TcpFlags::from_u8(0);

    /// SYN flag (connection initiation)
    pub const SYN: TcpFlags = TcpFlags::from_u8(0b0000_0010);

    /// ACK flag
    pub const ACK: TcpFlags = TcpFlags::from_u8(0b0001_0000);

    /// PSH+ACK flags (push data)
    pub const PSH_ACK: TcpFlags = TcpFlags::from_u8(0b0001_1000);

    /// FIN+ACK flags (connection termination)
    pub const FIN_ACK: TcpFlags = TcpFlags::from_u8(0b0001_0001);

    pub fn to_u8(self) -> u8 {
        [
            self.fin, self.syn, self.rst, self.psh, self.ack, self.urg, self.ece, self.cwr,
        ]
        .iter()
        .enumerate()
        .fold(0u8, |acc, (bit, &set)| acc | (u8::from(set) << bit))
    }

    pub const fn from_u8(value: u8) -> Self {
        TcpFlags {
            fin: value & 0b0000_0001 != 0,
            syn: value & 0b0000_0010 != 0,
            rst: value & 0b0000_0100 != 0,
            psh: value & 0b0000_1000 != 0,
            ack: value & 0b0001_0000 != 0,
            urg: value & 0b0010_0000 != 0,
            ece: value & 0b0100_0000 != 0,
            cwr: value & 0b1000_0000 != 0,
        }
    }
}

/// Borrowed view of a TCP segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpSegment<'a> {
    pub source_port: u16,
    pub destination_port: u16,
    pub sequence_number: u32,
    pub acknowledgment_number: u32,
    /// Header length in bytes, options included
    pub header_len: usize,
    pub flags: TcpFlags,
    pub window_size: u16,
    pub checksum: u16,
    pub options: &'a [u8],
    pub payload: &'a [u8],
}

impl<'a> TcpSegment<'a> {
    /// Minimum TCP header size (without options)
    pub const MIN_HEADER_SIZE: usize = 20;

    pub fn parse(data: &'a [u8]) -> Option<Self> {
        if data.len() < Self::MIN_HEADER_SIZE {
            return None;
        }

        let header_len = usize::from(data[12] >> 4) * 4;
        if header_len < Self::MIN_HEADER_SIZE || data.len() < header_len {
            return None;
        }

        Some(TcpSegment {
            source_port: u16::from_be_bytes([data[0], data[1]]),
            destination_port: u16::from_be_bytes([data[2], data[3]]),
            sequence_number: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
            acknowledgment_number: u32::from_be_bytes([data[8], data[9], data[10], data[11]]),
            header_len,
            flags: TcpFlags::from_u8(data[13]),
            window_size: u16::from_be_bytes([data[14], data[15]]),
            checksum: u16::from_be_bytes([data[16], data[17]]),
            options: &data[Self::MIN_HEADER_SIZE..header_len],
            payload: &data[header_len..],
        })
    }
}

/// Owned TCP header fields used when synthesising segments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpHeader {
    pub source_port: u16,
    pub destination_port: u16,
    pub sequence_number: u32,
    pub acknowledgment_number: u32,
    pub flags: TcpFlags,
    pub window_size: u16,
    /// Raw option bytes, padded to a 4-byte boundary on write
    pub options: Vec<u8>,
}

impl TcpHeader {
    pub fn new(source_port: u16, destination_port: u16, flags: TcpFlags) -> Self {
        Self {
            source_port,
            destination_port,
            sequence_number: 0,
            acknowledgment_number: 0,
            flags,
            window_size: 65535,
            options: Vec::new(),
        }
    }

    /// Header length in bytes once options are padded
    pub fn header_len(&self) -> usize {
        TcpSegment::MIN_HEADER_SIZE + ((self.options.len() + 3) & !3)
    }

    /// Write the header and `payload`, computing the checksum over the
    /// pseudo-header of `source`/`destination`
    pub fn write(&self, buf: &mut BytesMut, source: IpAddr, destination: IpAddr, payload: &[u8]) {
        let header_len = self.header_len();
        let mut segment = BytesMut::with_capacity(header_len + payload.len());

        segment.put_u16(self.source_port);
        segment.put_u16(self.destination_port);
        segment.put_u32(self.sequence_number);
        segment.put_u32(self.acknowledgment_number);
        segment.put_u8(((header_len / 4) as u8) << 4);
        segment.put_u8(self.flags.to_u8());
        segment.put_u16(self.window_size);
        segment.put_u16(0);
        segment.put_u16(0);
        segment.put_slice(&self.options);
        segment.put_bytes(0, header_len - TcpSegment::MIN_HEADER_SIZE - self.options.len());
        segment.put_slice(payload);

        let checksum = transport_checksum(source, destination, IpProtocol::TCP.to_u8(), &segment)
            .unwrap_or(0);
        segment[16..18].copy_from_slice(&checksum.to_be_bytes());

        buf.put_slice(&segment);
    }
}
