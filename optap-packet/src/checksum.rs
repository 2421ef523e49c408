//! Internet checksum (RFC 1071)
//!
//! Used when synthesising frames; captured frames are never checksum-verified
//! because loopback traffic routinely carries offloaded, unfilled checksums.

use std::net::IpAddr;

/// One's-complement sum of `data` as big-endian 16-bit words, folded to 16 bits
fn accumulate(mut sum: u32, data: &[u8]) -> u32 {
    let mut chunks = data.chunks_exact(2);
    for chunk in &mut chunks {
        sum += u32::from(u16::from_be_bytes([chunk[0], chunk[1]]));
    }
    if let Some(&byte) = chunks.remainder().first() {
        sum += u32::from(byte) << 8;
    }

    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    sum
}

/// Internet checksum of `data`
///
/// ```
/// use optap_packet::checksum::internet_checksum;
///
/// assert_eq!(internet_checksum(&[]), 0xFFFF);
/// ```
pub fn internet_checksum(data: &[u8]) -> u16 {
    !(accumulate(0, data) as u16)
}

/// Whether `data`, including its checksum field, sums to zero
pub fn verify_checksum(data: &[u8]) -> bool {
    let result = internet_checksum(data);
    result == 0 || result == 0xFFFF
}

/// TCP/UDP checksum over the IPv4 or IPv6 pseudo-header and `data`
///
/// Returns `None` when the address families differ.
pub fn transport_checksum(source: IpAddr, destination: IpAddr, protocol: u8, data: &[u8]) -> Option<u16> {
    let mut sum = 0;
    match (source, destination) {
        (IpAddr::V4(src), IpAddr::V4(dst)) => {
            sum = accumulate(sum, &src.octets());
            sum = accumulate(sum, &dst.octets());
            sum = accumulate(sum, &[0, protocol]);
            sum = accumulate(sum, &(data.len() as u16).to_be_bytes());
        }
        (IpAddr::V6(src), IpAddr::V6(dst)) => {
            sum = accumulate(sum, &src.octets());
            sum = accumulate(sum, &dst.octets());
            sum = accumulate(sum, &(data.len() as u32).to_be_bytes());
            sum = accumulate(sum, &[0, 0, 0, protocol]);
        }
        _ => return None,
    }
    Some(!(accumulate(sum, data) as u16))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_internet_checksum_rfc1071() {
        // Worked example from RFC 1071 section 3
        let data = [0x00, 0x01, 0xf2, 0x03, 0xf4, 0xf5, 0xf6, 0xf7];
        assert_eq!(internet_checksum(&data), !0xddf2);
    }

    #[test]
    fn test_odd_length_padded() {
        assert_eq!(internet_checksum(&[0x12]), internet_checksum(&[0x12, 0x00]));
    }

    #[test]
    fn test_verify_round_trip() {
        let mut data = vec![0x45, 0x00, 0x00, 0x3c];
        let checksum = internet_checksum(&data);
        data.extend_from_slice(&checksum.to_be_bytes());
        assert!(verify_checksum(&data));
    }

    #[test]
    fn test_transport_checksum_families() {
        let data = [0x00, 0x35, 0x00, 0x35, 0x00, 0x08, 0x00, 0x00];
        let v4 = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let v6 = IpAddr::V6(Ipv6Addr::LOCALHOST);

        assert!(transport_checksum(v4, v4, 6, &data).is_some());
        assert!(transport_checksum(v6, v6, 6, &data).is_some());
        assert_eq!(transport_checksum(v4, v6, 6, &data), None);
    }
}
