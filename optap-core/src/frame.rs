//! Captured frame type

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// One link-layer frame as produced by a frame source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Capture timestamp
    pub timestamp: SystemTime,
    /// Captured bytes, including all link-layer headers
    pub data: Vec<u8>,
    /// Length of the frame on the wire (may exceed `data.len()` if truncated)
    pub wire_len: u32,
}

impl RawFrame {
    /// Create a frame stamped now whose wire length equals its captured length
    pub fn new(data: Vec<u8>) -> Self {
        let wire_len = u32::try_from(data.len()).unwrap_or(u32::MAX);
        Self {
            timestamp: SystemTime::now(),
            data,
            wire_len,
        }
    }

    pub fn with_wire_len(mut self, wire_len: u32) -> Self {
        self.wire_len = wire_len;
        self
    }

    /// Set the timestamp from a pcap `timeval`
    pub fn with_timeval(mut self, sec: i64, usec: i64) -> Self {
        let since_epoch = Duration::from_secs(sec.max(0) as u64)
            + Duration::from_micros(usec.max(0) as u64);
        self.timestamp = UNIX_EPOCH + since_epoch;
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of bytes actually captured
    pub fn captured_len(&self) -> usize {
        self.data.len()
    }

    /// Whether the capture cut the frame short
    pub fn is_truncated(&self) -> bool {
        (self.wire_len as usize) > self.data.len()
    }
}
