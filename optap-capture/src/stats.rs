//! Capture statistics

use std::fmt;

/// Kernel-level counters reported by the capture device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Number of packets received by the filter
    pub packets_received: u64,
    /// Number of packets dropped because the buffer was full
    pub packets_dropped: u64,
    /// Number of packets dropped by the interface
    pub packets_if_dropped: u64,
}

impl CaptureStats {
    pub fn from_pcap_stats(stats: pcap::Stat) -> Self {
        Self {
            packets_received: u64::from(stats.received),
            packets_dropped: u64::from(stats.dropped),
            packets_if_dropped: u64::from(stats.if_dropped),
        }
    }

    /// Calculate drop rate as percentage
    pub fn drop_rate(&self) -> f64 {
        if self.packets_received == 0 {
            return 0.0;
        }
        (self.packets_dropped as f64 / self.packets_received as f64) * 100.0
    }

    /// Check if there are significant drops
    ///
    /// A stalled consumer backs the session up into the kernel buffer, so
    /// drops here are the visible cost of backpressure.
    pub fn has_significant_drops(&self, threshold_percent: f64) -> bool {
        self.drop_rate() > threshold_percent
    }
}

impl fmt::Display for CaptureStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "received {} packets, dropped {} ({:.2}%), interface dropped {}",
            self.packets_received,
            self.packets_dropped,
            self.drop_rate(),
            self.packets_if_dropped
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pcap_stats() {
        let stats = CaptureStats::from_pcap_stats(pcap::Stat {
            received: 200,
            dropped: 10,
            if_dropped: 1,
        });
        assert_eq!(stats.packets_received, 200);
        assert_eq!(stats.packets_dropped, 10);
        assert_eq!(stats.packets_if_dropped, 1);
        assert_eq!(stats.drop_rate(), 5.0);
        assert!(stats.has_significant_drops(1.0));
        assert!(!stats.has_significant_drops(10.0));
    }

    #[test]
    fn test_empty_stats() {
        let stats = CaptureStats::default();
        assert_eq!(stats.drop_rate(), 0.0);
        assert_eq!(
            stats.to_string(),
            "received 0 packets, dropped 0 (0.00%), interface dropped 0"
        );
    }
}
