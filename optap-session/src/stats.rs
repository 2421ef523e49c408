//! Session statistics

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of a session's per-frame outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Frames read from the source
    pub frames_seen: u64,
    /// Frames skipped on the bare-ACK length
    pub ack_skipped: u64,
    /// Frames without a TCP layer
    pub non_tcp_skipped: u64,
    /// TCP segments carrying no payload
    pub empty_payloads: u64,
    /// Messages decoded into a valid document
    pub decoded: u64,
    /// Values delivered to the output channel
    pub emitted: u64,
    /// Documents lacking the configured field
    pub key_misses: u64,
    /// Decode failures passed over under the skip policy
    pub decode_failures_skipped: u64,
}

/// Thread-safe session statistics counters
#[derive(Debug, Default)]
pub struct SessionStatsCounters {
    frames_seen: AtomicU64,
    ack_skipped: AtomicU64,
    non_tcp_skipped: AtomicU64,
    empty_payloads: AtomicU64,
    decoded: AtomicU64,
    emitted: AtomicU64,
    key_misses: AtomicU64,
    decode_failures_skipped: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl SessionStatsCounters {
    pub fn record_frame(&self) {
        bump(&self.frames_seen);
    }

    pub fn record_ack_skip(&self) {
        bump(&self.ack_skipped);
    }

    pub fn record_non_tcp(&self) {
        bump(&self.non_tcp_skipped);
    }

    pub fn record_empty_payload(&self) {
        bump(&self.empty_payloads);
    }

    pub fn record_decoded(&self) {
        bump(&self.decoded);
    }

    pub fn record_emitted(&self) {
        bump(&self.emitted);
    }

    pub fn record_key_miss(&self) {
        bump(&self.key_misses);
    }

    pub fn record_skipped_failure(&self) {
        bump(&self.decode_failures_skipped);
    }

    pub fn snapshot(&self) -> SessionStats {
        SessionStats {
            frames_seen: self.frames_seen.load(Ordering::Relaxed),
            ack_skipped: self.ack_skipped.load(Ordering::Relaxed),
            non_tcp_skipped: self.non_tcp_skipped.load(Ordering::Relaxed),
            empty_payloads: self.empty_payloads.load(Ordering::Relaxed),
            decoded: self.decoded.load(Ordering::Relaxed),
            emitted: self.emitted.load(Ordering::Relaxed),
            key_misses: self.key_misses.load(Ordering::Relaxed),
            decode_failures_skipped: self.decode_failures_skipped.load(Ordering::Relaxed),
        }
    }
}
